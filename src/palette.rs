use crate::audio::AudioBands;

pub type Rgb = [u8; 3];

/// Audio-driven tint blended over cell colours. Never written back into simulation state.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ColorBias {
    pub tint: Rgb,
    pub amount: f32,
}

impl ColorBias {
    pub const NONE: Self = Self {
        tint: [0, 0, 0],
        amount: 0.0,
    };

    /// Bass pushes red, mid green, treble blue; overall loudness sets the blend amount.
    pub fn from_audio(audio: Option<&AudioBands>) -> Self {
        let Some(a) = audio else {
            return Self::NONE;
        };
        let tint = [
            unit_to_u8(0.25 + a.bass * 0.75),
            unit_to_u8(0.2 + a.mid * 0.6),
            unit_to_u8(0.3 + a.treble * 0.7),
        ];
        Self {
            tint,
            amount: (a.overall * 0.35 + a.beat_intensity * 0.15).clamp(0.0, 0.5),
        }
    }

    pub fn apply(&self, c: Rgb) -> Rgb {
        if self.amount <= 0.0 {
            return c;
        }
        lerp_rgb(c, self.tint, self.amount)
    }
}

/// Sandpile colours by grain count: 0 black, 1 blue, 2 green, 3 orange, anything still
/// unstable glows white.
pub fn grain_color(grains: u32, bias: &ColorBias) -> Rgb {
    let base = match grains {
        0 => [0, 0, 0],
        1 => [30, 70, 230],
        2 => [30, 200, 80],
        3 => [255, 150, 20],
        _ => [255, 245, 235],
    };
    if grains == 0 {
        // Empty cells stay black so the pile silhouette reads clearly.
        return base;
    }
    bias.apply(base)
}

pub fn lerp_rgb(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

/// Additive blend, saturating per channel.
pub fn add_rgb(a: Rgb, b: Rgb, t: f32) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let add = |x: u8, y: u8| (x as f32 + y as f32 * t).min(255.0) as u8;
    [add(a[0], b[0]), add(a[1], b[1]), add(a[2], b[2])]
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let h = fract01(h) * 6.0;
    let i = h.floor() as i32;
    let f = h - i as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    let (r, g, b) = match i.rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [unit_to_u8(r), unit_to_u8(g), unit_to_u8(b)]
}

/// Lenia density to a soft cloud gradient: deep indigo through violet to pale cyan.
pub fn cloud_color(density: f32, t: f32) -> Rgb {
    let d = density.clamp(0.0, 1.0);
    if d < 0.01 {
        return [0, 0, 0];
    }
    let h = fract01(0.72 - d * 0.25 + (t * 0.05).sin() * 0.03);
    hsv_to_rgb(h, 0.75 - d * 0.45, 0.15 + d.powf(0.7) * 0.85)
}

pub fn fract01(x: f32) -> f32 {
    let f = x - x.floor();
    if f < 0.0 { f + 1.0 } else { f }
}

#[inline]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}
