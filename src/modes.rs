use crate::audio::AudioBands;
use crate::clock::FrameTime;
use crate::config::ModeKind;
use crate::ecosystem::DualCaEngine;
use crate::ecosystem::entities::CellRole;
use crate::events::VisualEvent;
use crate::palette::{ColorBias, Rgb, add_rgb, cloud_color, grain_color, lerp_rgb};
use crate::sandpile::SandpileEngine;
use crate::tuning::Tuning;
use std::fmt::Write as _;

/// One-shot user actions routed to the active mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeAction {
    Glider,
    Earthquake,
}

/// A simulation that can be stepped and painted into an RGBA buffer.
pub trait VisualMode {
    fn name(&self) -> &'static str;
    fn kind(&self) -> ModeKind;
    fn grid_size(&self) -> (usize, usize);
    fn on_resize(&mut self, view_w: usize, view_h: usize);
    fn reseed(&mut self);
    fn step(&mut self, audio: Option<&AudioBands>, time: &FrameTime);
    /// Paints the current state scaled to `w × h` pixels.
    fn paint(&self, out: &mut [u8], w: usize, h: usize, t: f32);
    fn hud_stats(&self) -> String;
    /// Returns `true` if the mode handled the action.
    fn action(&mut self, _action: ModeAction) -> bool {
        false
    }
    fn set_lenia_stride(&mut self, _stride: u32) {}
}

pub fn make_mode(kind: ModeKind, tuning: &Tuning, seed: u64) -> Box<dyn VisualMode> {
    match kind {
        ModeKind::Road => Box::new(RoadMode::new(tuning, seed)),
        ModeKind::Clouds => Box::new(CloudsMode::new(tuning, seed)),
    }
}

pub struct RoadMode {
    engine: SandpileEngine,
    bias: ColorBias,
    rng: fastrand::Rng,
}

impl RoadMode {
    pub fn new(tuning: &Tuning, seed: u64) -> Self {
        let (w, h) = tuning.sandpile.sizing.small;
        Self {
            engine: SandpileEngine::new(w, h, tuning.sandpile.clone(), seed),
            bias: ColorBias::NONE,
            rng: fastrand::Rng::with_seed(seed ^ 0x5eed),
        }
    }

    pub fn engine(&self) -> &SandpileEngine {
        &self.engine
    }
}

impl VisualMode for RoadMode {
    fn name(&self) -> &'static str {
        "Road"
    }

    fn kind(&self) -> ModeKind {
        ModeKind::Road
    }

    fn grid_size(&self) -> (usize, usize) {
        (self.engine.width(), self.engine.height())
    }

    fn on_resize(&mut self, view_w: usize, view_h: usize) {
        self.engine.on_resize(view_w, view_h);
    }

    fn reseed(&mut self) {
        self.engine.reseed();
    }

    fn step(&mut self, audio: Option<&AudioBands>, time: &FrameTime) {
        self.bias = ColorBias::from_audio(audio);
        self.engine.step_grid(audio, time);
    }

    fn paint(&self, out: &mut [u8], w: usize, h: usize, _t: f32) {
        let grid = self.engine.grid();
        paint_scaled(out, w, h, grid.width(), grid.height(), |gx, gy| {
            let cell = grid.cells()[grid.index(gx, gy)];
            let base = grain_color(cell.grains, &self.bias);
            add_rgb(base, [255, 214, 150], cell.topple_phase * 0.6)
        });
        paint_events(out, w, h, grid.width(), grid.height(), self.engine.events());
    }

    fn hud_stats(&self) -> String {
        let report = self.engine.last_report();
        let mut s = String::new();
        let _ = write!(
            s,
            "grains {}  max {}  waves {}  topples {}  lost {}  {:?}",
            self.engine.total_grains(),
            self.engine.max_grains(),
            report.waves,
            report.topples,
            self.engine.grains_lost_total(),
            report.phase,
        );
        s
    }

    fn action(&mut self, action: ModeAction) -> bool {
        match action {
            ModeAction::Earthquake => {
                let (w, h) = self.grid_size();
                if w == 0 || h == 0 {
                    return false;
                }
                let cfg = self.engine.config();
                let radius = self
                    .rng
                    .usize(cfg.quake_radius_min..=cfg.quake_radius_max.max(cfg.quake_radius_min));
                let (cx, cy) = (self.rng.usize(..w), self.rng.usize(..h));
                self.engine.earthquake(cx, cy, radius);
                true
            }
            ModeAction::Glider => false,
        }
    }
}

pub struct CloudsMode {
    engine: DualCaEngine,
}

impl CloudsMode {
    pub fn new(tuning: &Tuning, seed: u64) -> Self {
        let (w, h) = tuning.ecosystem.sizing.small;
        Self {
            engine: DualCaEngine::new(w, h, tuning.ecosystem.clone(), seed),
        }
    }

    pub fn engine(&self) -> &DualCaEngine {
        &self.engine
    }
}

fn role_tint(role: CellRole) -> Option<Rgb> {
    match role {
        CellRole::Dead => None,
        CellRole::Glider => Some([255, 128, 64]),
        CellRole::Static => Some([96, 232, 150]),
        CellRole::Unclassified => Some([228, 228, 240]),
    }
}

impl VisualMode for CloudsMode {
    fn name(&self) -> &'static str {
        "Clouds"
    }

    fn kind(&self) -> ModeKind {
        ModeKind::Clouds
    }

    fn grid_size(&self) -> (usize, usize) {
        (self.engine.width(), self.engine.height())
    }

    fn on_resize(&mut self, view_w: usize, view_h: usize) {
        self.engine.on_resize(view_w, view_h);
    }

    fn reseed(&mut self) {
        self.engine.reseed();
    }

    fn step(&mut self, audio: Option<&AudioBands>, time: &FrameTime) {
        self.engine.step_grid(audio, time);
    }

    fn paint(&self, out: &mut [u8], w: usize, h: usize, t: f32) {
        let (gw, gh) = self.grid_size();
        paint_scaled(out, w, h, gw, gh, |gx, gy| {
            let cloud = cloud_color(self.engine.lenia_at(gx, gy), t);
            match role_tint(self.engine.classify_cell(gx, gy)) {
                Some(tint) => lerp_rgb(cloud, tint, 0.8),
                None => cloud,
            }
        });
        paint_events(out, w, h, gw, gh, self.engine.events());
    }

    fn hud_stats(&self) -> String {
        let s = self.engine.stats();
        format!(
            "gen {}  life {}  mass {:.1}  gliders {}  statics {}  tiles {}/{}{}",
            s.generation,
            s.life_cells,
            s.lenia_mass,
            s.gliders,
            s.statics,
            s.active_tiles,
            s.total_tiles,
            if self.engine.lenia_stride() > 1 {
                format!("  stride {}", self.engine.lenia_stride())
            } else {
                String::new()
            },
        )
    }

    fn action(&mut self, action: ModeAction) -> bool {
        match action {
            ModeAction::Glider => self.engine.spawn_random_glider(),
            ModeAction::Earthquake => false,
        }
    }

    fn set_lenia_stride(&mut self, stride: u32) {
        self.engine.set_lenia_stride(stride);
    }
}

/// Nearest-neighbour scale of a `gw × gh` grid into an RGBA buffer of `w × h` pixels.
pub fn paint_scaled(
    out: &mut [u8],
    w: usize,
    h: usize,
    gw: usize,
    gh: usize,
    color: impl Fn(usize, usize) -> Rgb,
) {
    let need = w.saturating_mul(h).saturating_mul(4);
    if out.len() < need || gw == 0 || gh == 0 {
        return;
    }
    for y in 0..h {
        let gy = (y * gh / h).min(gh - 1);
        for x in 0..w {
            let gx = (x * gw / w).min(gw - 1);
            let [r, g, b] = color(gx, gy);
            let i = (y * w + x) * 4;
            out[i] = r;
            out[i + 1] = g;
            out[i + 2] = b;
            out[i + 3] = 255;
        }
    }
}

fn event_color(ev: &VisualEvent) -> Rgb {
    match ev {
        VisualEvent::Feeding(_) => [120, 255, 170],
        VisualEvent::Predation(_) => [255, 70, 90],
        VisualEvent::Topple(_) => [255, 250, 230],
    }
}

/// Additive glow at each event position, fading with its remaining lifetime.
pub fn paint_events<'a>(
    out: &mut [u8],
    w: usize,
    h: usize,
    gw: usize,
    gh: usize,
    events: impl IntoIterator<Item = &'a VisualEvent>,
) {
    if w == 0 || h == 0 || gw == 0 || gh == 0 || out.len() < w * h * 4 {
        return;
    }
    for ev in events {
        let spot = ev.spot();
        let strength = spot.intensity * (spot.ttl * 2.0).min(1.0);
        if strength <= 0.0 {
            continue;
        }
        let px = (spot.x / gw as f32 * w as f32) as isize;
        let py = (spot.y / gh as f32 * h as f32) as isize;
        let color = event_color(ev);
        for (dx, dy) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (x, y) = (px + dx, py + dy);
            if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
                continue;
            }
            let i = (y as usize * w + x as usize) * 4;
            let falloff = if dx == 0 && dy == 0 { 1.0 } else { 0.5 };
            let [r, g, b] = add_rgb([out[i], out[i + 1], out[i + 2]], color, strength * falloff);
            out[i] = r;
            out[i + 1] = g;
            out[i + 2] = b;
        }
    }
}
