use super::active::ActiveRegions;
use crate::grid::Grid;

/// Centre and width of the kernel shell, in normalized distance.
const SHELL_PEAK: f32 = 0.5;
const SHELL_WIDTH: f32 = 0.15;

/// Gaussian bump `exp(-((x - m) / s)^2 / 2)`.
#[inline]
pub fn bell(x: f32, m: f32, s: f32) -> f32 {
    let z = (x - m) / s;
    (-z * z * 0.5).exp()
}

/// Precomputed convolution taps for a ring-shaped kernel of radius `R`; weights sum to 1.
#[derive(Clone, Debug)]
pub struct Kernel {
    radius: usize,
    taps: Vec<(isize, isize, f32)>,
}

impl Kernel {
    pub fn new(radius: usize) -> Self {
        let radius = radius.max(1);
        let r = radius as isize;
        let mut taps = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                if d == 0.0 || d > radius as f32 {
                    continue;
                }
                let w = bell(d / radius as f32, SHELL_PEAK, SHELL_WIDTH);
                if w > 1e-6 {
                    taps.push((dx, dy, w));
                }
            }
        }
        let sum: f32 = taps.iter().map(|t| t.2).sum();
        if sum > 0.0 {
            for t in &mut taps {
                t.2 /= sum;
            }
        }
        Self { radius, taps }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn taps(&self) -> &[(isize, isize, f32)] {
        &self.taps
    }

    /// Weighted neighbourhood density at `(x, y)`, wrapping. Non-finite samples are skipped.
    pub fn density(&self, grid: &Grid<f32>, x: usize, y: usize) -> f32 {
        let mut acc = 0.0f32;
        for &(dx, dy, w) in &self.taps {
            let v = *grid.get_wrapped(x as isize + dx, y as isize + dy);
            if v.is_finite() {
                acc += w * v;
            }
        }
        acc
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeniaParams {
    /// Integration step.
    pub alpha: f32,
    pub mu: f32,
    pub sigma: f32,
    /// Amplitude of the time and flow drift terms.
    pub drift: f32,
}

/// Wave-like drift added to growth; depends only on the simulation time and position.
#[inline]
pub fn drift_terms(t: f32, x: usize, y: usize, amplitude: f32) -> (f32, f32) {
    let (fx, fy) = (x as f32, y as f32);
    let time_component = amplitude * (0.7 * t + 0.031 * (fx + fy)).sin();
    let flow_component = 0.5 * amplitude * (0.43 * t + 0.05 * fx - 0.04 * fy).cos();
    (time_component, flow_component)
}

/// Growth mapping from local density to rate of change.
#[inline]
pub fn growth(u: f32, p: &LeniaParams, time_component: f32, flow_component: f32) -> f32 {
    2.5 * bell(u, p.mu, p.sigma) - 1.0 + time_component + flow_component + 0.02
}

/// One Lenia update of `current` into `next`.
///
/// With `active` set, only cells in active tiles are recomputed and the rest are copied. For each
/// recomputed cell `modulate(x, y, old, integrated)` may adjust the integrated value before the
/// final NaN guard and clamp. Returns the number of recomputed cells.
pub fn step_lenia(
    current: &Grid<f32>,
    next: &mut Grid<f32>,
    kernel: &Kernel,
    params: &LeniaParams,
    t: f32,
    active: Option<&ActiveRegions>,
    modulate: &mut dyn FnMut(usize, usize, f32, f32) -> f32,
) -> usize {
    next.copy_from(current);
    let (w, h) = (current.width(), current.height());
    let mut updated = 0;

    let mut update_cell = |x: usize, y: usize, next: &mut Grid<f32>| {
        let idx = current.index(x, y);
        let old = current.cells()[idx];
        let u = kernel.density(current, x, y);
        let (tc, fc) = drift_terms(t, x, y, params.drift);
        let integrated = old + params.alpha * growth(u, params, tc, fc);
        let mut v = modulate(x, y, old, integrated);
        if !v.is_finite() {
            v = if old.is_finite() { old } else { 0.0 };
        }
        next.cells_mut()[idx] = v.clamp(0.0, 1.0);
    };

    match active {
        Some(regions) => {
            for (tx, ty) in regions.active_tile_coords() {
                let (x0, y0, x1, y1) = regions.tile_bounds(tx, ty, w, h);
                for y in y0..y1 {
                    for x in x0..x1 {
                        update_cell(x, y, next);
                        updated += 1;
                    }
                }
            }
        }
        None => {
            for y in 0..h {
                for x in 0..w {
                    update_cell(x, y, next);
                    updated += 1;
                }
            }
        }
    }
    updated
}
