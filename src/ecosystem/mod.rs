//! Dual Conway's Life / Lenia ecosystem ("Clouds" mode).
//!
//! Life runs every frame on a toroidal binary grid; Lenia runs on a continuous grid every frame
//! (or every `lenia_stride` frames when throttled), recomputing only the active tiles. The two
//! interact through tracked entities: Lenia eats Life still lifes, Life gliders eat Lenia.
//! A periodic maintenance pass keeps either population from dying out.

pub mod active;
pub mod entities;
pub mod lenia;
pub mod life;
pub mod seeds;

use std::collections::VecDeque;

use crate::audio::AudioBands;
use crate::clock::FrameTime;
use crate::events::{EventLog, EventSpot, VisualEvent};
use crate::grid::{Grid, GridSizing};
use crate::regions::find_regions;
use active::ActiveRegions;
use entities::{CellRole, Glider, StaticPattern, TrackedEntities, classify};
use lenia::{Kernel, LeniaParams, step_lenia};
use seeds::{StillLife, glider_cells, pick_quiet_site, stamp_life, stamp_organism};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq)]
pub struct EcosystemConfig {
    pub kernel_radius: usize,
    pub mu: f32,
    pub sigma: f32,
    pub alpha: f32,
    pub drift_amplitude: f32,

    pub tile_size: usize,
    pub activation_threshold: f32,
    /// Above this share of active tiles the whole grid is recomputed.
    pub full_update_share: f32,

    pub feeding_threshold: f32,
    pub feeding_rate: f32,
    pub static_energy_drain: f32,
    pub static_feeding_bonus: f32,
    pub static_initial_energy: f32,
    pub max_statics: usize,
    pub predation_factor: f32,

    pub max_gliders: usize,
    pub max_glider_age: u32,
    pub glider_cleanup_interval: u64,
    /// Beat intensity needed to spawn a glider.
    pub beat_spawn_threshold: f32,

    pub maintenance_interval: u64,
    pub critical_mass_ratio: f32,
    pub critical_active_cells: usize,
    pub moderate_mass_ratio: f32,
    pub site_samples: usize,
    pub site_life_limit: usize,
    pub min_life_cells: usize,

    pub initial_organisms: usize,
    pub initial_gliders: usize,
    pub initial_statics: usize,

    pub event_cap: usize,
    pub sizing: GridSizing,
}

impl Default for EcosystemConfig {
    fn default() -> Self {
        Self {
            kernel_radius: 13,
            mu: 0.15,
            sigma: 0.035,
            alpha: 0.1,
            drift_amplitude: 0.01,

            tile_size: 8,
            activation_threshold: 0.01,
            full_update_share: 0.85,

            feeding_threshold: 0.2,
            feeding_rate: 0.15,
            static_energy_drain: 0.5,
            static_feeding_bonus: 0.02,
            static_initial_energy: 1.0,
            max_statics: 32,
            predation_factor: 0.3,

            max_gliders: 24,
            max_glider_age: 900,
            glider_cleanup_interval: 8,
            beat_spawn_threshold: 0.45,

            maintenance_interval: 60,
            critical_mass_ratio: 0.002,
            critical_active_cells: 40,
            moderate_mass_ratio: 0.01,
            site_samples: 24,
            site_life_limit: 6,
            min_life_cells: 30,

            initial_organisms: 4,
            initial_gliders: 4,
            initial_statics: 6,

            event_cap: 256,
            sizing: GridSizing::new((100, 66), (150, 100)),
        }
    }
}

/// Per-frame audio influence, read once at the start of the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioModulation {
    pub alpha_scale: f32,
    pub mu_shift: f32,
    pub drift_scale: f32,
    pub feeding_scale: f32,
    pub spawn_glider: bool,
}

impl AudioModulation {
    pub const NEUTRAL: Self = Self {
        alpha_scale: 1.0,
        mu_shift: 0.0,
        drift_scale: 1.0,
        feeding_scale: 1.0,
        spawn_glider: false,
    };

    pub fn from_bands(audio: Option<&AudioBands>, beat_spawn_threshold: f32) -> Self {
        let Some(a) = audio else {
            return Self::NEUTRAL;
        };
        Self {
            alpha_scale: 1.0 + a.bass.clamp(0.0, 1.0) * 0.5,
            mu_shift: a.mid.clamp(0.0, 1.0) * 0.02,
            drift_scale: 1.0 + a.treble.clamp(0.0, 1.0) * 2.0,
            feeding_scale: 1.0 + a.overall.clamp(0.0, 1.0),
            spawn_glider: a.beat_detected && a.beat_intensity >= beat_spawn_threshold,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EcosystemStats {
    pub generation: u64,
    pub life_cells: usize,
    pub lenia_mass: f32,
    pub lenia_active_cells: usize,
    pub gliders: usize,
    pub statics: usize,
    pub active_tiles: usize,
    pub total_tiles: usize,
    pub lenia_updated: bool,
    pub lenia_cells_computed: usize,
    pub organisms_reseeded: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Maintenance {
    Healthy,
    /// Lenia was near extinction; this many organisms were added.
    Critical(usize),
    Moderate,
}

pub struct DualCaEngine {
    cfg: EcosystemConfig,
    life: Grid<u8>,
    life_back: Grid<u8>,
    lenia: Grid<f32>,
    lenia_back: Grid<f32>,
    kernel: Kernel,
    active: ActiveRegions,
    entities: TrackedEntities,
    events: EventLog,
    rng: fastrand::Rng,
    modulation: AudioModulation,
    lenia_stride: u32,
    frame: u64,
    generation: u64,
    stats: EcosystemStats,
}

impl DualCaEngine {
    /// Engine with the initial organisms, gliders and still lifes seeded.
    pub fn new(width: usize, height: usize, cfg: EcosystemConfig, seed: u64) -> Self {
        let mut engine = Self::empty(width, height, cfg, seed);
        engine.reseed();
        engine
    }

    /// Engine with all grids zeroed and nothing tracked.
    pub fn empty(width: usize, height: usize, cfg: EcosystemConfig, seed: u64) -> Self {
        Self {
            life: Grid::new(width, height),
            life_back: Grid::new(width, height),
            lenia: Grid::new(width, height),
            lenia_back: Grid::new(width, height),
            kernel: Kernel::new(cfg.kernel_radius),
            active: ActiveRegions::new(width, height, cfg.tile_size),
            entities: TrackedEntities::new(width, height),
            events: EventLog::new(cfg.event_cap),
            rng: fastrand::Rng::with_seed(seed),
            modulation: AudioModulation::NEUTRAL,
            lenia_stride: 1,
            frame: 0,
            generation: 0,
            stats: EcosystemStats::default(),
            cfg,
        }
    }

    /// Reallocates every grid for the new viewport and reseeds. Tracked state is discarded.
    pub fn on_resize(&mut self, view_w: usize, view_h: usize) {
        let (w, h) = self.cfg.sizing.dims_for_view(view_w, view_h);
        info!(view_w, view_h, w, h, "ecosystem resized");
        self.life = Grid::new(w, h);
        self.life_back = Grid::new(w, h);
        self.lenia = Grid::new(w, h);
        self.lenia_back = Grid::new(w, h);
        self.active = ActiveRegions::new(w, h, self.cfg.tile_size);
        self.entities = TrackedEntities::new(w, h);
        self.reseed();
    }

    /// Clears both grids and seeds organisms, gliders and still lifes at quiet sites.
    pub fn reseed(&mut self) {
        self.life.clear();
        self.life_back.clear();
        self.lenia.clear();
        self.lenia_back.clear();
        self.entities.clear();
        self.events.clear();
        self.frame = 0;
        self.generation = 0;
        if self.life.is_empty() {
            return;
        }

        for i in 0..self.cfg.initial_statics {
            let kind = StillLife::ALL[i % StillLife::ALL.len()];
            if let Some((x, y)) = self.quiet_site() {
                self.seed_static(kind, x, y);
            }
        }
        for _ in 0..self.cfg.initial_gliders {
            self.spawn_random_glider();
        }
        for _ in 0..self.cfg.initial_organisms {
            let radius = self.rng.usize(8..=12) as f32;
            let intensity = 0.8 + self.rng.f32() * 0.15;
            self.seed_organism_at_quiet_site(radius, intensity);
        }
        // Freshly seeded patterns count as unchanged until the first generation runs.
        self.life_back.copy_from(&self.life);
        info!(
            statics = self.entities.statics.len(),
            gliders = self.entities.gliders.len(),
            "ecosystem seeded"
        );
        self.refresh_stats(false, 0, 0);
    }

    pub fn config(&self) -> &EcosystemConfig {
        &self.cfg
    }

    pub fn width(&self) -> usize {
        self.life.width()
    }

    pub fn height(&self) -> usize {
        self.life.height()
    }

    pub fn life(&self) -> &Grid<u8> {
        &self.life
    }

    pub fn lenia(&self) -> &Grid<f32> {
        &self.lenia
    }

    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        self.life.get(x, y).is_some_and(|&c| c != 0)
    }

    pub fn lenia_at(&self, x: usize, y: usize) -> f32 {
        self.lenia.get(x, y).copied().unwrap_or(0.0)
    }

    pub fn set_alive(&mut self, x: usize, y: usize, alive: bool) {
        self.life.set(x, y, u8::from(alive));
    }

    pub fn set_lenia(&mut self, x: usize, y: usize, v: f32) {
        let v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
        self.lenia.set(x, y, v);
    }

    pub fn gliders(&self) -> &[Glider] {
        &self.entities.gliders
    }

    pub fn static_patterns(&self) -> &[StaticPattern] {
        &self.entities.statics
    }

    pub fn events(&self) -> &VecDeque<VisualEvent> {
        self.events.entries()
    }

    pub fn active_regions(&self) -> &ActiveRegions {
        &self.active
    }

    pub fn stats(&self) -> EcosystemStats {
        self.stats
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn classify_cell(&self, x: usize, y: usize) -> CellRole {
        classify(x, y, self.is_alive(x, y), &self.entities)
    }

    /// Lenia runs on every `stride`-th frame (1 = every frame).
    pub fn set_lenia_stride(&mut self, stride: u32) {
        self.lenia_stride = stride.max(1);
    }

    pub fn lenia_stride(&self) -> u32 {
        self.lenia_stride
    }

    pub fn lenia_mass(&self) -> f32 {
        self.lenia.cells().iter().filter(|v| v.is_finite()).sum()
    }

    pub fn life_population(&self) -> usize {
        self.life.cells().iter().map(|&c| c as usize).sum()
    }

    /// Writes a glider heading `(vx, vy)` with its 3×3 box at `(x, y)` and tracks it.
    /// Returns `false` (and writes nothing) once the glider cap is reached.
    pub fn seed_glider(&mut self, x: usize, y: usize, vx: i8, vy: i8) -> bool {
        if self.entities.gliders.len() >= self.cfg.max_gliders || self.life.is_empty() {
            return false;
        }
        let vx = if vx < 0 { -1 } else { 1 };
        let vy = if vy < 0 { -1 } else { 1 };
        stamp_life(&mut self.life, x as isize, y as isize, &glider_cells(vx, vy));
        let (cx, cy) = self.life.wrap(x as isize + 1, y as isize + 1);
        self.entities
            .gliders
            .push(Glider::new(cx as f32, cy as f32, vx as f32, vy as f32));
        true
    }

    /// Writes a still life with its box at `(x, y)` and tracks it as prey.
    pub fn seed_static(&mut self, kind: StillLife, x: usize, y: usize) -> bool {
        if self.entities.statics.len() >= self.cfg.max_statics || self.life.is_empty() {
            return false;
        }
        stamp_life(&mut self.life, x as isize, y as isize, kind.cells());
        let (sw, sh) = kind.size();
        let (x, y) = self.life.wrap(x as isize, y as isize);
        self.entities.statics.push(StaticPattern {
            x,
            y,
            width: sw,
            height: sh,
            energy: self.cfg.static_initial_energy,
        });
        true
    }

    pub fn seed_organism(&mut self, cx: usize, cy: usize, radius: f32, intensity: f32) {
        stamp_organism(&mut self.lenia, cx as isize, cy as isize, radius, intensity);
    }

    /// Explicit spawn: a glider at a random quiet site with a random heading.
    pub fn spawn_random_glider(&mut self) -> bool {
        let Some((x, y)) = self.quiet_site() else {
            return false;
        };
        let vx = if self.rng.bool() { 1 } else { -1 };
        let vy = if self.rng.bool() { 1 } else { -1 };
        self.seed_glider(x, y, vx, vy)
    }

    fn quiet_site(&mut self) -> Option<(usize, usize)> {
        pick_quiet_site(
            &self.life,
            &mut self.rng,
            self.cfg.site_samples,
            4,
            self.cfg.site_life_limit,
        )
    }

    fn seed_organism_at_quiet_site(&mut self, radius: f32, intensity: f32) -> bool {
        match self.quiet_site() {
            Some((x, y)) => {
                self.seed_organism(x, y, radius, intensity);
                true
            }
            None => false,
        }
    }

    /// Turns this frame's bands into an [`AudioModulation`]; a strong beat spawns a glider.
    pub fn update_audio_reactivity(&mut self, audio: Option<&AudioBands>) -> AudioModulation {
        self.modulation = AudioModulation::from_bands(audio, self.cfg.beat_spawn_threshold);
        if self.modulation.spawn_glider {
            self.spawn_random_glider();
        }
        self.modulation
    }

    /// One frame: audio, Life generation with feeding, entity bookkeeping, Lenia (if due),
    /// entity cleanup and periodic maintenance.
    pub fn step_grid(&mut self, audio: Option<&AudioBands>, time: &FrameTime) -> EcosystemStats {
        self.update_audio_reactivity(audio);
        self.frame += 1;

        self.step_life_generation();
        self.entities.advance_gliders();

        let lenia_due = self.frame % self.lenia_stride as u64 == 0;
        let computed = if lenia_due { self.step_lenia_field(time.t) } else { 0 };

        if self.cfg.glider_cleanup_interval > 0
            && self.generation % self.cfg.glider_cleanup_interval == 0
        {
            let dropped = self
                .entities
                .cleanup_gliders(&self.life, self.cfg.max_glider_age);
            if dropped > 0 {
                debug!(dropped, "gliders retired");
            }
            self.retire_broken_statics();
        }

        let mut reseeded = 0;
        if self.cfg.maintenance_interval > 0 && self.frame % self.cfg.maintenance_interval == 0 {
            if let Maintenance::Critical(n) = self.maintain_population() {
                reseeded = n;
            }
        }

        self.events.fade(time.dt);
        self.refresh_stats(lenia_due, computed, reseeded);
        self.stats
    }

    fn step_life_generation(&mut self) {
        let threshold = self.cfg.feeding_threshold;
        let rate = (self.cfg.feeding_rate * self.modulation.feeding_scale).clamp(0.0, 1.0);
        let drain = self.cfg.static_energy_drain;

        let lenia = &self.lenia;
        let entities = &mut self.entities;
        let rng = &mut self.rng;
        let events = &mut self.events;

        let mut feed = |x: usize, y: usize| -> bool {
            let Some(i) = entities.static_at(x, y) else {
                return false;
            };
            let density = lenia.cells()[lenia.index(x, y)];
            if density <= threshold || rng.f32() >= rate * density {
                return false;
            }
            entities.statics[i].energy -= density * drain;
            events.push(VisualEvent::Feeding(EventSpot::new(
                x as f32 + 0.5,
                y as f32 + 0.5,
                density,
                0.8,
            )));
            true
        };

        life::step_life(&self.life, &mut self.life_back, &mut feed);
        std::mem::swap(&mut self.life, &mut self.life_back);
        self.generation += 1;

        // Fully eaten still lifes disappear along with their cells.
        let life = &mut self.life;
        self.entities.statics.retain(|s| {
            if s.energy > 0.0 {
                return true;
            }
            for dy in 0..s.height {
                for dx in 0..s.width {
                    let idx = life.wrap_index((s.x + dx) as isize, (s.y + dy) as isize);
                    life.cells_mut()[idx] = 0;
                }
            }
            debug!(x = s.x, y = s.y, "still life consumed");
            false
        });
    }

    fn step_lenia_field(&mut self, t: f32) -> usize {
        self.active
            .rebuild(&self.life, &self.lenia, self.cfg.activation_threshold);
        let regions = if self.active.share() > self.cfg.full_update_share {
            None
        } else {
            Some(&self.active)
        };

        let m = self.modulation;
        let params = LeniaParams {
            alpha: self.cfg.alpha * m.alpha_scale,
            mu: self.cfg.mu + m.mu_shift,
            sigma: self.cfg.sigma.max(1e-4),
            drift: self.cfg.drift_amplitude * m.drift_scale,
        };
        let predation = self.cfg.predation_factor.clamp(0.0, 1.0);
        let bonus = self.cfg.static_feeding_bonus;

        let entities = &self.entities;
        let mut eaten = vec![0.0f32; entities.gliders.len()];
        let mut modulate = |x: usize, y: usize, old: f32, v: f32| -> f32 {
            let mut v = v;
            if let Some(g) = entities.glider_near(x, y) {
                let loss = v.clamp(0.0, 1.0) * predation;
                eaten[g] += loss;
                v -= loss;
            }
            if entities.static_at(x, y).is_some() {
                v += bonus * old;
            }
            v
        };

        let computed = step_lenia(
            &self.lenia,
            &mut self.lenia_back,
            &self.kernel,
            &params,
            t,
            regions,
            &mut modulate,
        );
        std::mem::swap(&mut self.lenia, &mut self.lenia_back);

        for (g, amount) in self.entities.gliders.iter_mut().zip(eaten) {
            if amount <= 0.01 {
                continue;
            }
            g.energy += amount;
            self.events.push(VisualEvent::Predation(EventSpot::new(
                g.x + 0.5,
                g.y + 0.5,
                amount.min(1.0),
                0.6,
            )));
        }
        computed
    }

    /// Reseeds Lenia when its mass runs low, re-detects still lifes and tops up Life.
    pub fn maintain_population(&mut self) -> Maintenance {
        let cells = self.lenia.len().max(1) as f32;
        let mass = self.lenia_mass();
        let ratio = mass / cells;
        let active_cells = self.lenia.cells().iter().filter(|&&v| v > 0.05).count();

        let outcome = if ratio < self.cfg.critical_mass_ratio
            || active_cells < self.cfg.critical_active_cells
        {
            let n = self.rng.usize(2..=3);
            let mut placed = 0;
            for _ in 0..n {
                let radius = self.rng.usize(8..=12) as f32;
                let intensity = 0.8 + self.rng.f32() * 0.15;
                placed += self.seed_organism_at_quiet_site(radius, intensity) as usize;
            }
            Maintenance::Critical(placed)
        } else if ratio < self.cfg.moderate_mass_ratio {
            let radius = self.rng.usize(5..=7) as f32;
            let intensity = 0.7 + self.rng.f32() * 0.15;
            self.seed_organism_at_quiet_site(radius, intensity);
            Maintenance::Moderate
        } else {
            Maintenance::Healthy
        };

        self.retire_broken_statics();
        self.detect_still_lifes();

        if self.life_population() < self.cfg.min_life_cells {
            for _ in 0..2 {
                self.spawn_random_glider();
            }
            for kind in [StillLife::Block, StillLife::Beehive] {
                if let Some((x, y)) = self.quiet_site() {
                    self.seed_static(kind, x, y);
                }
            }
        }

        debug!(mass, ratio, active_cells, ?outcome, "population maintenance");
        outcome
    }

    fn retire_broken_statics(&mut self) {
        let dropped = self
            .entities
            .cleanup_statics(&self.life, &self.life_back);
        if dropped > 0 {
            debug!(dropped, "still lifes retired");
        }
    }

    /// Tracks untracked Life clusters that did not change over the last generation.
    /// `life_back` holds the previous generation after a step.
    pub fn detect_still_lifes(&mut self) -> usize {
        let regions = find_regions(&self.life, true, |&c| c != 0);
        let mut added = 0;
        for r in regions {
            if self.entities.statics.len() >= self.cfg.max_statics {
                break;
            }
            if r.size() < 4 || r.size() > 8 || r.bbox_width() > 4 || r.bbox_height() > 4 {
                continue;
            }
            let unchanged = (r.min_y..=r.max_y).all(|y| {
                (r.min_x..=r.max_x).all(|x| {
                    let idx = self.life.index(x, y);
                    self.life.cells()[idx] == self.life_back.cells()[idx]
                })
            });
            if !unchanged {
                continue;
            }
            let tracked = r.cells.iter().any(|&i| {
                let (x, y) = self.life.coords(i);
                self.entities.static_at(x, y).is_some() || self.entities.glider_near(x, y).is_some()
            });
            if tracked {
                continue;
            }
            self.entities.statics.push(StaticPattern {
                x: r.min_x,
                y: r.min_y,
                width: r.bbox_width(),
                height: r.bbox_height(),
                energy: self.cfg.static_initial_energy,
            });
            added += 1;
        }
        added
    }

    fn refresh_stats(&mut self, lenia_updated: bool, computed: usize, reseeded: usize) {
        self.stats = EcosystemStats {
            generation: self.generation,
            life_cells: self.life_population(),
            lenia_mass: self.lenia_mass(),
            lenia_active_cells: self.lenia.cells().iter().filter(|&&v| v > 0.05).count(),
            gliders: self.entities.gliders.len(),
            statics: self.entities.statics.len(),
            active_tiles: self.active.active_tiles(),
            total_tiles: self.active.total_tiles(),
            lenia_updated,
            lenia_cells_computed: computed,
            organisms_reseeded: reseeded,
        };
    }
}
