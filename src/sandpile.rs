//! Abelian sandpile ("Road" mode).
//!
//! Each frame injects grains (weighted strategic piles plus audio bursts and a drip timer), then
//! runs a bounded number of toppling waves. A wave snapshots every unstable cell at its start and
//! fixes how many units each one sheds, so processing order within a wave never matters. The
//! per-frame caps mean a large cascade can be drawn mid-flight and finish on later frames.
//!
//! Grains pushed past the grid edge are lost.

use std::collections::VecDeque;

use crate::audio::AudioBands;
use crate::clock::FrameTime;
use crate::events::{EventLog, EventSpot, VisualEvent};
use crate::grid::{Grid, GridSizing, NEIGHBORS_4};
use tracing::{debug, info};

/// A cell holding at least this many grains is unstable.
pub const TOPPLE_THRESHOLD: u32 = 4;

#[derive(Clone, Debug, PartialEq)]
pub struct SandpileConfig {
    /// Toppling waves allowed per frame.
    pub max_waves: usize,
    /// Cells allowed to topple within one wave.
    pub max_topples_per_wave: usize,
    /// Frame-to-frame bass rise that triggers a grain burst.
    pub bass_rise_threshold: f32,
    /// Burst size is `floor(rise * burst_scale) + 2`.
    pub burst_scale: f32,
    /// Seconds between drip ticks with the mid band silent.
    pub drip_interval: f32,
    /// Frame-to-frame treble rise that can trigger an earthquake.
    pub treble_jump_threshold: f32,
    /// Absolute treble level an earthquake also requires.
    pub treble_floor: f32,
    pub quake_radius_min: usize,
    pub quake_radius_max: usize,
    /// Maximum per-axis displacement of grains moved by an earthquake.
    pub quake_scatter: isize,
    /// Grains dropped on the strategic piles after a reset.
    pub initial_grains: usize,
    pub topple_fade_per_sec: f32,
    pub event_cap: usize,
    pub sizing: GridSizing,
}

impl Default for SandpileConfig {
    fn default() -> Self {
        Self {
            max_waves: 10,
            max_topples_per_wave: 50,
            bass_rise_threshold: 0.08,
            burst_scale: 15.0,
            drip_interval: 0.25,
            treble_jump_threshold: 0.12,
            treble_floor: 0.35,
            quake_radius_min: 8,
            quake_radius_max: 20,
            quake_scatter: 2,
            initial_grains: 160,
            topple_fade_per_sec: 3.0,
            event_cap: 256,
            sizing: GridSizing::new((80, 50), (120, 80)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SandpileCell {
    pub grains: u32,
    /// 1.0 right after a topple, fading to 0.
    pub topple_phase: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PilePhase {
    Stable,
    Unstable,
}

/// Injection point for strategic grains.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrategicPile {
    pub x: usize,
    pub y: usize,
    pub weight: f32,
}

/// One cell's share of a wave: it sheds `units` grains to each neighbour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Topple {
    pub index: usize,
    pub units: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaveOutcome {
    /// Cells that toppled.
    pub topples: usize,
    pub grains_lost: u64,
    /// Unstable cells left out because the wave hit its cap.
    pub deferred: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StabilizeReport {
    pub waves: usize,
    pub topples: usize,
    pub grains_lost: u64,
    pub phase: PilePhase,
    /// The frame budget ran out with the pile still unstable.
    pub capped: bool,
}

impl Default for StabilizeReport {
    fn default() -> Self {
        Self {
            waves: 0,
            topples: 0,
            grains_lost: 0,
            phase: PilePhase::Stable,
            capped: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Earthquake {
    pub x: usize,
    pub y: usize,
    pub radius: usize,
    pub grains_moved: u64,
}

/// What the audio did to the pile this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AudioResponse {
    pub burst_grains: usize,
    pub drip_grains: usize,
    pub quake: Option<Earthquake>,
}

pub struct SandpileEngine {
    cfg: SandpileConfig,
    grid: Grid<SandpileCell>,
    piles: Vec<StrategicPile>,
    rng: fastrand::Rng,
    last_bass: f32,
    last_treble: f32,
    drip_clock: f32,
    events: EventLog,
    grains_lost_total: u64,
    last_report: StabilizeReport,
    last_audio: AudioResponse,
}

impl SandpileEngine {
    pub fn new(width: usize, height: usize, cfg: SandpileConfig, seed: u64) -> Self {
        let events = EventLog::new(cfg.event_cap);
        Self {
            grid: Grid::new(width, height),
            piles: strategic_piles(width, height),
            rng: fastrand::Rng::with_seed(seed),
            last_bass: 0.0,
            last_treble: 0.0,
            drip_clock: 0.0,
            events,
            grains_lost_total: 0,
            last_report: StabilizeReport::default(),
            last_audio: AudioResponse::default(),
            cfg,
        }
    }

    /// Rebuilds the grid for a new viewport and reseeds the piles.
    pub fn on_resize(&mut self, view_w: usize, view_h: usize) {
        let (w, h) = self.cfg.sizing.dims_for_view(view_w, view_h);
        info!(view_w, view_h, w, h, "sandpile resized");
        self.grid = Grid::new(w, h);
        self.piles = strategic_piles(w, h);
        self.reseed();
    }

    /// Clears all state and drops the initial grains on the strategic piles.
    pub fn reseed(&mut self) {
        self.grid.clear();
        self.events.clear();
        self.last_bass = 0.0;
        self.last_treble = 0.0;
        self.drip_clock = 0.0;
        self.grains_lost_total = 0;
        self.last_report = StabilizeReport::default();
        self.last_audio = AudioResponse::default();
        self.inject_strategic(self.cfg.initial_grains);
    }

    pub fn config(&self) -> &SandpileConfig {
        &self.cfg
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn grid(&self) -> &Grid<SandpileCell> {
        &self.grid
    }

    pub fn grains(&self, x: usize, y: usize) -> u32 {
        self.grid.get(x, y).map_or(0, |c| c.grains)
    }

    pub fn set_grains(&mut self, x: usize, y: usize, grains: u32) {
        if let Some(c) = self.grid.get_mut(x, y) {
            c.grains = grains;
        }
    }

    pub fn add_grains(&mut self, x: usize, y: usize, grains: u32) {
        if let Some(c) = self.grid.get_mut(x, y) {
            c.grains = c.grains.saturating_add(grains);
        }
    }

    pub fn piles(&self) -> &[StrategicPile] {
        &self.piles
    }

    pub fn events(&self) -> &VecDeque<VisualEvent> {
        self.events.entries()
    }

    pub fn last_report(&self) -> StabilizeReport {
        self.last_report
    }

    pub fn last_audio(&self) -> AudioResponse {
        self.last_audio
    }

    pub fn grains_lost_total(&self) -> u64 {
        self.grains_lost_total
    }

    pub fn total_grains(&self) -> u64 {
        self.grid.cells().iter().map(|c| c.grains as u64).sum()
    }

    pub fn max_grains(&self) -> u32 {
        self.grid.cells().iter().map(|c| c.grains).max().unwrap_or(0)
    }

    pub fn phase(&self) -> PilePhase {
        if self
            .grid
            .cells()
            .iter()
            .any(|c| c.grains >= TOPPLE_THRESHOLD)
        {
            PilePhase::Unstable
        } else {
            PilePhase::Stable
        }
    }

    /// Drops `count` grains, each on a pile picked by weight and jittered by up to one cell.
    /// Returns how many landed (zero on an empty grid).
    pub fn inject_strategic(&mut self, count: usize) -> usize {
        if self.grid.is_empty() || self.piles.is_empty() {
            return 0;
        }
        let w = self.grid.width() as isize;
        let h = self.grid.height() as isize;
        for _ in 0..count {
            let pile = pick_weighted(&self.piles, self.rng.f32());
            let x = (pile.x as isize + self.rng.isize(-1..=1)).clamp(0, w - 1);
            let y = (pile.y as isize + self.rng.isize(-1..=1)).clamp(0, h - 1);
            self.add_grains(x as usize, y as usize, 1);
        }
        count
    }

    /// Reads the bands once and turns them into grain bursts, drip ticks and earthquakes.
    /// `None` counts as silence: the drip keeps its base pace, nothing else fires and the
    /// previous band levels are kept for the next frame with audio.
    pub fn update_audio_reactivity(
        &mut self,
        audio: Option<&AudioBands>,
        time: &FrameTime,
    ) -> AudioResponse {
        let bands = audio.copied().unwrap_or_default();
        let mut resp = AudioResponse::default();

        let bass_rise = bands.bass - self.last_bass;
        if audio.is_some() && bass_rise > self.cfg.bass_rise_threshold {
            let n = (bass_rise * self.cfg.burst_scale).floor() as usize + 2;
            resp.burst_grains = self.inject_strategic(n);
        }

        let interval = (self.cfg.drip_interval * (1.0 - 0.75 * bands.mid.clamp(0.0, 1.0))).max(0.02);
        self.drip_clock += time.dt;
        let mut ticks = 0;
        while self.drip_clock >= interval && ticks < 8 {
            self.drip_clock -= interval;
            let n = self.rng.usize(2..=4);
            resp.drip_grains += self.inject_strategic(n);
            ticks += 1;
        }
        if ticks == 8 {
            self.drip_clock = 0.0;
        }

        let treble_rise = bands.treble - self.last_treble;
        if audio.is_some()
            && treble_rise > self.cfg.treble_jump_threshold
            && bands.treble > self.cfg.treble_floor
            && !self.grid.is_empty()
        {
            let x = self.rng.usize(..self.grid.width());
            let y = self.rng.usize(..self.grid.height());
            let lo = self.cfg.quake_radius_min.min(self.cfg.quake_radius_max);
            let radius = self.rng.usize(lo..=self.cfg.quake_radius_max.max(lo));
            resp.quake = Some(self.earthquake(x, y, radius));
        }

        if audio.is_some() {
            self.last_bass = bands.bass;
            self.last_treble = bands.treble;
        }
        self.last_audio = resp;
        resp
    }

    /// Moves half the grains of every cell within `radius` of `(cx, cy)` to a nearby random
    /// cell. Moves are planned from the pre-quake grid and applied afterwards; no toppling
    /// happens here.
    pub fn earthquake(&mut self, cx: usize, cy: usize, radius: usize) -> Earthquake {
        let mut quake = Earthquake {
            x: cx,
            y: cy,
            radius,
            grains_moved: 0,
        };
        if self.grid.is_empty() {
            return quake;
        }

        let w = self.grid.width() as isize;
        let h = self.grid.height() as isize;
        let r = radius as isize;
        let scatter = self.cfg.quake_scatter.max(1);
        let mut moves: Vec<(usize, usize, u32)> = Vec::new();

        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let Some(src) = self.grid.checked_index(cx as isize + dx, cy as isize + dy) else {
                    continue;
                };
                let moved = self.grid.cells()[src].grains / 2;
                if moved == 0 {
                    continue;
                }
                let (sx, sy) = self.grid.coords(src);
                let tx = (sx as isize + self.rng.isize(-scatter..=scatter)).clamp(0, w - 1);
                let ty = (sy as isize + self.rng.isize(-scatter..=scatter)).clamp(0, h - 1);
                moves.push((src, self.grid.index(tx as usize, ty as usize), moved));
            }
        }

        let cells = self.grid.cells_mut();
        for (src, dst, n) in moves {
            cells[src].grains -= n;
            cells[dst].grains += n;
            quake.grains_moved += n as u64;
        }

        debug!(cx, cy, radius, moved = quake.grains_moved, "earthquake");
        quake
    }

    /// One toppling wave over at most `limit` cells, in scan order.
    pub fn topple_wave(&mut self, limit: usize) -> WaveOutcome {
        self.topple_wave_with(limit, &mut |_| {})
    }

    /// Like [`Self::topple_wave`], letting `reorder` permute the snapshot before it is applied.
    pub fn topple_wave_with(
        &mut self,
        limit: usize,
        reorder: &mut dyn FnMut(&mut [Topple]),
    ) -> WaveOutcome {
        let mut wave: Vec<Topple> = Vec::new();
        let mut deferred = 0usize;
        for (index, cell) in self.grid.cells().iter().enumerate() {
            if cell.grains < TOPPLE_THRESHOLD {
                continue;
            }
            if wave.len() < limit {
                wave.push(Topple {
                    index,
                    units: cell.grains / TOPPLE_THRESHOLD,
                });
            } else {
                deferred += 1;
            }
        }
        reorder(&mut wave);

        let mut lost = 0u64;
        for t in &wave {
            let (x, y) = self.grid.coords(t.index);
            {
                let cell = &mut self.grid.cells_mut()[t.index];
                cell.grains -= t.units * TOPPLE_THRESHOLD;
                cell.topple_phase = 1.0;
            }
            for (dx, dy) in NEIGHBORS_4 {
                match self.grid.checked_index(x as isize + dx, y as isize + dy) {
                    Some(n) => self.grid.cells_mut()[n].grains += t.units,
                    None => lost += t.units as u64,
                }
            }
            let intensity = 0.35 + 0.15 * t.units.min(4) as f32;
            self.events.push(VisualEvent::Topple(EventSpot::new(
                x as f32 + 0.5,
                y as f32 + 0.5,
                intensity,
                0.4,
            )));
        }

        self.grains_lost_total += lost;
        WaveOutcome {
            topples: wave.len(),
            grains_lost: lost,
            deferred,
        }
    }

    /// Runs waves until stable or until `max_waves` (if any) is spent.
    pub fn stabilize(&mut self, max_waves: Option<usize>, per_wave: usize) -> StabilizeReport {
        self.stabilize_with(max_waves, per_wave, &mut |_| {})
    }

    pub fn stabilize_with(
        &mut self,
        max_waves: Option<usize>,
        per_wave: usize,
        reorder: &mut dyn FnMut(&mut [Topple]),
    ) -> StabilizeReport {
        let mut report = StabilizeReport::default();
        let per_wave = per_wave.max(1);
        loop {
            if max_waves.is_some_and(|m| report.waves >= m) {
                break;
            }
            let out = self.topple_wave_with(per_wave, reorder);
            if out.topples == 0 {
                break;
            }
            report.waves += 1;
            report.topples += out.topples;
            report.grains_lost += out.grains_lost;
        }
        report.phase = self.phase();
        report.capped = report.phase == PilePhase::Unstable;
        report
    }

    /// Full frame: audio, bounded stabilization, then fading of topple glow and events.
    pub fn step_grid(&mut self, audio: Option<&AudioBands>, time: &FrameTime) -> StabilizeReport {
        self.update_audio_reactivity(audio, time);

        let report = self.stabilize(Some(self.cfg.max_waves), self.cfg.max_topples_per_wave);
        if report.capped {
            debug!(waves = report.waves, topples = report.topples, "cascade deferred to next frame");
        }

        let fade = self.cfg.topple_fade_per_sec * time.dt;
        for cell in self.grid.cells_mut() {
            cell.topple_phase = (cell.topple_phase - fade).max(0.0);
        }
        self.events.fade(time.dt);

        self.last_report = report;
        report
    }
}

/// Dominant centre pile plus four quarter-point piles; weights sum to 1.
pub fn strategic_piles(width: usize, height: usize) -> Vec<StrategicPile> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let q = |n: usize, k: usize| (n * k / 4).min(n - 1);
    let mut piles = vec![StrategicPile {
        x: q(width, 2),
        y: q(height, 2),
        weight: 0.6,
    }];
    for (kx, ky) in [(1, 1), (3, 1), (1, 3), (3, 3)] {
        piles.push(StrategicPile {
            x: q(width, kx),
            y: q(height, ky),
            weight: 0.1,
        });
    }
    piles
}

/// Picks the pile whose cumulative weight first exceeds `r` (a draw in [0, 1)).
pub fn pick_weighted(piles: &[StrategicPile], r: f32) -> StrategicPile {
    let total: f32 = piles.iter().map(|p| p.weight).sum();
    let mut acc = 0.0f32;
    let target = r * total;
    for p in piles {
        acc += p.weight;
        if target < acc {
            return *p;
        }
    }
    piles[piles.len() - 1]
}
