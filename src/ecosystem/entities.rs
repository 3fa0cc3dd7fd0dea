use crate::grid::Grid;

/// Distance within which a cell counts as part of a tracked glider.
pub const GLIDER_REACH: f32 = 2.5;

/// Radius searched when verifying that a glider still has live cells under it.
pub const GLIDER_LIVENESS_RADIUS: isize = 3;

/// Approximate position of a travelling Life glider. `(x, y)` is the centre of its 3×3 box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glider {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub age: u32,
    pub energy: f32,
}

impl Glider {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            age: 0,
            energy: 0.0,
        }
    }

    /// Ages one generation. A glider covers one diagonal cell every four generations, so the
    /// tracked position follows the pattern on every fourth tick.
    pub fn advance(&mut self, width: usize, height: usize) {
        self.age += 1;
        if self.age % 4 == 0 {
            self.x = (self.x + self.vx).rem_euclid(width.max(1) as f32);
            self.y = (self.y + self.vy).rem_euclid(height.max(1) as f32);
        }
    }

    /// Whether any live cell sits within [`GLIDER_LIVENESS_RADIUS`] of the tracked centre.
    pub fn has_live_cells(&self, life: &Grid<u8>) -> bool {
        if life.is_empty() {
            return false;
        }
        let cx = self.x.round() as isize;
        let cy = self.y.round() as isize;
        let r = GLIDER_LIVENESS_RADIUS;
        (-r..=r).any(|dy| (-r..=r).any(|dx| *life.get_wrapped(cx + dx, cy + dy) != 0))
    }
}

/// Bounding box of a still life that Lenia can feed on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticPattern {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub energy: f32,
}

impl StaticPattern {
    /// Box membership on a torus of `grid_w × grid_h`.
    pub fn contains(&self, x: usize, y: usize, grid_w: usize, grid_h: usize) -> bool {
        let dx = (x + grid_w - self.x % grid_w.max(1)) % grid_w.max(1);
        let dy = (y + grid_h - self.y % grid_h.max(1)) % grid_h.max(1);
        dx < self.width && dy < self.height
    }

    /// Whether the box still holds a live pattern that did not change over the last
    /// generation. `previous` is the generation before `life`.
    pub fn is_intact(&self, life: &Grid<u8>, previous: &Grid<u8>) -> bool {
        let mut any_alive = false;
        for dy in 0..self.height {
            for dx in 0..self.width {
                let x = (self.x + dx) as isize;
                let y = (self.y + dy) as isize;
                let now = *life.get_wrapped(x, y);
                if now != *previous.get_wrapped(x, y) {
                    return false;
                }
                any_alive |= now != 0;
            }
        }
        any_alive
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellRole {
    Dead,
    Glider,
    Static,
    Unclassified,
}

/// Tracked predator and prey lists for one grid.
#[derive(Clone, Debug, Default)]
pub struct TrackedEntities {
    pub width: usize,
    pub height: usize,
    pub gliders: Vec<Glider>,
    pub statics: Vec<StaticPattern>,
}

impl TrackedEntities {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            gliders: Vec::new(),
            statics: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.gliders.clear();
        self.statics.clear();
    }

    /// Nearest glider within [`GLIDER_REACH`] of the cell centre, toroidal distance.
    pub fn glider_near(&self, x: usize, y: usize) -> Option<usize> {
        let px = x as f32;
        let py = y as f32;
        let mut best: Option<(usize, f32)> = None;
        for (i, g) in self.gliders.iter().enumerate() {
            let dx = Grid::<u8>::torus_delta(g.x, px, self.width);
            let dy = Grid::<u8>::torus_delta(g.y, py, self.height);
            let d2 = dx * dx + dy * dy;
            if d2 <= GLIDER_REACH * GLIDER_REACH && best.is_none_or(|(_, b)| d2 < b) {
                best = Some((i, d2));
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn static_at(&self, x: usize, y: usize) -> Option<usize> {
        self.statics
            .iter()
            .position(|s| s.contains(x, y, self.width, self.height))
    }

    /// Ages gliders by one generation.
    pub fn advance_gliders(&mut self) {
        let (w, h) = (self.width, self.height);
        for g in &mut self.gliders {
            g.advance(w, h);
        }
    }

    /// Drops gliders that are too old or no longer sit on live cells. Returns how many went.
    pub fn cleanup_gliders(&mut self, life: &Grid<u8>, max_age: u32) -> usize {
        let before = self.gliders.len();
        self.gliders
            .retain(|g| g.age <= max_age && g.has_live_cells(life));
        before - self.gliders.len()
    }

    /// Drops still lifes that were eaten away or disturbed since they were tracked.
    /// Returns how many went.
    pub fn cleanup_statics(&mut self, life: &Grid<u8>, previous: &Grid<u8>) -> usize {
        if life.is_empty() || previous.is_empty() {
            return 0;
        }
        let before = self.statics.len();
        self.statics.retain(|s| s.is_intact(life, previous));
        before - self.statics.len()
    }
}

/// Role of a Life cell, derived from the tracked lists rather than stored per cell.
pub fn classify(x: usize, y: usize, alive: bool, entities: &TrackedEntities) -> CellRole {
    if !alive {
        return CellRole::Dead;
    }
    if entities.glider_near(x, y).is_some() {
        return CellRole::Glider;
    }
    if entities.static_at(x, y).is_some() {
        return CellRole::Static;
    }
    CellRole::Unclassified
}
