use crate::grid::Grid;

/// Live cells of a glider travelling towards +x, +y, relative to its 3×3 box.
pub const GLIDER_SE: [(usize, usize); 5] = [(1, 0), (2, 1), (0, 2), (1, 2), (2, 2)];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StillLife {
    Block,
    Beehive,
    Loaf,
}

impl StillLife {
    pub const ALL: [Self; 3] = [Self::Block, Self::Beehive, Self::Loaf];

    pub fn cells(self) -> &'static [(usize, usize)] {
        match self {
            Self::Block => &[(0, 0), (1, 0), (0, 1), (1, 1)],
            Self::Beehive => &[(1, 0), (2, 0), (0, 1), (3, 1), (1, 2), (2, 2)],
            Self::Loaf => &[(1, 0), (2, 0), (0, 1), (3, 1), (1, 2), (3, 2), (2, 3)],
        }
    }

    pub fn size(self) -> (usize, usize) {
        match self {
            Self::Block => (2, 2),
            Self::Beehive => (4, 3),
            Self::Loaf => (4, 4),
        }
    }
}

/// Glider cells for heading `(vx, vy)` (each ±1), mirrored from [`GLIDER_SE`].
pub fn glider_cells(vx: i8, vy: i8) -> [(usize, usize); 5] {
    GLIDER_SE.map(|(x, y)| {
        let x = if vx < 0 { 2 - x } else { x };
        let y = if vy < 0 { 2 - y } else { y };
        (x, y)
    })
}

/// Writes live cells at `(x0, y0) + offset`, wrapping at the edges.
pub fn stamp_life(life: &mut Grid<u8>, x0: isize, y0: isize, cells: &[(usize, usize)]) {
    if life.is_empty() {
        return;
    }
    for &(dx, dy) in cells {
        let idx = life.wrap_index(x0 + dx as isize, y0 + dy as isize);
        life.cells_mut()[idx] = 1;
    }
}

/// Adds a Gaussian blob of Lenia density peaking at `intensity` in the centre, clamped to 1.
pub fn stamp_organism(lenia: &mut Grid<f32>, cx: isize, cy: isize, radius: f32, intensity: f32) {
    if lenia.is_empty() || radius <= 0.0 {
        return;
    }
    let sigma = radius * 0.5;
    let ir = radius.ceil() as isize;
    for dy in -ir..=ir {
        for dx in -ir..=ir {
            let d2 = (dx * dx + dy * dy) as f32;
            if d2 > radius * radius {
                continue;
            }
            let v = intensity * (-d2 / (2.0 * sigma * sigma)).exp();
            let idx = lenia.wrap_index(cx + dx, cy + dy);
            let cell = &mut lenia.cells_mut()[idx];
            *cell = (*cell + v).clamp(0.0, 1.0);
        }
    }
}

/// Live Life cells in the square window of half-size `radius` around `(cx, cy)`, wrapping.
pub fn life_activity(life: &Grid<u8>, cx: usize, cy: usize, radius: usize) -> usize {
    let r = radius as isize;
    let mut n = 0;
    for dy in -r..=r {
        for dx in -r..=r {
            n += *life.get_wrapped(cx as isize + dx, cy as isize + dy) as usize;
        }
    }
    n
}

/// Sampled search for a seeding site away from Life activity. Candidates whose activity
/// exceeds `limit` are rejected; the quietest accepted one wins. If every sample is rejected
/// the quietest sample is used anyway.
pub fn pick_quiet_site(
    life: &Grid<u8>,
    rng: &mut fastrand::Rng,
    samples: usize,
    radius: usize,
    limit: usize,
) -> Option<(usize, usize)> {
    if life.is_empty() {
        return None;
    }
    let mut best_accepted: Option<(usize, (usize, usize))> = None;
    let mut best_any: Option<(usize, (usize, usize))> = None;

    for _ in 0..samples.max(1) {
        let x = rng.usize(..life.width());
        let y = rng.usize(..life.height());
        let activity = life_activity(life, x, y, radius);

        if best_any.is_none_or(|(a, _)| activity < a) {
            best_any = Some((activity, (x, y)));
        }
        if activity <= limit && best_accepted.is_none_or(|(a, _)| activity < a) {
            best_accepted = Some((activity, (x, y)));
            if activity == 0 {
                break;
            }
        }
    }

    best_accepted.or(best_any).map(|(_, site)| site)
}
