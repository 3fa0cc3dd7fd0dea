use crate::grid::{Grid, NEIGHBORS_8};
use std::collections::VecDeque;

/// Fixed-size bitset addressed by grid index.
#[derive(Clone, Debug)]
pub struct VisitedSet {
    words: Vec<u64>,
}

impl VisitedSet {
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.words
            .get(idx / 64)
            .is_some_and(|w| w & (1u64 << (idx % 64)) != 0)
    }

    /// Marks `idx`; returns `false` when it was already set.
    #[inline]
    pub fn insert(&mut self, idx: usize) -> bool {
        let Some(word) = self.words.get_mut(idx / 64) else {
            return false;
        };
        let bit = 1u64 << (idx % 64);
        let fresh = *word & bit == 0;
        *word |= bit;
        fresh
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }
}

/// Connected group of cells. The bounding box is in unwrapped grid coordinates, so a region
/// that crosses a toroidal seam reports the full span.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub cells: Vec<usize>,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl Region {
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn bbox_width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn bbox_height(&self) -> usize {
        self.max_y - self.min_y + 1
    }
}

/// 8-connected flood fill over cells matching `member`. Iterative BFS; `wrap` selects toroidal
/// adjacency.
pub fn find_regions<T>(grid: &Grid<T>, wrap: bool, member: impl Fn(&T) -> bool) -> Vec<Region> {
    let mut visited = VisitedSet::new(grid.len());
    let mut queue = VecDeque::new();
    let mut out = Vec::new();

    for start in 0..grid.len() {
        if !member(&grid.cells()[start]) || !visited.insert(start) {
            continue;
        }

        let (sx, sy) = grid.coords(start);
        let mut region = Region {
            cells: Vec::new(),
            min_x: sx,
            min_y: sy,
            max_x: sx,
            max_y: sy,
        };
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let (x, y) = grid.coords(idx);
            region.cells.push(idx);
            region.min_x = region.min_x.min(x);
            region.min_y = region.min_y.min(y);
            region.max_x = region.max_x.max(x);
            region.max_y = region.max_y.max(y);

            for (dx, dy) in NEIGHBORS_8 {
                let nx = x as isize + dx;
                let ny = y as isize + dy;
                let n = if wrap {
                    grid.wrap_index(nx, ny)
                } else {
                    match grid.checked_index(nx, ny) {
                        Some(n) => n,
                        None => continue,
                    }
                };
                if member(&grid.cells()[n]) && visited.insert(n) {
                    queue.push_back(n);
                }
            }
        }

        out.push(region);
    }

    out
}
