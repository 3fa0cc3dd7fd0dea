use crate::grid::Grid;

/// Macro tiles flagged for Lenia recomputation this frame.
///
/// Rebuilt from scratch every frame: a tile is marked when it holds a live Life cell or a Lenia
/// value above the activation threshold, then the marks grow by one tile in every direction
/// (wrapping) so density can spread into neighbouring tiles. Nothing here is authoritative state.
#[derive(Clone, Debug)]
pub struct ActiveRegions {
    tile: usize,
    tiles_x: usize,
    tiles_y: usize,
    flags: Vec<bool>,
    scratch: Vec<bool>,
    active: usize,
}

impl ActiveRegions {
    pub fn new(width: usize, height: usize, tile: usize) -> Self {
        let tile = tile.max(1);
        let tiles_x = width.div_ceil(tile);
        let tiles_y = height.div_ceil(tile);
        Self {
            tile,
            tiles_x,
            tiles_y,
            flags: vec![false; tiles_x * tiles_y],
            scratch: vec![false; tiles_x * tiles_y],
            active: 0,
        }
    }

    pub fn rebuild(&mut self, life: &Grid<u8>, lenia: &Grid<f32>, threshold: f32) {
        self.scratch.fill(false);
        for (x, y, &alive) in life.iter() {
            let hot = alive != 0 || lenia.cells()[life.index(x, y)] > threshold;
            if hot {
                let t = (y / self.tile) * self.tiles_x + x / self.tile;
                self.scratch[t] = true;
            }
        }

        self.flags.fill(false);
        let tx = self.tiles_x as isize;
        let ty = self.tiles_y as isize;
        for y in 0..ty {
            for x in 0..tx {
                if !self.scratch[(y * tx + x) as usize] {
                    continue;
                }
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let nx = (x + dx).rem_euclid(tx);
                        let ny = (y + dy).rem_euclid(ty);
                        self.flags[(ny * tx + nx) as usize] = true;
                    }
                }
            }
        }
        self.active = self.flags.iter().filter(|&&f| f).count();
    }

    pub fn tiles(&self) -> (usize, usize) {
        (self.tiles_x, self.tiles_y)
    }

    pub fn total_tiles(&self) -> usize {
        self.flags.len()
    }

    pub fn active_tiles(&self) -> usize {
        self.active
    }

    /// Fraction of tiles that are active.
    pub fn share(&self) -> f32 {
        if self.flags.is_empty() {
            0.0
        } else {
            self.active as f32 / self.flags.len() as f32
        }
    }

    pub fn is_tile_active(&self, tx: usize, ty: usize) -> bool {
        tx < self.tiles_x && ty < self.tiles_y && self.flags[ty * self.tiles_x + tx]
    }

    pub fn is_cell_active(&self, x: usize, y: usize) -> bool {
        self.is_tile_active(x / self.tile, y / self.tile)
    }

    /// Cell bounds `(x0, y0, x1, y1)` (exclusive end) of a tile, clipped to the grid.
    pub fn tile_bounds(&self, tx: usize, ty: usize, width: usize, height: usize) -> (usize, usize, usize, usize) {
        let x0 = tx * self.tile;
        let y0 = ty * self.tile;
        (x0, y0, (x0 + self.tile).min(width), (y0 + self.tile).min(height))
    }

    pub fn active_tile_coords(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let tx = self.tiles_x.max(1);
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, f)| **f)
            .map(move |(i, _)| (i % tx, i / tx))
    }
}
