/// Orthogonal neighbours (up, down, left, right).
pub const NEIGHBORS_4: [(isize, isize); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// Moore neighbourhood, centre excluded.
pub const NEIGHBORS_8: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Dense row-major 2D storage. Dimensions are fixed for the lifetime of the value; a resize
/// builds a new grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, T::default())
    }

    /// Resets every cell to `T::default()` without reallocating.
    pub fn clear(&mut self) {
        self.cells.fill(T::default());
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width.saturating_mul(height)],
        }
    }

    pub fn fill(&mut self, value: T) {
        self.cells.fill(value);
    }

    /// Copies all cells from a grid of identical dimensions. Mismatched grids are ignored.
    pub fn copy_from(&mut self, other: &Grid<T>) {
        if self.width == other.width && self.height == other.height {
            self.cells.clone_from_slice(&other.cells);
        }
    }
}

impl<T> Grid<T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        let w = self.width.max(1);
        (idx % w, idx / w)
    }

    #[inline]
    pub fn contains(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    /// Toroidal coordinate fold. Callers must not use this on an empty grid.
    #[inline]
    pub fn wrap(&self, x: isize, y: isize) -> (usize, usize) {
        let w = self.width as isize;
        let h = self.height as isize;
        (x.rem_euclid(w) as usize, y.rem_euclid(h) as usize)
    }

    #[inline]
    pub fn wrap_index(&self, x: isize, y: isize) -> usize {
        let (wx, wy) = self.wrap(x, y);
        self.index(wx, wy)
    }

    /// Bounds-checked index for signed coordinates; `None` off-grid.
    #[inline]
    pub fn checked_index(&self, x: isize, y: isize) -> Option<usize> {
        self.contains(x, y)
            .then(|| self.index(x as usize, y as usize))
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x < self.width && y < self.height {
            self.cells.get(self.index(x, y))
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut T> {
        if x < self.width && y < self.height {
            let idx = self.index(x, y);
            self.cells.get_mut(idx)
        } else {
            None
        }
    }

    #[inline]
    pub fn get_wrapped(&self, x: isize, y: isize) -> &T {
        &self.cells[self.wrap_index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        if let Some(cell) = self.get_mut(x, y) {
            *cell = value;
        }
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        let w = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (i % w, i / w, c))
    }

    /// Shortest signed offset from `a` to `b` on a ring of `len` cells.
    pub fn torus_delta(a: f32, b: f32, len: usize) -> f32 {
        let len = len.max(1) as f32;
        let mut d = b - a;
        if d > len * 0.5 {
            d -= len;
        } else if d < -len * 0.5 {
            d += len;
        }
        d
    }
}

/// Grid dimensions chosen from the viewport in pixels. Viewports wider than
/// [`LARGE_VIEWPORT_PX`] get the large grid.
pub const LARGE_VIEWPORT_PX: usize = 800;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSizing {
    pub small: (usize, usize),
    pub large: (usize, usize),
}

impl GridSizing {
    pub const fn new(small: (usize, usize), large: (usize, usize)) -> Self {
        Self { small, large }
    }

    pub fn dims_for_view(&self, view_w: usize, _view_h: usize) -> (usize, usize) {
        if view_w > LARGE_VIEWPORT_PX {
            self.large
        } else {
            self.small
        }
    }
}
