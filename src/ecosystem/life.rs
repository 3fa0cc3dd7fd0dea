use crate::grid::{Grid, NEIGHBORS_8};

/// Live Moore neighbours of `(x, y)` on a torus.
#[inline]
pub fn live_neighbors(life: &Grid<u8>, x: usize, y: usize) -> u8 {
    let mut n = 0u8;
    for (dx, dy) in NEIGHBORS_8 {
        n += *life.get_wrapped(x as isize + dx, y as isize + dy);
    }
    n
}

/// B3/S23.
#[inline]
pub fn conway_rule(alive: bool, neighbors: u8) -> bool {
    matches!((alive, neighbors), (true, 2) | (true, 3) | (false, 3))
}

/// Builds the next generation of `current` into `next`. Every decision reads only `current`.
///
/// `veto(x, y)` is consulted for cells that would be alive next generation; returning `true`
/// kills the cell instead. Returns the live count of the new generation.
pub fn step_life(
    current: &Grid<u8>,
    next: &mut Grid<u8>,
    veto: &mut dyn FnMut(usize, usize) -> bool,
) -> usize {
    debug_assert_eq!(current.width(), next.width());
    debug_assert_eq!(current.height(), next.height());

    let mut alive_count = 0;
    for y in 0..current.height() {
        for x in 0..current.width() {
            let idx = current.index(x, y);
            let alive = current.cells()[idx] != 0;
            let mut lives = conway_rule(alive, live_neighbors(current, x, y));
            if lives && veto(x, y) {
                lives = false;
            }
            next.cells_mut()[idx] = u8::from(lives);
            alive_count += lives as usize;
        }
    }
    alive_count
}

/// Plain Conway generation in place of `life`, using `scratch` as the second buffer.
pub fn advance(life: &mut Grid<u8>, scratch: &mut Grid<u8>) -> usize {
    let n = step_life(life, scratch, &mut |_, _| false);
    std::mem::swap(life, scratch);
    n
}
