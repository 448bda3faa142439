//! Pattern-driven flood fill: seed safe kernels, bridge them, extract the
//! boundary layer.
//!
//! 1. **Kernel scan** — stride the raster in `D×D` tiles; a tile whose every
//!    cell is the target class gets its interior (one-cell margin left
//!    untouched) marked [`Cell::Active`]. The margin guarantees later-drawn
//!    polygons keep distance from the raw classification edge.
//! 2. **Bridging** — fixed-point iteration promoting `target target` pairs
//!    flanked by `Active` cells two steps out, but only when no orthogonal
//!    neighbor of the bridge is gray. `Active` only ever grows, so the
//!    iteration terminates.
//! 3. **Border bands** (exterior target only) — the 16-pixel frame is
//!    unconditionally `Active`; the input contract guarantees it is
//!    exterior-classified.
//! 4. **Boundary extraction** — every `Active` cell with a target-class
//!    8-neighbor becomes [`Cell::Boundary`]; those cells are the only legal
//!    input to the boundary tracer.

use log::{debug, info};

use crate::grid::BORDER_WIDTH;
use crate::raster::{Cell, RasterMap};
use crate::RegionKind;

/// Run the seed fill for one target class over a classified raster.
///
/// Returns a marked scratch copy; the input is untouched. Granularity below
/// 3 is silently clamped to 3.
pub fn kernel_seed_fill(input: &RasterMap, kind: RegionKind, granularity: i32) -> RasterMap {
    let target = kind.target();
    let d = granularity.max(3);
    let mut map = input.clone();
    let w = map.width() as i32;
    let h = map.height() as i32;

    info!("seed fill: scanning for {d}x{d} kernels of {target:?}");
    mark_kernels(&mut map, target, d);

    let passes = connect_kernels(&mut map, target);
    debug!("seed fill: bridging reached a fixed point after {passes} passes");

    // The frame is exterior by input contract, so the exterior pass may
    // connect to it unconditionally.
    if kind == RegionKind::Exterior {
        map.fill_rect(0, 0, w - 1, BORDER_WIDTH - 1, Cell::Active);
        map.fill_rect(0, h - BORDER_WIDTH, w - 1, h - 1, Cell::Active);
        map.fill_rect(0, 0, BORDER_WIDTH - 1, h - 1, Cell::Active);
        map.fill_rect(w - BORDER_WIDTH, 0, w - 1, h - 1, Cell::Active);
    }

    info!("seed fill: extracting boundary layer");
    extract_boundary(&mut map, target);

    map
}

/// Stage 1: mark the interior of every homogeneous `d×d` tile.
fn mark_kernels(map: &mut RasterMap, target: Cell, d: i32) {
    let w = map.width() as i32;
    let h = map.height() as i32;

    let mut y = 0;
    while y < h - d {
        let mut x = 0;
        while x < w - d {
            if map.get(x, y) == target && tile_homogeneous(map, x, y, d, target) {
                // leave the one-cell margin untouched
                for y2 in (y + 1)..(y + d - 1) {
                    for x2 in (x + 1)..(x + d - 1) {
                        map.set(x2, y2, Cell::Active);
                    }
                }
            }
            x += d;
        }
        y += d;
    }
}

fn tile_homogeneous(map: &RasterMap, x: i32, y: i32, d: i32, target: Cell) -> bool {
    for dy in 0..d {
        for dx in 0..d {
            if map.get(x + dx, y + dy) != target {
                return false;
            }
        }
    }
    true
}

/// Stage 2: promote safe two-cell bridges between marked regions until no
/// pass changes anything. Returns the number of passes run.
fn connect_kernels(map: &mut RasterMap, target: Cell) -> usize {
    let w = map.width() as i32;
    let h = map.height() as i32;
    let mut passes = 0;

    loop {
        passes += 1;
        let mut changed = false;

        for y in 1..(h - 2) {
            for x in 1..(w - 2) {
                if map.get(x, y) != target {
                    continue;
                }

                if map.get(x + 1, y) == target
                    && map.get(x - 1, y) == Cell::Active
                    && map.get(x + 2, y) == Cell::Active
                {
                    // horizontal bridge; the rows above and below must be
                    // free of gray, otherwise the connection is unsafe
                    let safe = (0..4).all(|dx| {
                        !is_gray(map, x + dx, y - 1) && !is_gray(map, x + dx, y + 1)
                    });
                    if safe {
                        map.set(x, y, Cell::Active);
                        map.set(x + 1, y, Cell::Active);
                        changed = true;
                    }
                } else if map.get(x, y + 1) == target
                    && map.get(x, y + 2) == Cell::Active
                    && map.get(x, y - 1) == Cell::Active
                {
                    // same pattern vertically
                    let safe = (0..4).all(|dy| {
                        !is_gray(map, x - 1, y + dy) && !is_gray(map, x + 1, y + dy)
                    });
                    if safe {
                        map.set(x, y, Cell::Active);
                        map.set(x, y + 1, Cell::Active);
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            return passes;
        }
    }
}

#[inline]
fn is_gray(map: &RasterMap, x: i32, y: i32) -> bool {
    map.contains(x, y) && map.get(x, y) == Cell::Unknown
}

/// Stage 4: relabel every `Active` cell with a target-class 8-neighbor.
fn extract_boundary(map: &mut RasterMap, target: Cell) {
    let w = map.width() as i32;
    let h = map.height() as i32;

    for y in 1..(h - 1) {
        for x in 1..(w - 1) {
            if map.get(x, y) != Cell::Active {
                continue;
            }
            let touches_target = (-1..=1)
                .any(|dy| (-1..=1).any(|dx| map.get(x + dx, y + dy) == target));
            if touches_target {
                map.set(x, y, Cell::Boundary);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 64x64 exterior raster with a 16x16 interior square at (24,24); the
    /// frame contract (16 exterior pixels on every side) holds.
    fn square_raster() -> RasterMap {
        let mut map = RasterMap::new(64, 64, Cell::Exterior);
        map.fill_rect(24, 24, 39, 39, Cell::Interior);
        map
    }

    #[test]
    fn kernels_leave_one_cell_margin() {
        let mut map = RasterMap::new(20, 20, Cell::Interior);
        mark_kernels(&mut map, Cell::Interior, 5);

        // first tile at (0,0): interior marked, margin untouched
        assert_eq!(map.get(1, 1), Cell::Active);
        assert_eq!(map.get(3, 3), Cell::Active);
        assert_eq!(map.get(0, 2), Cell::Interior);
        assert_eq!(map.get(4, 2), Cell::Interior);
    }

    #[test]
    fn interior_fill_stays_inside_the_square() {
        let marked = kernel_seed_fill(&square_raster(), RegionKind::Interior, 5);

        let mut boundary = 0;
        for y in 0..64 {
            for x in 0..64 {
                match marked.get(x, y) {
                    Cell::Active | Cell::Boundary => {
                        assert!(
                            (24..=39).contains(&x) && (24..=39).contains(&y),
                            "mark escaped the interior square at ({x},{y})"
                        );
                        if marked.get(x, y) == Cell::Boundary {
                            boundary += 1;
                        }
                    }
                    _ => {}
                }
            }
        }
        assert!(boundary > 0, "expected a boundary ring");
    }

    #[test]
    fn boundary_cells_have_exactly_two_boundary_neighbors() {
        let marked = kernel_seed_fill(&square_raster(), RegionKind::Interior, 5);

        for y in 1..63 {
            for x in 1..63 {
                if marked.get(x, y) != Cell::Boundary {
                    continue;
                }
                let neighbors = [(1, 0), (-1, 0), (0, -1), (0, 1)]
                    .iter()
                    .filter(|(dx, dy)| marked.get(x + dx, y + dy) == Cell::Boundary)
                    .count();
                assert_eq!(neighbors, 2, "boundary cell ({x},{y}) is not on a simple loop");
            }
        }
    }

    #[test]
    fn exterior_fill_marks_border_bands() {
        let marked = kernel_seed_fill(&square_raster(), RegionKind::Exterior, 5);
        // extraction never touches the outermost rows, so the frame corners
        // stay Active while inner band cells may join the boundary layer
        assert_eq!(marked.get(0, 0), Cell::Active);
        assert_eq!(marked.get(63, 63), Cell::Active);
    }

    fn bridge_map() -> RasterMap {
        // Active | target target | Active, horizontally at row 4
        let mut map = RasterMap::new(12, 9, Cell::Exterior);
        map.set(2, 4, Cell::Active);
        map.set(3, 4, Cell::Interior);
        map.set(4, 4, Cell::Interior);
        map.set(5, 4, Cell::Active);
        map
    }

    #[test]
    fn safe_bridge_is_promoted() {
        let mut map = bridge_map();
        connect_kernels(&mut map, Cell::Interior);
        assert_eq!(map.get(3, 4), Cell::Active);
        assert_eq!(map.get(4, 4), Cell::Active);
    }

    #[test]
    fn gray_neighbor_blocks_bridge() {
        let mut map = bridge_map();
        map.set(4, 3, Cell::Unknown);
        connect_kernels(&mut map, Cell::Interior);
        assert_eq!(map.get(3, 4), Cell::Interior);
        assert_eq!(map.get(4, 4), Cell::Interior);
    }
}
