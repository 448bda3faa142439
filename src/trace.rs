//! Boundary tracing: marked raster → closed rectilinear polygons.
//!
//! The seed fill leaves a layer of [`Cell::Boundary`] cells in which, by
//! construction, every cell has exactly two boundary 4-neighbors. Tracing
//! repeatedly picks an unvisited boundary cell and walks the loop it lies
//! on, consuming cells as it goes, until the raster holds no boundary cell.
//! A walk that dead-ends before returning to its start means the upstream
//! invariant is broken; that is fatal, not recoverable.

use std::path::Path;

use log::{info, warn};

use crate::bitmap;
use crate::error::PolyError;
use crate::grid::{PlaneGrid, DENOMINATOR};
use crate::polygon::Polygon;
use crate::raster::{Cell, RasterMap};
use crate::render;

/// Probe order for the next walk step. The choice is arbitrary but fixed;
/// it determines traversal direction, not the resulting polygon.
const STEPS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, -1), (0, 1)];

/// What one tracing run produced.
#[derive(Debug, Default)]
pub struct TraceOutcome {
    /// Polygons above the minimum vertex count, in discovery order.
    pub polygons: Vec<Polygon>,
    /// Closed loops at or below the minimum vertex count, dropped.
    pub discarded_short: usize,
    /// Boundary cells with no boundary neighbor at all, consumed without
    /// producing anything. Well-formed input should not contain these.
    pub isolated_cells: usize,
}

/// Trace every boundary loop out of `marked`, consuming the boundary layer.
///
/// Raster coordinates convert to the rational grid through `grid` and the
/// global denominator. On a dead end the offending raster is snapshot to
/// `snapshot_dir` and the whole run fails.
pub fn trace_boundaries(
    marked: &mut RasterMap,
    grid: &PlaneGrid,
    min_vertices: usize,
    snapshot_dir: &Path,
) -> Result<TraceOutcome, PolyError> {
    let mut outcome = TraceOutcome::default();

    while let Some((sx, sy)) = find_start(marked) {
        match walk_loop(marked, grid, sx, sy, snapshot_dir)? {
            None => outcome.isolated_cells += 1,
            Some(mut pg) => {
                pg.trim_closing_run();
                if pg.len() > min_vertices {
                    outcome.polygons.push(pg);
                } else {
                    outcome.discarded_short += 1;
                }
            }
        }
    }

    if outcome.isolated_cells > 0 {
        warn!(
            "consumed {} isolated boundary cells; upstream marking may be noisy",
            outcome.isolated_cells
        );
    }
    info!(
        "traced {} polygons ({} short loops discarded)",
        outcome.polygons.len(),
        outcome.discarded_short
    );

    Ok(outcome)
}

/// First unvisited boundary cell in raster scan order.
fn find_start(marked: &RasterMap) -> Option<(i32, i32)> {
    for y in 0..marked.height() as i32 {
        for x in 0..marked.width() as i32 {
            if marked.get(x, y) == Cell::Boundary {
                return Some((x, y));
            }
        }
    }
    None
}

/// Walk one loop starting at `(sx, sy)`.
///
/// Returns `None` for an isolated start cell (consumed, no polygon). The
/// start cell keeps its boundary mark until the walker steps back onto it,
/// which closes the loop.
fn walk_loop(
    marked: &mut RasterMap,
    grid: &PlaneGrid,
    sx: i32,
    sy: i32,
    snapshot_dir: &Path,
) -> Result<Option<Polygon>, PolyError> {
    let Some((nx, ny)) = next_boundary(marked, sx, sy) else {
        marked.set(sx, sy, Cell::Traced);
        return Ok(None);
    };

    let mut pg = Polygon::new(DENOMINATOR, grid.window());
    let push = |pg: &mut Polygon, x: i32, y: i32| {
        pg.push(
            grid.pixel_to_grid(x, DENOMINATOR),
            grid.pixel_to_grid(y, DENOMINATOR),
        );
    };

    marked.set(nx, ny, Cell::Traced);
    push(&mut pg, sx, sy);
    push(&mut pg, nx, ny);

    let (mut cx, mut cy) = (nx, ny);
    loop {
        if (cx, cy) == (sx, sy) {
            return Ok(Some(pg));
        }

        let Some((nx, ny)) = next_boundary(marked, cx, cy) else {
            // no unvisited neighbor and not back at the start: the
            // exactly-two-neighbors invariant is broken upstream
            let snapshot = snapshot_dir.join("_ERROR_not_closing.png");
            render::draw_crosshair(marked, cx, cy, Cell::Alert);
            bitmap::save_snapshot(marked, &snapshot)?;
            return Err(PolyError::OpenLoop {
                x: cx,
                y: cy,
                snapshot,
            });
        };

        marked.set(nx, ny, Cell::Traced);
        push(&mut pg, nx, ny);
        (cx, cy) = (nx, ny);
    }
}

fn next_boundary(marked: &RasterMap, x: i32, y: i32) -> Option<(i32, i32)> {
    STEPS
        .iter()
        .map(|(dx, dy)| (x + dx, y + dy))
        .find(|&(px, py)| marked.get(px, py) == Cell::Boundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> PlaneGrid {
        PlaneGrid::new(-2, 2, 64)
    }

    /// Boundary ring on the rectangle [x0,x1] x [y0,y1].
    fn ring(map: &mut RasterMap, x0: i32, y0: i32, x1: i32, y1: i32) {
        map.line_vh(x0, y0, x1, y0, Cell::Boundary);
        map.line_vh(x0, y1, x1, y1, Cell::Boundary);
        map.line_vh(x0, y0, x0, y1, Cell::Boundary);
        map.line_vh(x1, y0, x1, y1, Cell::Boundary);
    }

    #[test]
    fn square_ring_traces_to_one_closed_polygon() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = RasterMap::new(64, 64, Cell::Exterior);
        ring(&mut map, 20, 20, 40, 40);

        let outcome = trace_boundaries(&mut map, &grid(), 3, dir.path()).unwrap();
        assert_eq!(outcome.polygons.len(), 1);
        assert_eq!(outcome.isolated_cells, 0);

        let pg = &outcome.polygons[0];
        assert!(pg.is_closed());
        assert!(pg.is_diagonal_free());
        assert!(pg.is_colinear_free());
        // a rectangle compresses to its 4 corners plus the closing vertex
        assert_eq!(pg.len(), 5);

        // the boundary layer is fully consumed
        for y in 0..64 {
            for x in 0..64 {
                assert_ne!(map.get(x, y), Cell::Boundary);
            }
        }
    }

    #[test]
    fn two_rings_trace_to_two_polygons() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = RasterMap::new(64, 64, Cell::Exterior);
        ring(&mut map, 4, 4, 20, 20);
        ring(&mut map, 30, 30, 50, 50);

        let outcome = trace_boundaries(&mut map, &grid(), 3, dir.path()).unwrap();
        assert_eq!(outcome.polygons.len(), 2);
    }

    #[test]
    fn isolated_cell_is_counted_not_traced() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = RasterMap::new(64, 64, Cell::Exterior);
        map.set(10, 10, Cell::Boundary);
        ring(&mut map, 30, 30, 50, 50);

        let outcome = trace_boundaries(&mut map, &grid(), 3, dir.path()).unwrap();
        assert_eq!(outcome.polygons.len(), 1);
        assert_eq!(outcome.isolated_cells, 1);
    }

    #[test]
    fn short_loops_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = RasterMap::new(64, 64, Cell::Exterior);
        ring(&mut map, 20, 20, 40, 40);

        // a 4-corner rectangle yields 5 vertices; a threshold of 24 drops it
        let outcome = trace_boundaries(&mut map, &grid(), 24, dir.path()).unwrap();
        assert!(outcome.polygons.is_empty());
        assert_eq!(outcome.discarded_short, 1);
    }

    #[test]
    fn broken_loop_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = RasterMap::new(64, 64, Cell::Exterior);
        // an open L-shaped path: ends never rejoin
        map.line_vh(10, 10, 30, 10, Cell::Boundary);
        map.line_vh(30, 10, 30, 25, Cell::Boundary);

        let err = trace_boundaries(&mut map, &grid(), 3, dir.path()).unwrap_err();
        assert!(matches!(err, PolyError::OpenLoop { .. }));
        assert!(dir.path().join("_ERROR_not_closing.png").exists());
    }
}
