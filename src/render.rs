//! Drawing polygons and diagnostic markers back into a raster.
//!
//! Quality control and error reporting both need to see polygons as pixels:
//! edges are drawn with the region's marker color, and failures get a
//! crosshair so the offending coordinate is findable in a snapshot.

use crate::grid::PlaneGrid;
use crate::polygon::Polygon;
use crate::raster::{Cell, RasterMap};
use crate::RegionKind;

/// Draw one polygon's edges into `map` with `color`.
///
/// Vertices convert from the rational grid back to pixels through the
/// polygon's own denominator; edges are axis-aligned by construction, so
/// `line_vh` draws every one of them.
pub fn draw_polygon(map: &mut RasterMap, grid: &PlaneGrid, pg: &Polygon, color: Cell) {
    let mut last: Option<(i32, i32)> = None;
    for &(x, y) in &pg.vertices {
        let px = grid.plane_to_pixel(x as f64 / pg.denominator as f64);
        let py = grid.plane_to_pixel(y as f64 / pg.denominator as f64);
        if let Some((lx, ly)) = last {
            map.line_vh(lx, ly, px, py, color);
        }
        last = Some((px, py));
    }
}

/// Draw both collections with their region markers (interior yellow,
/// exterior blue).
pub fn draw_all(
    map: &mut RasterMap,
    grid: &PlaneGrid,
    interior: &[Polygon],
    exterior: &[Polygon],
) {
    for pg in interior {
        draw_polygon(map, grid, pg, RegionKind::Interior.marker());
    }
    for pg in exterior {
        draw_polygon(map, grid, pg, RegionKind::Exterior.marker());
    }
}

/// Mark `(x, y)` with a crosshair of four full-length lines offset by ±10
/// pixels, so the spot stays visible at any zoom.
pub fn draw_crosshair(map: &mut RasterMap, x: i32, y: i32, color: Cell) {
    let w = map.width() as i32;
    let h = map.height() as i32;
    map.line_vh(0, y - 10, w - 1, y - 10, color);
    map.line_vh(0, y + 10, w - 1, y + 10, color);
    map.line_vh(x - 10, 0, x - 10, h - 1, color);
    map.line_vh(x + 10, 0, x + 10, h - 1, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DENOMINATOR;

    #[test]
    fn drawn_square_lands_on_its_pixels() {
        let grid = PlaneGrid::new(-2, 2, 64);
        let mut pg = Polygon::new(DENOMINATOR, grid.window());
        for &(px, py) in &[(10, 10), (20, 10), (20, 20), (10, 20), (10, 10)] {
            pg.push(
                grid.pixel_to_grid(px, DENOMINATOR),
                grid.pixel_to_grid(py, DENOMINATOR),
            );
        }

        let mut map = RasterMap::new(64, 64, Cell::Exterior);
        draw_polygon(&mut map, &grid, &pg, Cell::Traced);

        for x in 10..=20 {
            assert_eq!(map.get(x, 10), Cell::Traced);
            assert_eq!(map.get(x, 20), Cell::Traced);
        }
        for y in 10..=20 {
            assert_eq!(map.get(10, y), Cell::Traced);
            assert_eq!(map.get(20, y), Cell::Traced);
        }
        assert_eq!(map.get(15, 15), Cell::Exterior);
    }

    #[test]
    fn crosshair_clamps_near_edges() {
        let mut map = RasterMap::new(32, 32, Cell::Exterior);
        draw_crosshair(&mut map, 2, 2, Cell::Alert);
        // the -10 offsets clamp onto the frame instead of panicking
        assert_eq!(map.get(0, 12), Cell::Alert);
        assert_eq!(map.get(12, 0), Cell::Alert);
    }
}
