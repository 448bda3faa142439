//! Point-in-polygon testing and the combined membership oracle.
//!
//! The single-polygon test is a simplified even-odd ray cast that exploits
//! the polygons being axis-aligned: a horizontal ray from the query point
//! only ever meets vertical edges transversally or horizontal edges
//! colinearly, and both cases resolve with integer comparisons. Crossings
//! that land exactly on a vertex count only when the boundary strictly
//! passes from one side of the ray to the other there (a strict monotonic
//! turn); grazing a local extremum does not toggle parity. That tie-break
//! is authoritative, replicated behavior; the tests at the bottom pin the
//! degenerate configurations it decides.
//!
//! The membership oracle lifts single-polygon verdicts to a conservative
//! three-valued answer through a 5×5 neighborhood consensus: a definite
//! INTERIOR/EXTERIOR is only issued when the query cell and two full layers
//! of neighbors agree, which absorbs the finite resolution of the grid.

use log::info;

use crate::error::PolyError;
use crate::grid::plane_to_grid;
use crate::polygon::Polygon;

/// Verdict of the single-polygon point test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointVerdict {
    Interior,
    Boundary,
    Exterior,
}

/// Conservative three-valued membership answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Interior,
    Exterior,
    Unknown,
}

impl std::fmt::Display for Membership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Membership::Interior => write!(f, "definite INTERIOR"),
            Membership::Exterior => write!(f, "definite EXTERIOR"),
            Membership::Unknown => write!(f, "unknown"),
        }
    }
}

/// Layers of neighbors on each side of the query cell in the consensus.
const NEIGHBOR_LAYERS: i64 = 2;

/// Classify a rational grid point against one polygon.
///
/// `(ax, ay)` are integers under the polygon's denominator. The scan honors
/// a prepared scanline index when one is set; preparation must never change
/// the verdict, only which edges get looked at.
pub fn point_in_polygon(pg: &Polygon, ax: i64, ay: i64) -> Result<PointVerdict, PolyError> {
    if pg.vertices.len() < 2 || !pg.bbox_contains(ax, ay) {
        return Ok(PointVerdict::Exterior);
    }

    let v = &pg.vertices;
    let n = v.len();
    let mut even = true;

    let mut i = 0usize;
    while i < n - 1 {
        i = pg.scan_jump(i);
        if i >= n {
            break;
        }
        let (bx, by) = v[i];
        let (px, py) = v[i - 1];

        if bx == px {
            // vertical edge
            let (lo, hi) = if by < py { (by, py) } else { (py, by) };

            if bx == ax && lo <= ay && ay <= hi {
                return Ok(PointVerdict::Boundary);
            }

            // does the rightward ray cross this edge?
            if ax < bx && lo <= ay && ay <= hi {
                if ay == by {
                    // ray meets the edge's far endpoint: count the crossing
                    // only if the boundary strictly passes the ray there
                    let y0 = py;
                    let y1 = by;
                    let y2 = if i < n - 1 { v[i + 1].1 } else { v[1].1 };
                    if (y0 < y1 && y1 < y2) || (y0 > y1 && y1 > y2) {
                        even = !even;
                    }
                } else if lo < ay && ay < hi {
                    even = !even;
                }
            }
        } else if by == py {
            // horizontal edge
            let (lo, hi) = if bx < px { (bx, px) } else { (px, bx) };

            if by == ay && lo <= ax && ax <= hi {
                return Ok(PointVerdict::Boundary);
            }

            // edge colinear with the ray and strictly to its right: parity
            // changes only if the boundary enters on one side of the run and
            // leaves on the other
            if ay == by && lo > ax {
                let y0 = if i > 1 { v[i - 2].1 } else { v[n - 2].1 };
                let y1 = by;
                let y2 = if i < n - 1 { v[i + 1].1 } else { v[1].1 };
                if (y0 < y1 && y1 < y2) || (y0 > y1 && y1 > y2) {
                    even = !even;
                }
            }
        } else {
            return Err(PolyError::DiagonalEdge {
                x0: px,
                y0: py,
                x1: bx,
                y1: by,
            });
        }
    }

    Ok(if even {
        PointVerdict::Exterior
    } else {
        PointVerdict::Interior
    })
}

/// Whether all 25 neighborhood cells around the plane point get `want` from
/// this polygon.
fn neighborhood_agrees(
    pg: &Polygon,
    x: f64,
    y: f64,
    want: PointVerdict,
) -> Result<bool, PolyError> {
    let px = plane_to_grid(x, pg.denominator);
    let py = plane_to_grid(y, pg.denominator);
    for dy in -NEIGHBOR_LAYERS..=NEIGHBOR_LAYERS {
        for dx in -NEIGHBOR_LAYERS..=NEIGHBOR_LAYERS {
            if point_in_polygon(pg, px + dx, py + dy)? != want {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Combine per-polygon verdicts into the conservative three-valued answer.
///
/// One interior polygon whose whole neighborhood is INTERIOR decides; for
/// EXTERIOR every exterior polygon must agree on the whole neighborhood,
/// and at least one must exist.
pub fn classify_point(
    interior: &[Polygon],
    exterior: &[Polygon],
    x: f64,
    y: f64,
) -> Result<Membership, PolyError> {
    for pg in interior {
        if neighborhood_agrees(pg, x, y, PointVerdict::Interior)? {
            return Ok(Membership::Interior);
        }
    }

    let mut verdict = Membership::Unknown;
    for pg in exterior.iter().filter(|pg| !pg.is_empty()) {
        if !neighborhood_agrees(pg, x, y, PointVerdict::Exterior)? {
            return Ok(Membership::Unknown);
        }
        verdict = Membership::Exterior;
    }
    Ok(verdict)
}

/// The two polygon collections of a run, answering membership queries.
#[derive(Debug, Default)]
pub struct MembershipOracle {
    pub interior: Vec<Polygon>,
    pub exterior: Vec<Polygon>,
}

impl MembershipOracle {
    pub fn new(interior: Vec<Polygon>, exterior: Vec<Polygon>) -> Self {
        info!(
            "oracle over {} interior and {} exterior polygons",
            interior.len(),
            exterior.len()
        );
        Self { interior, exterior }
    }

    /// Three-valued membership of a plane point.
    pub fn classify(&self, x: f64, y: f64) -> Result<Membership, PolyError> {
        classify_point(&self.interior, &self.exterior, x, y)
    }

    /// Prepare every polygon's scanline index for row `y` (plane
    /// coordinate). Worth it for scanline workloads; a query row off the
    /// prepared one would be wrong, so callers re-prepare per row.
    pub fn prepare_row(&mut self, y: f64) {
        for pg in self.interior.iter_mut().chain(self.exterior.iter_mut()) {
            let gy = plane_to_grid(y, pg.denominator);
            pg.prepare_y(gy);
        }
    }

    /// Drop all prepared scanline indexes.
    pub fn unprepare_rows(&mut self) {
        for pg in self.interior.iter_mut().chain(self.exterior.iter_mut()) {
            pg.unprepare_y();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DENOMINATOR;
    use kurbo::Rect;

    fn window() -> Rect {
        Rect::new(-2.0, -2.0, 2.0, 2.0)
    }

    fn polygon(vertices: &[(i64, i64)]) -> Polygon {
        let mut pg = Polygon::new(DENOMINATOR, window());
        for &(x, y) in vertices {
            pg.push(x, y);
        }
        assert!(pg.is_closed() && pg.is_colinear_free() && pg.is_diagonal_free());
        pg
    }

    fn square() -> Polygon {
        polygon(&[(0, 0), (100, 0), (100, 100), (0, 100), (0, 0)])
    }

    #[test]
    fn square_center_edge_and_outside() {
        let pg = square();
        assert_eq!(point_in_polygon(&pg, 50, 50).unwrap(), PointVerdict::Interior);
        assert_eq!(point_in_polygon(&pg, 50, 0).unwrap(), PointVerdict::Boundary);
        assert_eq!(point_in_polygon(&pg, 100, 50).unwrap(), PointVerdict::Boundary);
        assert_eq!(point_in_polygon(&pg, 300, 50).unwrap(), PointVerdict::Exterior);
        // inside the padded bbox but outside the polygon
        assert_eq!(point_in_polygon(&pg, 105, 50).unwrap(), PointVerdict::Exterior);
    }

    #[test]
    fn ray_through_vertex_with_monotonic_turn_counts_once() {
        // Step polygon: the ray from (2,2) passes the step corner at (4,2)
        // and the colinear run [4,8]x{2}; the boundary strictly descends
        // through the run (y 0 → 2 → 6), so parity toggles exactly once.
        let pg = polygon(&[(0, 0), (4, 0), (4, 2), (8, 2), (8, 6), (0, 6), (0, 0)]);
        assert_eq!(point_in_polygon(&pg, 2, 2).unwrap(), PointVerdict::Interior);
        // directly below the step, still interior of the lower lobe
        assert_eq!(point_in_polygon(&pg, 2, 1).unwrap(), PointVerdict::Interior);
        // right of the step bottom, inside the notch: exterior
        assert_eq!(point_in_polygon(&pg, 6, 1).unwrap(), PointVerdict::Exterior);
    }

    #[test]
    fn ray_grazing_a_u_turn_does_not_toggle() {
        // Slot cut into the top edge: its floor [4,6]x{4} is a U-turn. A ray
        // at y=4 from inside the left lobe grazes the slot floor and both
        // slot walls; none of those may toggle parity.
        let pg = polygon(&[
            (0, 0),
            (10, 0),
            (10, 10),
            (6, 10),
            (6, 4),
            (4, 4),
            (4, 10),
            (0, 10),
            (0, 0),
        ]);
        assert_eq!(point_in_polygon(&pg, 1, 4).unwrap(), PointVerdict::Interior);
        assert_eq!(point_in_polygon(&pg, 8, 4).unwrap(), PointVerdict::Interior);
        // inside the slot itself: exterior material
        assert_eq!(point_in_polygon(&pg, 5, 6).unwrap(), PointVerdict::Exterior);
        // on the slot floor: boundary
        assert_eq!(point_in_polygon(&pg, 5, 4).unwrap(), PointVerdict::Boundary);
    }

    #[test]
    fn prepared_scan_never_changes_the_verdict() {
        let mut pg = polygon(&[
            (0, 0),
            (10, 0),
            (10, 10),
            (6, 10),
            (6, 4),
            (4, 4),
            (4, 10),
            (0, 10),
            (0, 0),
        ]);
        for y in -1..=11 {
            let plain: Vec<_> = (-1..=11)
                .map(|x| point_in_polygon(&pg, x, y).unwrap())
                .collect();
            pg.prepare_y(y);
            let prepared: Vec<_> = (-1..=11)
                .map(|x| point_in_polygon(&pg, x, y).unwrap())
                .collect();
            pg.unprepare_y();
            assert_eq!(plain, prepared, "prepared scan diverged on row {y}");
        }
    }

    #[test]
    fn diagonal_edge_is_a_fatal_error() {
        let mut pg = Polygon::new(DENOMINATOR, window());
        for &(x, y) in &[(0, 0), (10, 10), (10, 0), (0, 0)] {
            pg.push(x, y);
        }
        assert!(matches!(
            point_in_polygon(&pg, 5, 3),
            Err(PolyError::DiagonalEdge { .. })
        ));
    }

    fn square_plane() -> Polygon {
        // unit-ish square in plane coordinates: [-0.5, 0.5]^2 on the grid
        let h = DENOMINATOR / 2;
        polygon(&[(-h, -h), (h, -h), (h, h), (-h, h), (-h, -h)])
    }

    #[test]
    fn oracle_consensus_three_values() {
        let oracle = MembershipOracle::new(vec![square_plane()], vec![square_plane()]);

        // deep inside the interior polygon
        assert_eq!(oracle.classify(0.0, 0.0).unwrap(), Membership::Interior);
        // near the shared edge nothing is definite
        assert_eq!(oracle.classify(0.5, 0.0).unwrap(), Membership::Unknown);
    }

    #[test]
    fn empty_exterior_collection_never_answers_exterior() {
        let oracle = MembershipOracle::new(vec![square_plane()], vec![]);
        assert_eq!(oracle.classify(1.5, 1.5).unwrap(), Membership::Unknown);
        assert_eq!(oracle.classify(0.0, 0.0).unwrap(), Membership::Interior);
    }

    #[test]
    fn empty_interior_collection_never_answers_interior() {
        let oracle = MembershipOracle::new(vec![], vec![square_plane()]);
        // outside the exterior polygon's bbox: every cell EXTERIOR
        assert_eq!(oracle.classify(1.5, 1.5).unwrap(), Membership::Exterior);
        assert_eq!(oracle.classify(0.0, 0.0).unwrap(), Membership::Unknown);
    }
}
