//! Independent re-verification of everything the construction promises.
//!
//! Quality control consumes a persisted polygon set plus the classified
//! input raster and re-checks, without trusting the builder:
//!
//! 1. **Structural** — every polygon is closed, collinear-free and
//!    diagonal-free.
//! 2. **Raster consistency** — drawn into a scratch raster, every polygon
//!    lies strictly inside its own region with a full cell of spacing, and
//!    no two polygons' pixels coincide or touch.
//! 3. **Oracle consistency** — an exhaustive pixel scan: no non-white pixel
//!    may be judged EXTERIOR by the exterior polygons alone, no non-black
//!    pixel INTERIOR by the interior polygons alone.
//!
//! A failure is a located, reported outcome ("this set is not certified"),
//! not a crash; only I/O trouble is an error. On success the certified set
//! is rendered over the input and a small oracle-sampled preview is written
//! next to it.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::bitmap;
use crate::error::PolyError;
use crate::grid::PlaneGrid;
use crate::oracle::{classify_point, Membership, MembershipOracle};
use crate::polygon::Polygon;
use crate::raster::{Cell, RasterMap};
use crate::render;
use crate::store;
use crate::RegionKind;

/// Edge length of the oracle-sampled preview image.
const PREVIEW_LEN: i32 = 512;

/// Which stage located a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QcStage {
    Structural,
    RasterConsistency,
    OracleConsistency,
}

/// A located certification failure.
#[derive(Debug)]
pub struct QcFailure {
    pub stage: QcStage,
    pub detail: String,
    /// Marked snapshot locating the offending pixel, when one was written.
    pub snapshot: Option<PathBuf>,
}

/// Result of a full certification run.
#[derive(Debug)]
pub struct QcReport {
    pub interior_count: usize,
    pub exterior_count: usize,
    pub failure: Option<QcFailure>,
}

impl QcReport {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Certify the polygon set persisted in `dir` against the classified raster.
pub fn certify(raster: &RasterMap, grid: &PlaneGrid, dir: &Path) -> Result<QcReport, PolyError> {
    let (interior, exterior) = store::load_all(dir, grid.window())?;
    let mut report = QcReport {
        interior_count: interior.len(),
        exterior_count: exterior.len(),
        failure: None,
    };

    info!("QC structure check: closed / collinear- and diagonal-free");
    if let Some(failure) = check_structural(&interior, &exterior) {
        warn!("QC FAILED: {}", failure.detail);
        report.failure = Some(failure);
        return Ok(report);
    }

    info!("QC image check: positioning / spacing / cross- and touch-free");
    if let Some(failure) = check_raster_consistency(raster, grid, &interior, &exterior, dir)? {
        warn!("QC FAILED: {}", failure.detail);
        report.failure = Some(failure);
        return Ok(report);
    }

    info!("QC oracle check: where do pixels lie with respect to the polygons");
    if let Some(failure) = check_oracle_consistency(raster, grid, &interior, &exterior, dir)? {
        warn!("QC FAILED: {}", failure.detail);
        report.failure = Some(failure);
        return Ok(report);
    }

    info!(
        "QC PASSED: all {} interior and {} exterior polygons certified",
        report.interior_count, report.exterior_count
    );

    // success artifacts: the certified set drawn over the input, and an
    // oracle-sampled preview over an off-grid window
    let mut drawn = raster.clone();
    render::draw_all(&mut drawn, grid, &interior, &exterior);
    bitmap::save_snapshot(&drawn, &dir.join("_FINAL_all_polygons.png"))?;

    let preview = render_preview(grid, MembershipOracle::new(interior, exterior))?;
    bitmap::save_snapshot(&preview, &dir.join("_QC_passed_small_result.png"))?;

    Ok(report)
}

// ── Stage 1: structure ───────────────────────────────────

fn check_structural(interior: &[Polygon], exterior: &[Polygon]) -> Option<QcFailure> {
    let labeled = interior
        .iter()
        .enumerate()
        .map(|(i, pg)| (RegionKind::Interior, i, pg))
        .chain(
            exterior
                .iter()
                .enumerate()
                .map(|(i, pg)| (RegionKind::Exterior, i, pg)),
        );

    for (kind, index, pg) in labeled {
        let name = store::file_name(kind, index);
        let fail = |what: &str| {
            Some(QcFailure {
                stage: QcStage::Structural,
                detail: format!("{name}: {what}"),
                snapshot: None,
            })
        };
        if !pg.is_closed() {
            return fail("not closed");
        }
        if !pg.is_colinear_free() {
            return fail("not free of collinear segments");
        }
        if !pg.is_diagonal_free() {
            return fail("not free of diagonal segments");
        }
    }
    None
}

// ── Stage 2: raster consistency ──────────────────────────

/// Pixel endpoints of a polygon's edges, in draw order.
fn edge_pixels(grid: &PlaneGrid, pg: &Polygon) -> Vec<(i32, i32)> {
    pg.vertices
        .iter()
        .map(|&(x, y)| {
            (
                grid.plane_to_pixel(x as f64 / pg.denominator as f64),
                grid.plane_to_pixel(y as f64 / pg.denominator as f64),
            )
        })
        .collect()
}

fn check_raster_consistency(
    raster: &RasterMap,
    grid: &PlaneGrid,
    interior: &[Polygon],
    exterior: &[Polygon],
    dir: &Path,
) -> Result<Option<QcFailure>, PolyError> {
    // all drawing happens on a scratch copy; the classification itself is
    // never touched
    let mut scratch = raster.clone();

    for (kind, polygons) in [
        (RegionKind::Interior, interior),
        (RegionKind::Exterior, exterior),
    ] {
        for pg in polygons {
            if let Some(failure) = place_and_draw(&mut scratch, grid, pg, kind, dir)? {
                return Ok(Some(failure));
            }
        }
    }

    // every polygon is in place; re-walk each one checking its neighbor
    // counts prove spacing from everything else
    for (kind, polygons) in [
        (RegionKind::Interior, interior),
        (RegionKind::Exterior, exterior),
    ] {
        for pg in polygons {
            if let Some(failure) = check_spacing(&mut scratch, grid, pg, kind, dir)? {
                return Ok(Some(failure));
            }
        }
    }

    Ok(None)
}

/// First pass of stage 2 for one polygon: every edge pixel's full 3×3
/// neighborhood must still be the polygon's own region class (a previously
/// drawn polygon's marker in the neighborhood is a violation too). Then the
/// polygon is drawn with its marker.
fn place_and_draw(
    scratch: &mut RasterMap,
    grid: &PlaneGrid,
    pg: &Polygon,
    kind: RegionKind,
    dir: &Path,
) -> Result<Option<QcFailure>, PolyError> {
    let target = kind.target();
    let pixels = edge_pixels(grid, pg);

    for pair in pixels.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];

        if x0 != x1 && y0 != y1 {
            let failure = located_failure(
                scratch,
                QcStage::RasterConsistency,
                format!("diagonal edge between pixels ({x0},{y0}) and ({x1},{y1})"),
                x0,
                y0,
                dir.join("_ERROR_diagonal.png"),
            )?;
            return Ok(Some(failure));
        }

        for (px, py) in line_pixels(x0, y0, x1, y1) {
            let clean = (-1..=1).all(|dy| {
                (-1..=1).all(|dx| scratch.get(px + dx, py + dy) == target)
            });
            if !clean {
                let failure = located_failure(
                    scratch,
                    QcStage::RasterConsistency,
                    format!("polygon lies in the wrong region around pixel ({px},{py})"),
                    px,
                    py,
                    dir.join("_ERROR_wrong_region.png"),
                )?;
                return Ok(Some(failure));
            }
        }
    }

    render::draw_polygon(scratch, grid, pg, kind.marker());
    Ok(None)
}

/// Second pass of stage 2 for one polygon: with everything drawn, each
/// vertex must see exactly two of its own marker and six region-class cells
/// among its 8 neighbors, and each inner edge pixel must be marker-on-pixel
/// with the two side neighbors region-class. Anything else means polygons
/// touch, cross, or crowd each other.
fn check_spacing(
    scratch: &mut RasterMap,
    grid: &PlaneGrid,
    pg: &Polygon,
    kind: RegionKind,
    dir: &Path,
) -> Result<Option<QcFailure>, PolyError> {
    let target = kind.target();
    let marker = kind.marker();
    let pixels = edge_pixels(grid, pg);

    for pair in pixels.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];

        for &(vx, vy) in &[(x0, y0), (x1, y1)] {
            let (n_target, n_marker) = count_neighbors(scratch, vx, vy, target, marker);
            if n_marker != 2 || n_target != 6 {
                let failure = located_failure(
                    scratch,
                    QcStage::RasterConsistency,
                    format!(
                        "vertex pixel ({vx},{vy}) has wrong neighbors: {n_marker} marker, {n_target} region"
                    ),
                    vx,
                    vy,
                    dir.join("_ERROR_vertex.png"),
                )?;
                return Ok(Some(failure));
            }
        }

        let inner: Vec<(i32, i32)> = line_pixels(x0, y0, x1, y1)
            .into_iter()
            .filter(|&(px, py)| (px, py) != (x0, y0) && (px, py) != (x1, y1))
            .collect();
        for (px, py) in inner {
            let sides_clean = if x0 == x1 {
                scratch.get(px - 1, py) == target
                    && scratch.get(px, py) == marker
                    && scratch.get(px + 1, py) == target
            } else {
                scratch.get(px, py - 1) == target
                    && scratch.get(px, py) == marker
                    && scratch.get(px, py + 1) == target
            };
            if !sides_clean {
                let failure = located_failure(
                    scratch,
                    QcStage::RasterConsistency,
                    format!("edge pixel ({px},{py}) is crowded or overdrawn"),
                    px,
                    py,
                    dir.join("_ERROR_edge.png"),
                )?;
                return Ok(Some(failure));
            }
        }
    }

    Ok(None)
}

fn count_neighbors(
    map: &RasterMap,
    x: i32,
    y: i32,
    target: Cell,
    marker: Cell,
) -> (usize, usize) {
    let mut n_target = 0;
    let mut n_marker = 0;
    for dy in -1..=1 {
        for dx in -1..=1 {
            if (dx, dy) == (0, 0) {
                continue;
            }
            let cell = map.get(x + dx, y + dy);
            if cell == target {
                n_target += 1;
            } else if cell == marker {
                n_marker += 1;
            }
        }
    }
    (n_target, n_marker)
}

/// All pixels of a horizontal or vertical segment, endpoints included.
fn line_pixels(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    if x0 == x1 {
        let (lo, hi) = (y0.min(y1), y0.max(y1));
        (lo..=hi).map(|y| (x0, y)).collect()
    } else {
        let (lo, hi) = (x0.min(x1), x0.max(x1));
        (lo..=hi).map(|x| (x, y0)).collect()
    }
}

// ── Stage 3: oracle consistency ──────────────────────────

fn check_oracle_consistency(
    raster: &RasterMap,
    grid: &PlaneGrid,
    interior: &[Polygon],
    exterior: &[Polygon],
    dir: &Path,
) -> Result<Option<QcFailure>, PolyError> {
    let w = raster.width() as i32;
    let h = raster.height() as i32;

    for y in 0..h {
        let py = grid.pixel_to_plane(y);
        for x in 0..w {
            let px = grid.pixel_to_plane(x);
            let cell = raster.get(x, y);

            // a pixel that is not certainly exterior must never be judged
            // EXTERIOR by the exterior polygons alone
            if cell != Cell::Exterior
                && classify_point(&[], exterior, px, py)? == Membership::Exterior
            {
                return Ok(Some(oracle_failure(
                    raster, grid, interior, exterior, x, y, "EXTERIOR", dir,
                )?));
            }

            // and a pixel that is not certainly interior must never be
            // judged INTERIOR by the interior polygons alone
            if cell != Cell::Interior
                && classify_point(interior, &[], px, py)? == Membership::Interior
            {
                return Ok(Some(oracle_failure(
                    raster, grid, interior, exterior, x, y, "INTERIOR", dir,
                )?));
            }
        }
    }

    Ok(None)
}

fn oracle_failure(
    raster: &RasterMap,
    grid: &PlaneGrid,
    interior: &[Polygon],
    exterior: &[Polygon],
    x: i32,
    y: i32,
    verdict: &str,
    dir: &Path,
) -> Result<QcFailure, PolyError> {
    let mut drawn = raster.clone();
    render::draw_all(&mut drawn, grid, interior, exterior);
    located_failure(
        &mut drawn,
        QcStage::OracleConsistency,
        format!("oracle answered {verdict} for mismatching pixel ({x},{y})"),
        x,
        y,
        dir.join("_ERROR_quality.png"),
    )
}

/// Crosshair the offending pixel, persist the snapshot, build the failure.
fn located_failure(
    map: &mut RasterMap,
    stage: QcStage,
    detail: String,
    x: i32,
    y: i32,
    snapshot: PathBuf,
) -> Result<QcFailure, PolyError> {
    render::draw_crosshair(map, x, y, Cell::Alert);
    bitmap::save_snapshot(map, &snapshot)?;
    Ok(QcFailure {
        stage,
        detail,
        snapshot: Some(snapshot),
    })
}

// ── Success preview ──────────────────────────────────────

/// Sample the oracle over an off-grid window into a small class raster.
///
/// The window is deliberately not a power-of-two fraction of the range and
/// the samples sit at 0.23 of a cell, so the sweep exercises coordinates
/// that share no structure with the construction grid. Runs prepared, one
/// scanline at a time.
fn render_preview(grid: &PlaneGrid, mut oracle: MembershipOracle) -> Result<RasterMap, PolyError> {
    let mut preview = RasterMap::new(PREVIEW_LEN as usize, PREVIEW_LEN as usize, Cell::Unknown);

    let mid = 0.5 * f64::from(grid.low() + grid.high());
    let half = 0.783 * f64::from(grid.high() - grid.low());
    let lo = mid - half;
    let scale = 2.0 * half / f64::from(PREVIEW_LEN);

    for y in 0..PREVIEW_LEN {
        let py = (f64::from(y) + 0.23) * scale + lo;
        oracle.prepare_row(py);
        for x in 0..PREVIEW_LEN {
            let px = (f64::from(x) + 0.23) * scale + lo;
            let cell = match oracle.classify(px, py)? {
                Membership::Exterior => Cell::Exterior,
                Membership::Interior => Cell::Interior,
                Membership::Unknown => Cell::Unknown,
            };
            preview.set(x, y, cell);
        }
    }
    oracle.unprepare_rows();

    Ok(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DENOMINATOR;

    fn pixel_square(grid: &PlaneGrid, x0: i32, y0: i32, x1: i32, y1: i32) -> Polygon {
        let mut pg = Polygon::new(DENOMINATOR, grid.window());
        for &(px, py) in &[(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)] {
            pg.push(
                grid.pixel_to_grid(px, DENOMINATOR),
                grid.pixel_to_grid(py, DENOMINATOR),
            );
        }
        pg
    }

    #[test]
    fn structural_stage_is_idempotent() {
        let grid = PlaneGrid::new(-2, 2, 64);
        let interior = vec![pixel_square(&grid, 20, 20, 40, 40)];
        let first = check_structural(&interior, &[]).is_none();
        let second = check_structural(&interior, &[]).is_none();
        assert!(first && second);
    }

    #[test]
    fn structural_stage_rejects_open_polygon() {
        let grid = PlaneGrid::new(-2, 2, 64);
        let mut open = pixel_square(&grid, 20, 20, 40, 40);
        open.vertices.pop();
        let failure = check_structural(&[open], &[]).unwrap();
        assert_eq!(failure.stage, QcStage::Structural);
    }

    #[test]
    fn touching_polygons_fail_raster_consistency() {
        let dir = tempfile::tempdir().unwrap();
        let grid = PlaneGrid::new(-2, 2, 64);
        let raster = RasterMap::new(64, 64, Cell::Interior);

        // two squares sharing the edge column 30: their drawn pixels collide
        let a = pixel_square(&grid, 20, 20, 30, 30);
        let b = pixel_square(&grid, 30, 20, 40, 30);
        let failure =
            check_raster_consistency(&raster, &grid, &[a, b], &[], dir.path()).unwrap();
        assert!(failure.is_some());
    }

    #[test]
    fn well_separated_polygons_pass_raster_consistency() {
        let dir = tempfile::tempdir().unwrap();
        let grid = PlaneGrid::new(-2, 2, 64);
        let raster = RasterMap::new(64, 64, Cell::Interior);

        let a = pixel_square(&grid, 10, 10, 25, 25);
        let b = pixel_square(&grid, 35, 35, 50, 50);
        let failure =
            check_raster_consistency(&raster, &grid, &[a, b], &[], dir.path()).unwrap();
        assert!(failure.is_none());
    }

    #[test]
    fn wrong_region_is_located() {
        let dir = tempfile::tempdir().unwrap();
        let grid = PlaneGrid::new(-2, 2, 64);
        // polygon over a raster that is exterior everywhere: an interior
        // polygon there lies in the wrong region
        let raster = RasterMap::new(64, 64, Cell::Exterior);
        let pg = pixel_square(&grid, 20, 20, 40, 40);
        let failure = check_raster_consistency(&raster, &grid, &[pg], &[], dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(failure.stage, QcStage::RasterConsistency);
        assert!(failure.snapshot.unwrap().exists());
    }
}
