//! rast2poly: classified raster → conservative rectilinear polygon bounds.
//!
//! Takes a trustworthily computed three-class raster (interior / exterior /
//! undetermined), builds axis-aligned closed polygons that conservatively
//! bound the interior and exterior regions, and answers three-valued
//! membership queries for arbitrary plane points against the persisted
//! polygon set.
//!
//! # Example
//!
//! ```no_run
//! use rast2poly::{build_region, BuildConfig, RegionKind};
//! use std::path::Path;
//!
//! let raster = rast2poly::bitmap::load_classified(Path::new("_in.png"))?;
//! let config = BuildConfig::default();
//! let outcome = build_region(&raster, RegionKind::Interior, &config)?;
//! // outcome.polygons are persisted as intpoly0000, intpoly0001, ...
//! # Ok::<(), rast2poly::PolyError>(())
//! ```

#![forbid(unsafe_code)]

mod config;
mod grid;
mod polygon;
mod raster;
mod seed;
mod trace;

pub mod bitmap;
pub mod error;
pub mod oracle;
pub mod quality;
pub mod render;
pub mod store;

pub use config::BuildConfig;
pub use error::PolyError;
pub use grid::{PlaneGrid, BORDER_WIDTH, DENOMINATOR};
pub use oracle::{Membership, MembershipOracle, PointVerdict};
pub use polygon::Polygon;
pub use raster::{Cell, RasterMap};
pub use seed::kernel_seed_fill;
pub use trace::{trace_boundaries, TraceOutcome};

use log::info;

/// Which classification a construction pass is bounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Interior,
    Exterior,
}

impl RegionKind {
    /// The raster class this pass builds a boundary for.
    pub fn target(self) -> Cell {
        match self {
            RegionKind::Interior => Cell::Interior,
            RegionKind::Exterior => Cell::Exterior,
        }
    }

    /// Marker color this kind's polygons are drawn with.
    pub fn marker(self) -> Cell {
        match self {
            RegionKind::Interior => Cell::Traced,
            RegionKind::Exterior => Cell::Boundary,
        }
    }

    /// Persisted file prefix (`intpoly…` / `extpoly…`).
    pub fn prefix(self) -> &'static str {
        match self {
            RegionKind::Interior => "int",
            RegionKind::Exterior => "ext",
        }
    }
}

/// Full construction pipeline for one region kind: seed fill, boundary
/// tracing, persistence.
///
/// Marks safe kernels of the target class, connects them, traces the
/// resulting boundary layer into closed polygons and persists the survivors
/// under sequential names in `config.out_dir`.
pub fn build_region(
    raster: &RasterMap,
    kind: RegionKind,
    config: &BuildConfig,
) -> Result<TraceOutcome, PolyError> {
    let grid = PlaneGrid::new(config.range_low, config.range_high, raster.width() as i32);

    let mut marked = kernel_seed_fill(raster, kind, config.granularity);
    let outcome = trace_boundaries(
        &mut marked,
        &grid,
        config.min_vertices,
        &config.out_dir,
    )?;

    store::save_all(&config.out_dir, kind, &outcome.polygons)?;
    info!(
        "{:?} construction: {} polygons persisted, {} short loops discarded",
        kind,
        outcome.polygons.len(),
        outcome.discarded_short
    );

    Ok(outcome)
}

/// Load the persisted polygon set of `config.out_dir` into an oracle.
pub fn load_oracle(config: &BuildConfig) -> Result<MembershipOracle, PolyError> {
    let grid_window = kurbo::Rect::new(
        f64::from(config.range_low),
        f64::from(config.range_low),
        f64::from(config.range_high),
        f64::from(config.range_high),
    );
    let (interior, exterior) = store::load_all(&config.out_dir, grid_window)?;
    if interior.is_empty() && exterior.is_empty() {
        return Err(PolyError::NoPolygons);
    }
    Ok(MembershipOracle::new(interior, exterior))
}
