use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while constructing, certifying, or querying
/// polygon bounds.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PolyError {
    #[error("failed to load image: {0}")]
    ImageLoad(String),

    #[error("failed to save image: {0}")]
    ImageSave(String),

    #[error("pixel ({x},{y}) has a color outside the white/black/gray palette")]
    InvalidPixel { x: u32, y: u32 },

    #[error("classification image must be square, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },

    #[error("classification image must carry a uniform {0}-pixel exterior border")]
    MissingBorder(i32),

    #[error("polygon file {path}: {message}")]
    PolygonFormat { path: PathBuf, message: String },

    #[error("boundary walk dead-ended at ({x},{y}) before closing; snapshot at {snapshot}")]
    OpenLoop { x: i32, y: i32, snapshot: PathBuf },

    #[error("diagonal edge from ({x0},{y0}) to ({x1},{y1}) in an axis-aligned polygon")]
    DiagonalEdge { x0: i64, y0: i64, x1: i64, y1: i64 },

    #[error("no polygons loaded")]
    NoPolygons,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
