use std::path::PathBuf;

/// All construction and certification parameters in one struct.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Low bound of the symmetric plane range mapped onto the raster.
    pub range_low: i32,
    /// High bound of the plane range.
    pub range_high: i32,
    /// Kernel tile edge length for the seed fill. Values below 3 are
    /// silently clamped to 3; larger values demand bigger homogeneous
    /// blocks before a region is trusted.
    pub granularity: i32,
    /// Closed loops with this many vertices or fewer are discarded
    /// rather than persisted.
    pub min_vertices: usize,
    /// Directory polygon files and snapshots are written to and read from.
    pub out_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            range_low: -2,
            range_high: 2,
            granularity: 5,
            min_vertices: 24,
            out_dir: PathBuf::from("."),
        }
    }
}
