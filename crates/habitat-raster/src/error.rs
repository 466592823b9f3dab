//! Error types for the raster crate.

use crate::Crs;
use thiserror::Error;

/// Errors that can occur when reading, clipping or merging rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing required tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// NetCDF (or OPeNDAP) access error.
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// Invalid bounds derived from raster geometry.
    #[error("Grid error: {0}")]
    Grid(#[from] habitat_grid::GridError),

    /// Variable not present in a NetCDF dataset.
    #[error("Variable '{0}' not found")]
    MissingVariable(String),

    /// Coordinate axis is missing, too short or not monotonic.
    #[error("Invalid coordinate axis '{axis}': {reason}")]
    InvalidAxis {
        /// Axis name.
        axis: String,
        /// Reason for rejection.
        reason: String,
    },

    /// Variable dimensions are not `(lat, lon)` or `(time, lat, lon)`, apart
    /// from extra length-1 dimensions.
    #[error("Unsupported layout for variable '{variable}': dimensions {dims:?}")]
    UnsupportedLayout {
        /// Variable name.
        variable: String,
        /// Dimension names in storage order.
        dims: Vec<String>,
    },

    /// Sample buffer does not match the declared dimensions.
    #[error("Raster shape mismatch: {width}x{height}x{layers} needs {expected} samples, got {actual}")]
    ShapeMismatch {
        /// Width in pixels.
        width: usize,
        /// Height in pixels.
        height: usize,
        /// Number of layers.
        layers: usize,
        /// Samples required.
        expected: usize,
        /// Samples provided.
        actual: usize,
    },

    /// Layers of a stack do not share one geometry.
    #[error("Stack layers differ in geometry")]
    GeometryMismatch,

    /// Rasters carry different CRS tags.
    #[error("CRS mismatch: expected {expected:?}, found {found:?}")]
    CrsMismatch {
        /// CRS of the first raster.
        expected: Option<Crs>,
        /// CRS of the offending raster.
        found: Option<Crs>,
    },

    /// CRS not supported for reprojection.
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    /// Clip box does not intersect the raster.
    #[error("Clip box ({min_lon}, {min_lat}, {max_lon}, {max_lat}) does not overlap the raster")]
    NoOverlap {
        /// Clip box west edge.
        min_lon: f64,
        /// Clip box south edge.
        min_lat: f64,
        /// Clip box east edge.
        max_lon: f64,
        /// Clip box north edge.
        max_lat: f64,
    },

    /// Merge called with no rasters.
    #[error("Nothing to merge")]
    EmptyMerge,
}
