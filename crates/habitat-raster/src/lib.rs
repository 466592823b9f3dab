//! # habitat-raster
//!
//! In-memory raster model for habitat data preparation.
//!
//! This crate provides:
//! - [`Raster`]: a single-band grid of `f32` samples with geographic bounds
//!   and an optional CRS tag. Missing samples are NaN.
//! - [`RasterStack`]: layers (e.g. months) sharing one geometry.
//! - GeoTIFF decoding and writing ([`decode_geotiff`], [`write_geotiff`]).
//! - NetCDF climate cubes ([`ClimateCube`]) opened from a local path or an
//!   OPeNDAP URL, with longitudes normalized into `[-180, 180)`.
//! - Clipping to a bounding box and merging several rasters into one
//!   ([`merge_rasters`]).
//! - Bounding-box reprojection between supported CRSs ([`Crs`]).
//!
//! ## Example
//!
//! ```
//! use habitat_grid::BoundingBox;
//! use habitat_raster::{merge_rasters, Raster};
//!
//! let west = Raster::filled(2, 2, BoundingBox::new(-106.0, 39.0, -105.0, 40.0)?, 1.0)?;
//! let east = Raster::filled(2, 2, BoundingBox::new(-105.0, 39.0, -104.0, 40.0)?, 2.0)?;
//!
//! let merged = merge_rasters(&[west, east])?;
//! assert_eq!(merged.dimensions(), (4, 2));
//! assert_eq!(merged.bounds().total_bounds(), [-106.0, 39.0, -104.0, 40.0]);
//! # Ok::<(), habitat_raster::RasterError>(())
//! ```

mod crs;
mod error;
mod geotiff;
mod merge;
mod netcdf_cube;
mod raster;

pub use crs::Crs;
pub use error::RasterError;
pub use geotiff::{decode_geotiff, read_geotiff, write_geotiff};
pub use merge::merge_rasters;
pub use netcdf_cube::ClimateCube;
pub use raster::{Raster, RasterStack};

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
