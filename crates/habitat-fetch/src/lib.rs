//! # habitat-fetch
//!
//! Acquisition pipelines for habitat data preparation.
//!
//! This crate provides:
//! - [`HttpFetcher`]: a blocking HTTP client with one timeout, download
//!   statistics and optional credentials.
//! - [`RasterSource`] and [`ClimateSource`]: the seams the pipelines fetch
//!   through, with HTTP GeoTIFF and NetCDF/OPeNDAP implementations.
//! - Soil: [`fetch_tiles`], [`merge_soil`] and [`soil_for_region`] turn a
//!   region into one merged POLARIS raster.
//! - Climate: [`fetch_climate`] clips MACAv2 windows for every site, model,
//!   year and pathway.
//! - Elevation: [`acquire_srtm`] finds or downloads SRTM archives through
//!   NASA CMR.
//! - [`load_boundary`]: bounding box of a shapefile or GeoJSON boundary.
//!
//! ## Example
//!
//! ```no_run
//! use habitat_fetch::{soil_for_region, HttpRasterSource};
//! use habitat_grid::{BoundingBox, SoilDescriptor};
//! use std::time::Duration;
//!
//! let source = HttpRasterSource::new(Duration::from_secs(120))?;
//! let region = BoundingBox::new(-105.3, 39.5, -104.1, 40.2)?;
//! let sand = soil_for_region(&source, &region, &SoilDescriptor::default())?;
//! println!("{:?}", sand.dimensions());
//! # Ok::<(), habitat_fetch::FetchError>(())
//! ```

mod boundary;
mod client;
mod climate;
mod elevation;
mod error;
mod soil;
mod source;

pub use boundary::load_boundary;
pub use client::{
    Credentials, DownloadCallback, DownloadStats, HttpFetcher, DEFAULT_AUTH_DOMAINS, DEFAULT_TIMEOUT,
};
pub use climate::{fetch_climate, ClimateRequest, ClimateRow, Site};
pub use elevation::{
    acquire_srtm, earthdata_credentials, local_archives, CmrClient, Collection, Granule,
    GranuleLink, CMR_SEARCH_URL, PROJECT_BOUNDARY_PATH, SRTM_ARCHIVE_PATTERN, SRTM_KEYWORD,
    SRTM_SHORT_NAME,
};
pub use error::FetchError;
pub use soil::{fetch_tiles, merge_soil, soil_for_region};
pub use source::{ClimateSource, HttpRasterSource, NetcdfClimateSource, RasterSource};

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
