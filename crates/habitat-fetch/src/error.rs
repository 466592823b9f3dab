//! Error types for the fetch crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while acquiring soil, climate or elevation data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request error.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Failed to fetch {url}: HTTP {status}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// Response status.
        status: reqwest::StatusCode,
    },

    /// Response was not what the request asked for, e.g. a login page in
    /// place of an archive.
    #[error("Unexpected response from {url}: {reason}")]
    UnexpectedContent {
        /// Requested URL.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A URL or redirect target could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON from a search endpoint.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raster decoding, clipping or merging failed.
    #[error(transparent)]
    Raster(#[from] habitat_raster::RasterError),

    /// Tiling or URL templating failed.
    #[error(transparent)]
    Grid(#[from] habitat_grid::GridError),

    /// Shapefile could not be read.
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// GeoJSON could not be parsed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Boundary file has an extension we cannot read.
    #[error("Unsupported boundary format: {0}")]
    UnsupportedBoundary(PathBuf),

    /// Boundary file holds no coordinates.
    #[error("Boundary file {0} contains no shapes")]
    EmptyBoundary(PathBuf),

    /// No Earthdata credentials in the environment.
    #[error("Earthdata credentials not found: set EARTHDATA_TOKEN or EARTHDATA_USERNAME and EARTHDATA_PASSWORD")]
    MissingCredentials,

    /// A tile key maps to no URLs.
    #[error("No URLs for tile {0}")]
    EmptyUrlList(String),

    /// Invalid glob pattern for local archives.
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
