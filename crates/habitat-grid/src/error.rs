//! Error types for the grid crate.

use thiserror::Error;

/// Errors that can occur when building tiles or dataset URLs.
#[derive(Debug, Error)]
pub enum GridError {
    /// Bounding box extents are not finite or are inverted.
    #[error("Invalid bounding box (lon {min_lon} to {max_lon}, lat {min_lat} to {max_lat})")]
    InvalidBounds {
        /// Minimum longitude (west edge).
        min_lon: f64,
        /// Minimum latitude (south edge).
        min_lat: f64,
        /// Maximum longitude (east edge).
        max_lon: f64,
        /// Maximum latitude (north edge).
        max_lat: f64,
    },

    /// A dataset descriptor field cannot be placed in a URL path.
    #[error("Invalid {field} in dataset descriptor: {value:?}")]
    InvalidDescriptor {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// Tile key does not follow the `lon{lon}lat{lat}` form.
    #[error("Invalid tile key: {0}")]
    InvalidTileKey(String),

    /// The assembled string is not a valid URL.
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        /// The assembled URL string.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
}
