//! # habitat-prep
//!
//! Runner for habitat data preparation: loads a YAML [`PrepConfig`] and
//! drives the soil, climate and elevation pipelines from `habitat-fetch`,
//! writing results under the configured data directory.

mod commands;
mod config;
mod error;

pub use commands::{run_climate, run_soil, run_srtm, run_tiles, soil_output_path};
pub use config::PrepConfig;
pub use error::PrepError;

use habitat_grid::BoundingBox;

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, PrepError>;

/// Parse a `west,south,east,north` box as given on the command line.
pub fn parse_bbox(s: &str) -> std::result::Result<BoundingBox, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{}': {}", s, e))?;
    let bounds: [f64; 4] = values
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected 4 values, got {}", v.len()))?;
    BoundingBox::from_total_bounds(bounds).map_err(|e| e.to_string())
}
