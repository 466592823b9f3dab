//! Error types for the runner.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the `habitat-prep` commands.
#[derive(Debug, Error)]
pub enum PrepError {
    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for [`crate::PrepConfig`].
    #[error("Invalid config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Config is well-formed but unusable.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// I/O error writing outputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output could not be produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tiling or templating failed.
    #[error(transparent)]
    Grid(#[from] habitat_grid::GridError),

    /// Raster processing failed.
    #[error(transparent)]
    Raster(#[from] habitat_raster::RasterError),

    /// Acquisition failed.
    #[error(transparent)]
    Fetch(#[from] habitat_fetch::FetchError),
}
