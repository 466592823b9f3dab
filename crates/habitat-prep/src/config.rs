//! YAML run configuration.

use crate::{PrepError, Result};
use habitat_fetch::{load_boundary, ClimateRequest, PROJECT_BOUNDARY_PATH};
use habitat_grid::{BoundingBox, SoilDescriptor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Run configuration. Every field has a default, so an empty file is valid.
///
/// ```yaml
/// data_dir: data
/// bbox: [-105.3, 39.5, -104.1, 40.2]
/// http_timeout_secs: 120
/// soil:
///   variable: clay
///   statistic: mean
///   depth: 0_5
/// climate:
///   descriptor:
///     variable: tasmax
///   models: [BNU-ESM, CCSM4]
///   pathways: [rcp45, rcp85]
///   years: [2021, 2026]
///   sites:
///     - name: ranch
///       boundary: [-105.2, 39.6, -104.9, 39.9]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Root for `srtm/`, `soil/`, `climate/` and the project boundary.
    pub data_dir: PathBuf,
    /// Boundary file; defaults to the project shapefile under `data_dir`.
    pub boundary: Option<PathBuf>,
    /// Explicit region, used instead of the boundary file.
    pub bbox: Option<BoundingBox>,
    pub http_timeout_secs: u64,
    pub soil: SoilDescriptor,
    pub climate: ClimateRequest,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            boundary: None,
            bbox: None,
            http_timeout_secs: 120,
            soil: SoilDescriptor::default(),
            climate: ClimateRequest::default(),
        }
    }
}

impl PrepConfig {
    /// Load a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PrepError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Parse a config from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document deserializes as null, not as an empty map
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that deserialize but cannot be used. Run again after
    /// any override.
    pub fn validate(&self) -> Result<()> {
        if self.http_timeout_secs == 0 {
            return Err(PrepError::InvalidConfig(
                "http_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Boundary file in effect.
    pub fn boundary_path(&self) -> PathBuf {
        self.boundary
            .clone()
            .unwrap_or_else(|| self.data_dir.join(PROJECT_BOUNDARY_PATH))
    }

    /// Region to work on: `bbox` if set, otherwise the boundary file's extent.
    pub fn region(&self) -> Result<BoundingBox> {
        match self.bbox {
            Some(bbox) => Ok(bbox),
            None => Ok(load_boundary(self.boundary_path())?),
        }
    }
}
