//! Dataset URL templates.
//!
//! Two template families are supported:
//!
//! - POLARIS soil properties (one GeoTIFF per one-degree tile):
//!   `{base}/{variable}/{statistic}/{depth}/lat{min_lat}{max_lat}_lon{min_lon}{max_lon}.tif`
//! - MACAv2 monthly climate projections (one NetCDF per five-year window, served
//!   over OPeNDAP):
//!   `{base}/{model}/{product}_{variable}_{model}_{realization}_{pathway}_{start}_{end}_{region}_monthly.nc`

use crate::{tile_url_map, BoundingBox, GridError, Result, TileCoord, TileUrls};
use serde::{Deserialize, Serialize};
use url::Url;

/// POLARIS soil properties server.
pub const POLARIS_BASE_URL: &str = "http://hydrology.cee.duke.edu/POLARIS/PROPERTIES/v1.0";

/// MACAv2 THREDDS OPeNDAP endpoint.
pub const MACA_BASE_URL: &str = "http://thredds.northwestknowledge.net:8080/thredds/dodsC/MACAV2";

/// Number of years added to a window's start year to get its (inclusive) end year.
pub const CLIMATE_WINDOW_YEARS: i32 = 4;

/// Parameters selecting one POLARIS soil layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilDescriptor {
    /// Server root the path is appended to.
    pub base_url: String,
    /// Soil property, e.g. `sand`, `clay`, `ph`.
    pub variable: String,
    /// Summary statistic, e.g. `mean`, `mode`, `p5`.
    pub statistic: String,
    /// Depth range in cm, e.g. `0_5`, `100_200`.
    pub depth: String,
}

impl Default for SoilDescriptor {
    fn default() -> Self {
        Self {
            base_url: POLARIS_BASE_URL.to_string(),
            variable: "sand".to_string(),
            statistic: "mean".to_string(),
            depth: "100_200".to_string(),
        }
    }
}

impl SoilDescriptor {
    /// Create a descriptor against the default POLARIS server.
    pub fn new(variable: &str, statistic: &str, depth: &str) -> Self {
        Self {
            variable: variable.to_string(),
            statistic: statistic.to_string(),
            depth: depth.to_string(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        check_segment("variable", &self.variable)?;
        check_segment("statistic", &self.statistic)?;
        check_segment("depth", &self.depth)
    }
}

/// Parameters selecting one MACAv2 monthly series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateDescriptor {
    /// Server root the path is appended to.
    pub base_url: String,
    /// Product prefix of the file name.
    pub product: String,
    /// Climate variable, e.g. `pr`, `tasmax`.
    pub variable: String,
    /// Global climate model (the scenario), e.g. `BNU-ESM`.
    pub model: String,
    /// Ensemble member.
    pub realization: String,
    /// Emission pathway (the climate), e.g. `rcp45`, `rcp85`, `historical`.
    pub pathway: String,
    /// Spatial domain of the file.
    pub region: String,
}

impl Default for ClimateDescriptor {
    fn default() -> Self {
        Self {
            base_url: MACA_BASE_URL.to_string(),
            product: "macav2metdata".to_string(),
            variable: "pr".to_string(),
            model: "BNU-ESM".to_string(),
            realization: "r1i1p1".to_string(),
            pathway: "rcp85".to_string(),
            region: "CONUS".to_string(),
        }
    }
}

impl ClimateDescriptor {
    /// Copy of this descriptor for another model and pathway.
    pub fn with_run(&self, model: &str, pathway: &str) -> Self {
        Self {
            model: model.to_string(),
            pathway: pathway.to_string(),
            ..self.clone()
        }
    }

    fn validate(&self) -> Result<()> {
        check_segment("product", &self.product)?;
        check_segment("variable", &self.variable)?;
        check_segment("model", &self.model)?;
        check_segment("realization", &self.realization)?;
        check_segment("pathway", &self.pathway)?;
        check_segment("region", &self.region)
    }
}

/// Inclusive year range covered by one climate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimateWindow {
    /// First year in the file.
    pub start: i32,
    /// Last year in the file (`start + 4`).
    pub end: i32,
}

impl ClimateWindow {
    /// Window starting at `year`.
    pub fn from_start(year: i32) -> Self {
        Self {
            start: year,
            end: year + CLIMATE_WINDOW_YEARS,
        }
    }
}

/// A descriptor value becomes one URL path segment.
fn check_segment(field: &'static str, value: &str) -> Result<()> {
    let bad = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '\\'));
    if bad {
        return Err(GridError::InvalidDescriptor {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn checked_url(url: String) -> Result<String> {
    match Url::parse(&url) {
        Ok(_) => Ok(url),
        Err(source) => Err(GridError::InvalidUrl { url, source }),
    }
}

/// URL of the POLARIS GeoTIFF covering one tile.
pub fn soil_url(tile: TileCoord, soil: &SoilDescriptor) -> Result<String> {
    soil.validate()?;
    checked_url(format!(
        "{}/{}/{}/{}/lat{}{}_lon{}{}.tif",
        soil.base_url.trim_end_matches('/'),
        soil.variable,
        soil.statistic,
        soil.depth,
        tile.lat,
        tile.lat + 1,
        tile.lon,
        tile.lon + 1,
    ))
}

/// POLARIS URLs for every tile covering `bbox`, keyed by tile key.
pub fn soil_url_map(bbox: &BoundingBox, soil: &SoilDescriptor) -> Result<TileUrls> {
    soil.validate()?;
    tile_url_map(bbox, |tile| soil_url(tile, soil))
}

/// URL of the MACAv2 monthly file for the five-year window starting at `year`.
pub fn climate_url(climate: &ClimateDescriptor, year: i32) -> Result<String> {
    climate.validate()?;
    let window = ClimateWindow::from_start(year);
    checked_url(format!(
        "{}/{}/{}_{}_{}_{}_{}_{}_{}_{}_monthly.nc",
        climate.base_url.trim_end_matches('/'),
        climate.model,
        climate.product,
        climate.variable,
        climate.model,
        climate.realization,
        climate.pathway,
        window.start,
        window.end,
        climate.region,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soil_url() {
        let url = soil_url(TileCoord::new(-104, 43), &SoilDescriptor::default()).unwrap();
        assert_eq!(
            url,
            "http://hydrology.cee.duke.edu/POLARIS/PROPERTIES/v1.0/sand/mean/100_200/lat4344_lon-104-103.tif"
        );
    }

    #[test]
    fn test_soil_url_custom_descriptor() {
        let soil = SoilDescriptor::new("clay", "p95", "0_5");
        let url = soil_url(TileCoord::new(10, -2), &soil).unwrap();
        assert!(url.ends_with("/clay/p95/0_5/lat-2-1_lon1011.tif"), "{url}");
    }

    #[test]
    fn test_climate_url() {
        let url = climate_url(&ClimateDescriptor::default(), 2026).unwrap();
        assert_eq!(
            url,
            "http://thredds.northwestknowledge.net:8080/thredds/dodsC/MACAV2/BNU-ESM/\
             macav2metdata_pr_BNU-ESM_r1i1p1_rcp85_2026_2030_CONUS_monthly.nc"
        );
    }

    #[test]
    fn test_with_run() {
        let climate = ClimateDescriptor::default().with_run("CanESM2", "rcp45");
        let url = climate_url(&climate, 2006).unwrap();
        assert!(url.contains("/CanESM2/macav2metdata_pr_CanESM2_r1i1p1_rcp45_2006_2010_"));
    }

    #[test]
    fn test_rejects_unsafe_segments() {
        let soil = SoilDescriptor::new("sand", "mean", "100 200");
        assert!(matches!(
            soil_url(TileCoord::new(0, 0), &soil),
            Err(GridError::InvalidDescriptor { field: "depth", .. })
        ));

        let soil = SoilDescriptor::new("", "mean", "0_5");
        assert!(soil_url(TileCoord::new(0, 0), &soil).is_err());

        let mut climate = ClimateDescriptor::default();
        climate.model = "../etc".to_string();
        assert!(climate_url(&climate, 2006).is_err());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let soil = SoilDescriptor {
            base_url: "not a url".to_string(),
            ..SoilDescriptor::default()
        };
        assert!(matches!(
            soil_url(TileCoord::new(0, 0), &soil),
            Err(GridError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_trailing_slash_on_base() {
        let soil = SoilDescriptor {
            base_url: format!("{}/", POLARIS_BASE_URL),
            ..SoilDescriptor::default()
        };
        let url = soil_url(TileCoord::new(-104, 43), &soil).unwrap();
        assert!(!url.contains("v1.0//"));
    }
}
