//! Climate pipeline: clip downscaled projections to each site.

use crate::{ClimateSource, Result};
use habitat_grid::{climate_url, BoundingBox, ClimateDescriptor};
use habitat_raster::{Crs, RasterStack};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A named area of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    /// Boundary as `[min_x, min_y, max_x, max_y]` in `crs` units.
    pub boundary: BoundingBox,
    #[serde(default)]
    pub crs: Crs,
}

impl Site {
    pub fn new(name: &str, boundary: BoundingBox) -> Self {
        Self {
            name: name.to_string(),
            boundary,
            crs: Crs::Wgs84,
        }
    }
}

/// Which runs, pathways and windows to clip for which sites.
///
/// Empty `models` or `pathways` fall back to the descriptor's own model or
/// pathway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateRequest {
    pub descriptor: ClimateDescriptor,
    pub sites: Vec<Site>,
    pub models: Vec<String>,
    pub pathways: Vec<String>,
    /// First year of each five-year window.
    pub years: Vec<i32>,
}

impl ClimateRequest {
    fn models(&self) -> Vec<String> {
        if self.models.is_empty() {
            vec![self.descriptor.model.clone()]
        } else {
            self.models.clone()
        }
    }

    fn pathways(&self) -> Vec<String> {
        if self.pathways.is_empty() {
            vec![self.descriptor.pathway.clone()]
        } else {
            self.pathways.clone()
        }
    }

    /// Number of rows [`fetch_climate`] will produce.
    pub fn row_count(&self) -> usize {
        self.sites.len() * self.models().len() * self.years.len() * self.pathways().len()
    }
}

/// One clipped climate window.
#[derive(Debug, Clone)]
pub struct ClimateRow {
    pub site: String,
    pub model: String,
    pub year: i32,
    pub pathway: String,
    pub url: String,
    pub raster: RasterStack,
}

/// Clip every site × model × year × pathway combination.
///
/// Each site boundary is reprojected into the source CRS before clipping.
/// The first failure aborts.
pub fn fetch_climate<S: ClimateSource + ?Sized>(
    source: &S,
    request: &ClimateRequest,
) -> Result<Vec<ClimateRow>> {
    if request.years.is_empty() {
        warn!("No climate years requested");
        return Ok(Vec::new());
    }

    let models = request.models();
    let pathways = request.pathways();
    let mut rows = Vec::with_capacity(request.row_count());

    for site in &request.sites {
        let clip = site.crs.transform_bounds(&site.boundary, source.crs())?;
        for model in &models {
            for &year in &request.years {
                for pathway in &pathways {
                    let descriptor = request.descriptor.with_run(model, pathway);
                    let url = climate_url(&descriptor, year)?;
                    info!("{} {} {} {}: {}", site.name, model, year, pathway, url);

                    let raster = source.open_clipped(&url, &descriptor.variable, &clip)?;
                    rows.push(ClimateRow {
                        site: site.name.clone(),
                        model: model.clone(),
                        year,
                        pathway: pathway.clone(),
                        url,
                        raster,
                    });
                }
            }
        }
    }

    info!("Clipped {} climate windows", rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitat_raster::Raster;
    use std::cell::RefCell;

    /// Returns a one-cell stack covering the clip box and records each call.
    #[derive(Default)]
    struct FakeClimate {
        calls: RefCell<Vec<(String, String, BoundingBox)>>,
    }

    impl ClimateSource for FakeClimate {
        fn crs(&self) -> Crs {
            Crs::Wgs84
        }

        fn open_clipped(&self, url: &str, variable: &str, clip: &BoundingBox) -> Result<RasterStack> {
            self.calls
                .borrow_mut()
                .push((url.to_string(), variable.to_string(), *clip));
            let layer = Raster::filled(1, 1, *clip, 1.0)?.with_crs(Crs::Wgs84);
            Ok(RasterStack::new(vec![layer], vec![0.0])?)
        }
    }

    fn request() -> ClimateRequest {
        ClimateRequest {
            descriptor: ClimateDescriptor::default(),
            sites: vec![
                Site::new("north", BoundingBox::new(-105.3, 39.5, -104.1, 40.2).unwrap()),
                Site::new("south", BoundingBox::new(-106.0, 37.0, -105.0, 38.0).unwrap()),
            ],
            models: vec!["BNU-ESM".to_string(), "CCSM4".to_string(), "MIROC5".to_string()],
            pathways: vec!["rcp45".to_string(), "rcp85".to_string()],
            years: vec![2021, 2026],
        }
    }

    #[test]
    fn test_row_count_and_windows() {
        let source = FakeClimate::default();
        let req = request();
        let rows = fetch_climate(&source, &req).unwrap();

        assert_eq!(rows.len(), 2 * 3 * 2 * 2);
        assert_eq!(rows.len(), req.row_count());
        for row in &rows {
            let window = format!("_{}_{}_{}_CONUS_monthly.nc", row.pathway, row.year, row.year + 4);
            assert!(row.url.ends_with(&window), "{} lacks {}", row.url, window);
            assert!(row.url.contains(&format!("/{}/", row.model)));
        }
        assert!(source.calls.borrow().iter().all(|(_, var, _)| var == "pr"));
    }

    #[test]
    fn test_defaults_from_descriptor() {
        let source = FakeClimate::default();
        let mut req = request();
        req.models.clear();
        req.pathways.clear();
        req.years = vec![2006];

        let rows = fetch_climate(&source, &req).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.model == "BNU-ESM" && r.pathway == "rcp85"));
    }

    #[test]
    fn test_no_years_yields_no_rows() {
        let source = FakeClimate::default();
        let mut req = request();
        req.years.clear();
        assert!(fetch_climate(&source, &req).unwrap().is_empty());
        assert!(source.calls.borrow().is_empty());
    }

    #[test]
    fn test_site_boundary_is_reprojected() {
        let source = FakeClimate::default();
        let boundary = Crs::Wgs84
            .transform_bounds(
                &BoundingBox::new(-105.3, 39.5, -104.1, 40.2).unwrap(),
                Crs::WebMercator,
            )
            .unwrap();
        let req = ClimateRequest {
            sites: vec![Site {
                name: "mercator".to_string(),
                boundary,
                crs: Crs::WebMercator,
            }],
            years: vec![2031],
            ..ClimateRequest::default()
        };

        fetch_climate(&source, &req).unwrap();
        let calls = source.calls.borrow();
        let clip = calls[0].2;
        assert!((clip.min_lon + 105.3).abs() < 1e-9);
        assert!((clip.max_lat - 40.2).abs() < 1e-9);
    }
}
