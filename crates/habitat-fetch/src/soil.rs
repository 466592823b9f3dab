//! Soil tile pipeline: fetch every tile covering a region and merge them.

use crate::{FetchError, RasterSource, Result};
use habitat_grid::{soil_url_map, BoundingBox, SoilDescriptor, TileUrls};
use habitat_raster::{merge_rasters, Raster};
use tracing::info;

/// Open the first URL of every tile key, in key order.
///
/// The first failing tile aborts the whole fetch.
pub fn fetch_tiles<S: RasterSource + ?Sized>(source: &S, urls: &TileUrls) -> Result<Vec<Raster>> {
    let mut rasters = Vec::with_capacity(urls.len());
    for (key, list) in urls {
        info!("{}", key);
        let url = list
            .first()
            .ok_or_else(|| FetchError::EmptyUrlList(key.clone()))?;
        rasters.push(source.open_raster(url)?);
    }
    Ok(rasters)
}

/// Fetch every tile in `urls` and merge them into one raster.
pub fn merge_soil<S: RasterSource + ?Sized>(source: &S, urls: &TileUrls) -> Result<Raster> {
    let rasters = fetch_tiles(source, urls)?;
    let merged = merge_rasters(&rasters)?;
    info!("Done");
    Ok(merged)
}

/// Build the tile URLs for `bbox` and merge the soil property they cover.
pub fn soil_for_region<S: RasterSource + ?Sized>(
    source: &S,
    bbox: &BoundingBox,
    soil: &SoilDescriptor,
) -> Result<Raster> {
    let urls = soil_url_map(bbox, soil)?;
    info!(
        "Fetching {} {} {} for {} tiles",
        soil.variable,
        soil.statistic,
        soil.depth,
        urls.len()
    );
    merge_soil(source, &urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitat_grid::TileCoord;
    use habitat_raster::RasterError;
    use std::cell::RefCell;

    /// Serves a one-degree raster for the tile named at the end of the URL,
    /// valued by tile longitude. Optionally fails on one URL.
    struct FakeTiles {
        fail_on: Option<String>,
        opened: RefCell<Vec<String>>,
    }

    impl FakeTiles {
        fn new() -> Self {
            Self {
                fail_on: None,
                opened: RefCell::new(Vec::new()),
            }
        }
    }

    impl RasterSource for FakeTiles {
        fn open_raster(&self, url: &str) -> Result<Raster> {
            self.opened.borrow_mut().push(url.to_string());
            if self.fail_on.as_deref() == Some(url) {
                return Err(FetchError::Raster(RasterError::InvalidGeoTiff(
                    "truncated".to_string(),
                )));
            }
            let tile: TileCoord = url.parse().unwrap();
            Ok(Raster::filled(2, 2, tile.bounds(), tile.lon as f32)?)
        }
    }

    fn urls(keys: &[TileCoord]) -> TileUrls {
        keys.iter().map(|t| (t.key(), vec![t.key()])).collect()
    }

    #[test]
    fn test_merge_covers_union() {
        let source = FakeTiles::new();
        let tiles = urls(&[
            TileCoord::new(-106, 39),
            TileCoord::new(-105, 39),
            TileCoord::new(-106, 40),
            TileCoord::new(-105, 40),
        ]);

        let merged = merge_soil(&source, &tiles).unwrap();
        assert_eq!(merged.bounds().total_bounds(), [-106.0, 39.0, -104.0, 41.0]);
        assert_eq!(merged.dimensions(), (4, 4));
        assert_eq!(&merged.data()[..4], &[-106.0, -106.0, -105.0, -105.0]);
        assert_eq!(source.opened.borrow().len(), 4);
    }

    #[test]
    fn test_first_failure_aborts() {
        let mut source = FakeTiles::new();
        source.fail_on = Some("lon-106lat40".to_string());
        let tiles = urls(&[
            TileCoord::new(-106, 39),
            TileCoord::new(-106, 40),
            TileCoord::new(-105, 39),
        ]);

        let err = merge_soil(&source, &tiles).unwrap_err();
        assert!(matches!(err, FetchError::Raster(_)));
        // Keys are visited in order; nothing after the failure is opened
        assert_eq!(
            *source.opened.borrow(),
            vec!["lon-105lat39".to_string(), "lon-106lat39".to_string(), "lon-106lat40".to_string()]
        );
    }

    #[test]
    fn test_empty_url_list() {
        let source = FakeTiles::new();
        let mut tiles = TileUrls::new();
        tiles.insert("lon-106lat39".to_string(), Vec::new());

        assert!(matches!(
            fetch_tiles(&source, &tiles),
            Err(FetchError::EmptyUrlList(key)) if key == "lon-106lat39"
        ));
    }
}
