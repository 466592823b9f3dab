//! Data sources behind the soil and climate pipelines.
//!
//! The pipelines only see these traits, so tests can drive them with
//! in-memory fakes instead of the network.

use crate::{HttpFetcher, Result};
use habitat_grid::BoundingBox;
use habitat_raster::{decode_geotiff, ClimateCube, Crs, Raster, RasterStack};
use std::time::Duration;
use tracing::debug;

/// Something that can open a raster by URL.
pub trait RasterSource {
    /// Open the raster at `url`.
    fn open_raster(&self, url: &str) -> Result<Raster>;
}

/// Something that can open a gridded climate variable and clip it.
pub trait ClimateSource {
    /// CRS the source grids are stored in.
    fn crs(&self) -> Crs;

    /// Open `variable` at `url` and read the cells intersecting `clip`,
    /// given in [`ClimateSource::crs`] coordinates.
    fn open_clipped(&self, url: &str, variable: &str, clip: &BoundingBox) -> Result<RasterStack>;
}

/// GeoTIFF tiles fetched over HTTP.
#[derive(Debug)]
pub struct HttpRasterSource {
    fetcher: HttpFetcher,
}

impl HttpRasterSource {
    /// Create a source with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::with_timeout(timeout)?,
        })
    }

    /// Wrap an existing fetcher.
    pub fn from_fetcher(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &HttpFetcher {
        &self.fetcher
    }
}

impl RasterSource for HttpRasterSource {
    fn open_raster(&self, url: &str) -> Result<Raster> {
        let bytes = self.fetcher.get_bytes(url)?;
        debug!("Decoding {} bytes from {}", bytes.len(), url);
        Ok(decode_geotiff(&bytes)?)
    }
}

/// NetCDF datasets opened by path or OPeNDAP URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfClimateSource;

impl ClimateSource for NetcdfClimateSource {
    fn crs(&self) -> Crs {
        Crs::Wgs84
    }

    fn open_clipped(&self, url: &str, variable: &str, clip: &BoundingBox) -> Result<RasterStack> {
        let cube = ClimateCube::open(url, variable)?;
        Ok(cube.clip_box(clip)?)
    }
}
