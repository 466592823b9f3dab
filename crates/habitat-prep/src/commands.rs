//! Subcommand implementations.
//!
//! Each command takes the resolved [`PrepConfig`] and the sources to fetch
//! through, so the binary wires in HTTP and NetCDF while tests use local files.

use crate::{PrepConfig, Result};
use habitat_fetch::{
    acquire_srtm, fetch_climate, soil_for_region, ClimateSource, HttpFetcher, RasterSource,
};
use habitat_grid::{soil_url_map, SoilDescriptor, CLIMATE_WINDOW_YEARS};
use habitat_raster::write_geotiff;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Tile key to URL map for the configured region and soil layer, as JSON.
pub fn run_tiles(config: &PrepConfig) -> Result<String> {
    let region = config.region()?;
    let urls = soil_url_map(&region, &config.soil)?;
    info!("{} tiles for {:?}", urls.len(), region.total_bounds());
    Ok(serde_json::to_string_pretty(&urls)?)
}

/// Default soil output: `data_dir/soil/{variable}_{statistic}_{depth}.tif`.
pub fn soil_output_path(data_dir: &Path, soil: &SoilDescriptor) -> PathBuf {
    data_dir.join("soil").join(format!(
        "{}_{}_{}.tif",
        soil.variable, soil.statistic, soil.depth
    ))
}

/// Fetch and merge the soil layer for the region and write it as a GeoTIFF.
pub fn run_soil<S: RasterSource + ?Sized>(
    config: &PrepConfig,
    source: &S,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let region = config.region()?;
    let merged = soil_for_region(source, &region, &config.soil)?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| soil_output_path(&config.data_dir, &config.soil));
    write_geotiff(&merged, &path)?;
    info!(
        "Wrote {}x{} soil raster to {}",
        merged.width(),
        merged.height(),
        path.display()
    );
    Ok(path)
}

/// Clip every configured climate window and write each window's mean as a
/// GeoTIFF, one file per site, model, pathway and window.
pub fn run_climate<S: ClimateSource + ?Sized>(
    config: &PrepConfig,
    source: &S,
    output_dir: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let request = &config.climate;
    if request.sites.is_empty() {
        warn!("No climate sites configured");
        return Ok(Vec::new());
    }

    let dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.data_dir.join("climate"));
    fs::create_dir_all(&dir)?;

    let rows = fetch_climate(source, request)?;
    let mut written = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = format!(
            "{}_{}_{}_{}_{}_{}.tif",
            row.site,
            row.model,
            row.pathway,
            row.year,
            row.year + CLIMATE_WINDOW_YEARS,
            request.descriptor.variable
        );
        let path = dir.join(name);
        write_geotiff(&row.raster.mean_layer(), &path)?;
        written.push(path);
    }

    info!("Wrote {} climate rasters to {}", written.len(), dir.display());
    Ok(written)
}

/// Find or download SRTM archives under `data_dir/srtm`.
pub fn run_srtm(config: &PrepConfig) -> Result<Vec<PathBuf>> {
    let fetcher = HttpFetcher::with_timeout(config.http_timeout())?;
    let archives = acquire_srtm(&fetcher, &config.data_dir, config.boundary.as_deref())?;

    let stats = fetcher.download_stats();
    if stats.files_downloaded > 0 {
        info!(
            "Downloaded {} archives ({} bytes)",
            stats.files_downloaded, stats.bytes_downloaded
        );
    }
    Ok(archives)
}
