//! GeoTIFF decoding and writing.

use crate::{Crs, Raster, RasterError, Result};
use habitat_grid::BoundingBox;
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

// GeoTIFF and GDAL tag ids
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Tag for a GeoTIFF/GDAL tag id.
///
/// `tiff` decodes these ids into named variants, so lookups must go through
/// the same mapping rather than `Tag::Unknown`.
fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

// GeoKey ids and values
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Decode an in-memory GeoTIFF, e.g. a downloaded tile.
///
/// Samples equal to the GDAL no-data value become NaN. Images with several
/// samples per pixel keep only the first.
pub fn decode_geotiff(bytes: &[u8]) -> Result<Raster> {
    decode(Cursor::new(bytes))
}

/// Read a GeoTIFF from disk.
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let file = File::open(path.as_ref())?;
    debug!("Reading GeoTIFF {}", path.as_ref().display());
    decode(file)
}

fn decode<R: Read + Seek>(reader: R) -> Result<Raster> {
    let mut decoder = Decoder::new(reader)?;

    // Soil tiles are small, but allow full-size DEM tiles too
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.intermediate_buffer_size = 1024 * 1024 * 1024; // 1 GB
    limits.ifd_value_size = 1024 * 1024 * 1024;
    decoder = decoder.with_limits(limits);

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let bounds = read_bounds(&mut decoder, width, height)?;
    let crs = read_crs(&mut decoder);
    let nodata = read_nodata_value(&mut decoder);

    let samples = decode_samples(&mut decoder)?;
    let pixels = width * height;
    if pixels == 0 || samples.len() % pixels != 0 {
        return Err(RasterError::InvalidGeoTiff(format!(
            "{} samples for a {}x{} image",
            samples.len(),
            width,
            height
        )));
    }
    let per_pixel = samples.len() / pixels;

    let data: Vec<f32> = samples
        .into_iter()
        .step_by(per_pixel)
        .map(|v| match nodata {
            Some(nd) if v == nd => f32::NAN,
            _ => v,
        })
        .collect();

    let mut raster = Raster::new(data, width, height, bounds)?;
    raster.set_crs(crs);
    Ok(raster)
}

/// Geographic bounds from ModelTiepoint and ModelPixelScale.
fn read_bounds<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
) -> Result<BoundingBox> {
    let tiepoint = decoder
        .get_tag_f64_vec(geo_tag(MODEL_TIEPOINT))
        .map_err(|_| RasterError::InvalidGeoTiff("missing ModelTiepoint tag".to_string()))?;
    let scale = decoder
        .get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE))
        .map_err(|_| RasterError::InvalidGeoTiff("missing ModelPixelScale tag".to_string()))?;

    if tiepoint.len() < 6 || scale.len() < 2 {
        return Err(RasterError::InvalidGeoTiff(format!(
            "short georeferencing tags: tiepoint {:?}, scale {:?}",
            tiepoint, scale
        )));
    }

    // Tiepoint is [i, j, k, x, y, z]; pixel (i, j) sits at (x, y)
    let scale_x = scale[0];
    let scale_y = scale[1];
    let min_lon = tiepoint[3] - tiepoint[0] * scale_x;
    let max_lat = tiepoint[4] + tiepoint[1] * scale_y;

    Ok(BoundingBox::new(
        min_lon,
        max_lat - height as f64 * scale_y,
        min_lon + width as f64 * scale_x,
        max_lat,
    )?)
}

/// CRS from the GeoKeyDirectory, when it names a supported EPSG code.
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<Crs> {
    let keys = decoder
        .get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY))
        .ok()?;

    // Header is 4 shorts, then (id, location, count, value) per key
    keys.get(4..)?
        .chunks_exact(4)
        .filter(|k| k[1] == 0)
        .find(|k| k[0] == GEOGRAPHIC_TYPE_GEO_KEY || k[0] == PROJECTED_CS_TYPE_GEO_KEY)
        .and_then(|k| Crs::from_epsg(k[3] as u32))
}

/// No-data value from the GDAL_NODATA ASCII tag.
fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    let text = decoder.get_tag_ascii_string(geo_tag(GDAL_NODATA)).ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse()
        .ok()
}

fn decode_samples<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
    let result = decoder.read_image()?;

    match result {
        DecodingResult::F32(data) => Ok(data),
        DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
    }
}

/// Write a raster as a single-band f32 GeoTIFF.
///
/// NaN samples are declared as no-data, so GIS tools show gaps in merged
/// rasters as empty.
pub fn write_geotiff<P: AsRef<Path>>(raster: &Raster, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file)?;
    let (width, height) = raster.dimensions();
    let mut image = encoder.new_image::<Gray32Float>(width as u32, height as u32)?;

    let (res_x, res_y) = raster.resolution();
    let bounds = raster.bounds();
    let pixel_scale = [res_x, res_y, 0.0];
    let tiepoint = [0.0, 0.0, 0.0, bounds.min_lon, bounds.max_lat, 0.0];

    let dir = image.encoder();
    dir.write_tag(geo_tag(MODEL_PIXEL_SCALE), &pixel_scale[..])?;
    dir.write_tag(geo_tag(MODEL_TIEPOINT), &tiepoint[..])?;
    dir.write_tag(
        geo_tag(GEO_KEY_DIRECTORY),
        &geokey_directory(raster.crs().unwrap_or_default())[..],
    )?;
    dir.write_tag(geo_tag(GDAL_NODATA), "nan")?;

    image.write_data(raster.data())?;
    debug!("Wrote {}x{} GeoTIFF to {}", width, height, path.display());
    Ok(())
}

fn geokey_directory(crs: Crs) -> Vec<u16> {
    let (model_type, crs_key) = if crs.is_geographic() {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE_GEO_KEY)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE_GEO_KEY)
    };
    vec![
        1, 1, 0, 3, // version, revision, minor revision, key count
        GT_MODEL_TYPE_GEO_KEY, 0, 1, model_type,
        GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA,
        crs_key, 0, 1, crs.epsg() as u16,
    ]
}
