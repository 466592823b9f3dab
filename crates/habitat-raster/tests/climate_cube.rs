//! Integration tests for NetCDF climate cubes and GeoTIFF output.
//!
//! Each test writes a small NetCDF file on a 0..360 longitude grid, the way
//! MACA data is stored, and reads it back through `ClimateCube`.

use approx::assert_relative_eq;
use habitat_grid::BoundingBox;
use habitat_raster::{read_geotiff, write_geotiff, ClimateCube, Crs, RasterError};
use std::path::Path;
use tempfile::tempdir;

const FILL: f32 = -999.0;

/// Write a `(time, lat, lon)` cube with value `t*100 + lat*10 + lon` (by
/// index), one filled cell, a packed 2-D variable, a transposed variable and
/// two 4-D variables with an extra `height` or `member` dimension.
fn write_cube(path: &Path) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", 2).unwrap();
    file.add_dimension("height", 1).unwrap();
    file.add_dimension("member", 2).unwrap();
    file.add_dimension("lat", 3).unwrap();
    file.add_dimension("lon", 4).unwrap();

    let mut time = file.add_variable::<f64>("time", &["time"]).unwrap();
    time.put_values(&[15.5, 45.0], ..).unwrap();

    // South to north
    let mut lat = file.add_variable::<f64>("lat", &["lat"]).unwrap();
    lat.put_values(&[38.5, 39.5, 40.5], ..).unwrap();

    // -106.5, -105.5, -104.5, -103.5 after normalization
    let mut lon = file.add_variable::<f64>("lon", &["lon"]).unwrap();
    lon.put_values(&[253.5, 254.5, 255.5, 256.5], ..).unwrap();

    let mut data = Vec::new();
    for t in 0..2 {
        for y in 0..3 {
            for x in 0..4 {
                data.push((t * 100 + y * 10 + x) as f32);
            }
        }
    }
    // t=1, lat=39.5, lon=-105.5
    data[12 + 4 + 1] = FILL;

    let mut pr = file
        .add_variable::<f32>("pr", &["time", "lat", "lon"])
        .unwrap();
    pr.put_attribute("_FillValue", FILL).unwrap();
    pr.put_values(&data, ..).unwrap();

    let mut packed = file.add_variable::<f32>("elev", &["lat", "lon"]).unwrap();
    packed.put_attribute("scale_factor", 2.0f64).unwrap();
    packed.put_attribute("add_offset", 1.0f64).unwrap();
    packed.put_values(&data[..12], ..).unwrap();

    let mut transposed = file
        .add_variable::<f32>("swapped", &["lon", "lat"])
        .unwrap();
    transposed.put_values(&data[..12], ..).unwrap();

    let mut tas = file
        .add_variable::<f32>("tas", &["time", "height", "lat", "lon"])
        .unwrap();
    tas.put_values(&data, ..).unwrap();

    let members: Vec<f32> = data.iter().chain(data.iter()).copied().collect();
    let mut ensemble = file
        .add_variable::<f32>("ensemble", &["time", "member", "lat", "lon"])
        .unwrap();
    ensemble.put_values(&members, ..).unwrap();
}

#[test]
fn test_clip_reads_window_north_up() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pr.nc");
    write_cube(&path);

    let cube = ClimateCube::open(path.to_str().unwrap(), "pr").unwrap();
    assert_eq!(cube.times(), &[15.5, 45.0]);
    assert_eq!(
        cube.bounds().unwrap().total_bounds(),
        [-107.0, 38.0, -103.0, 41.0]
    );

    let clip = BoundingBox::new(-106.0, 39.0, -104.2, 41.0).unwrap();
    let stack = cube.clip_box(&clip).unwrap();

    assert_eq!(stack.len(), 2);
    assert_eq!(stack.labels(), &[15.5, 45.0]);
    assert_eq!(stack.dimensions(), (2, 2));
    assert_eq!(stack.crs(), Some(Crs::Wgs84));
    assert_eq!(stack.bounds().total_bounds(), [-106.0, 39.0, -104.0, 41.0]);

    // First row is the northern latitude
    assert_eq!(stack.layers()[0].data(), &[21.0, 22.0, 11.0, 12.0]);

    let second = stack.layers()[1].data();
    assert_eq!(&second[..2], &[121.0, 122.0]);
    assert!(second[2].is_nan(), "fill value should be masked");
    assert_eq!(second[3], 112.0);
}

#[test]
fn test_clip_outside_grid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pr.nc");
    write_cube(&path);

    let cube = ClimateCube::open(path.to_str().unwrap(), "pr").unwrap();
    let clip = BoundingBox::new(10.0, 45.0, 11.0, 46.0).unwrap();
    assert!(matches!(
        cube.clip_box(&clip),
        Err(RasterError::NoOverlap { .. })
    ));
}

#[test]
fn test_packed_two_dimensional_variable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pr.nc");
    write_cube(&path);

    let cube = ClimateCube::open(path.to_str().unwrap(), "elev").unwrap();
    assert!(cube.times().is_empty());

    let clip = BoundingBox::new(-107.0, 38.0, -106.0, 39.0).unwrap();
    let stack = cube.clip_box(&clip).unwrap();
    assert_eq!(stack.len(), 1);
    assert_eq!(stack.dimensions(), (1, 1));
    assert_relative_eq!(stack.layers()[0].data()[0], 1.0);

    let whole = cube.clip_box(&cube.bounds().unwrap()).unwrap();
    // Northern row, easternmost column: raw 23 -> 23*2 + 1
    assert_relative_eq!(whole.layers()[0].data()[3], 47.0);
}

#[test]
fn test_singleton_dimension_is_squeezed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pr.nc");
    write_cube(&path);

    let cube = ClimateCube::open(path.to_str().unwrap(), "tas").unwrap();
    assert_eq!(cube.times(), &[15.5, 45.0]);

    let clip = BoundingBox::new(-106.0, 39.0, -104.2, 41.0).unwrap();
    let stack = cube.clip_box(&clip).unwrap();
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.dimensions(), (2, 2));
    assert_eq!(stack.layers()[0].data(), &[21.0, 22.0, 11.0, 12.0]);
    // No _FillValue on this variable
    assert_eq!(stack.layers()[1].data(), &[121.0, 122.0, FILL, 112.0]);
}

#[test]
fn test_point_on_cell_edge_selects_a_cell() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pr.nc");
    write_cube(&path);

    let cube = ClimateCube::open(path.to_str().unwrap(), "pr").unwrap();
    let point = BoundingBox::new(-106.0, 40.0, -106.0, 40.0).unwrap();
    let stack = cube.clip_box(&point).unwrap();

    assert_eq!(stack.dimensions(), (1, 1));
    assert_eq!(stack.bounds().total_bounds(), [-106.0, 40.0, -105.0, 41.0]);
    assert_eq!(stack.layers()[0].data(), &[21.0]);
}

#[test]
fn test_layout_and_variable_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pr.nc");
    write_cube(&path);
    let source = path.to_str().unwrap();

    assert!(matches!(
        ClimateCube::open(source, "swapped"),
        Err(RasterError::UnsupportedLayout { .. })
    ));
    // Extra dimensions longer than one are not squeezed
    match ClimateCube::open(source, "ensemble") {
        Err(RasterError::UnsupportedLayout { variable, dims }) => {
            assert_eq!(variable, "ensemble");
            assert_eq!(dims, ["time", "member", "lat", "lon"]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        ClimateCube::open(source, "tasmax"),
        Err(RasterError::MissingVariable(_))
    ));
}

#[test]
fn test_mean_layer_to_geotiff() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pr.nc");
    write_cube(&path);

    let cube = ClimateCube::open(path.to_str().unwrap(), "pr").unwrap();
    let clip = BoundingBox::new(-106.0, 39.0, -104.2, 41.0).unwrap();
    let mean = cube.clip_box(&clip).unwrap().mean_layer();

    // Masked cell falls back to the one valid month
    assert_eq!(mean.data(), &[71.0, 72.0, 11.0, 62.0]);

    let out = dir.path().join("climate").join("pr_mean.tif");
    write_geotiff(&mean, &out).unwrap();
    let back = read_geotiff(&out).unwrap();
    assert_eq!(back.dimensions(), (2, 2));
    assert_eq!(back.crs(), Some(Crs::Wgs84));
    assert_eq!(back.data(), mean.data());
}
