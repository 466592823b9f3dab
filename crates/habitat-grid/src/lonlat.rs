//! Longitude normalization.

/// Normalize a longitude into `[-180, 180)`.
///
/// Climate grids such as MACAv2 store longitudes as `0..360` degrees east.
/// Coordinates are reassigned through this function before any clipping
/// against a boundary expressed in `-180..180`.
pub fn convert_lonlat(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}
