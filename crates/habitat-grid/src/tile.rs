//! One-degree tile coordinates and keys.

use crate::{BoundingBox, GridError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Mapping from tile key (`lon{lon}lat{lat}`) to the URLs serving that tile.
///
/// Each key normally maps to a single URL.
pub type TileUrls = BTreeMap<String, Vec<String>>;

/// Integer coordinate of the south-west corner of a one-degree cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Longitude of the west edge.
    pub lon: i32,
    /// Latitude of the south edge.
    pub lat: i32,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(lon: i32, lat: i32) -> Self {
        Self { lon, lat }
    }

    /// The tile whose half-open cell contains the given coordinate.
    pub fn containing(lon: f64, lat: f64) -> Self {
        Self {
            lon: lon.floor() as i32,
            lat: lat.floor() as i32,
        }
    }

    /// Get the geographic bounds of this tile.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox {
            min_lon: self.lon as f64,
            min_lat: self.lat as f64,
            max_lon: (self.lon + 1) as f64,
            max_lat: (self.lat + 1) as f64,
        }
    }

    /// Key used in [`TileUrls`], e.g. `lon-106lat39`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lon{}lat{}", self.lon, self.lat)
    }
}

impl FromStr for TileCoord {
    type Err = GridError;

    fn from_str(key: &str) -> Result<Self> {
        let invalid = || GridError::InvalidTileKey(key.to_string());
        let (lon, lat) = key
            .strip_prefix("lon")
            .and_then(|rest| rest.split_once("lat"))
            .ok_or_else(invalid)?;

        Ok(Self {
            lon: lon.parse().map_err(|_| invalid())?,
            lat: lat.parse().map_err(|_| invalid())?,
        })
    }
}

/// Half-open integer range of cells covering `min..max`, never empty.
fn cell_range(min: f64, max: f64) -> std::ops::Range<i32> {
    let start = min.floor() as i32;
    let end = (max.ceil() as i32).max(start + 1);
    start..end
}

/// Enumerate the one-degree tiles covering a bounding box.
///
/// Longitudes run over `floor(min_lon)..ceil(max_lon)` and latitudes over
/// `floor(min_lat)..ceil(max_lat)`, upper bounds exclusive. A zero-area box
/// still yields the tile containing it. Tiles are produced longitude-major.
///
/// The box must lie within lon [-180, 180] and lat [-90, 90]; projected
/// extents (metres) are rejected with [`GridError::InvalidBounds`].
pub fn tiles_for_bbox(bbox: &BoundingBox) -> Result<Vec<TileCoord>> {
    let geographic = bbox.min_lon >= -180.0
        && bbox.max_lon <= 180.0
        && bbox.min_lat >= -90.0
        && bbox.max_lat <= 90.0;
    if !geographic {
        return Err(GridError::InvalidBounds {
            min_lon: bbox.min_lon,
            min_lat: bbox.min_lat,
            max_lon: bbox.max_lon,
            max_lat: bbox.max_lat,
        });
    }

    let lons = cell_range(bbox.min_lon, bbox.max_lon);
    let lats = cell_range(bbox.min_lat, bbox.max_lat);

    let mut tiles = Vec::with_capacity(lons.len() * lats.len());
    for lon in lons {
        for lat in lats.clone() {
            tiles.push(TileCoord { lon, lat });
        }
    }
    Ok(tiles)
}

/// Build a [`TileUrls`] map by applying `url_for` to every tile of `bbox`.
pub fn tile_url_map<F>(bbox: &BoundingBox, mut url_for: F) -> Result<TileUrls>
where
    F: FnMut(TileCoord) -> Result<String>,
{
    let mut urls = TileUrls::new();
    for tile in tiles_for_bbox(bbox)? {
        tracing::debug!(lon = tile.lon, lat = tile.lat, "tile");
        let url = url_for(tile)?;
        urls.entry(tile.key()).or_default().push(url);
    }
    Ok(urls)
}
