//! Geographic bounding boxes.

use crate::{GridError, Result};
use serde::{Deserialize, Serialize};

/// Axis-aligned envelope of a region.
///
/// Values are degrees for geographic boxes. Once a box has been reprojected
/// the same fields carry the target system's units (e.g. meters), with
/// `min_lon`/`max_lon` on the x axis and `min_lat`/`max_lat` on the y axis.
///
/// Serialized as a four element array `[min_lon, min_lat, max_lon, max_lat]`,
/// the same order as a GeoDataFrame's `total_bounds`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    /// Minimum longitude (west edge).
    pub min_lon: f64,
    /// Minimum latitude (south edge).
    pub min_lat: f64,
    /// Maximum longitude (east edge).
    pub max_lon: f64,
    /// Maximum latitude (north edge).
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a bounding box, rejecting non-finite or inverted extents.
    ///
    /// Zero-area boxes (a point or a line) are valid.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self> {
        let finite = [min_lon, min_lat, max_lon, max_lat].iter().all(|v| v.is_finite());
        if !finite || min_lon > max_lon || min_lat > max_lat {
            return Err(GridError::InvalidBounds {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            });
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// Create a bounding box from `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn from_total_bounds(bounds: [f64; 4]) -> Result<Self> {
        Self::new(bounds[0], bounds[1], bounds[2], bounds[3])
    }

    /// Extents as `[min_lon, min_lat, max_lon, max_lat]`.
    pub fn total_bounds(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// East-west extent.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// North-south extent.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// True if the box has zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    /// Check if a coordinate is within the bounds (edges included).
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// True if the two boxes share interior area.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon < other.max_lon
            && other.min_lon < self.max_lon
            && self.min_lat < other.max_lat
            && other.min_lat < self.max_lat
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Overlap of the two boxes, if they share interior area.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(BoundingBox {
            min_lon: self.min_lon.max(other.min_lon),
            min_lat: self.min_lat.max(other.min_lat),
            max_lon: self.max_lon.min(other.max_lon),
            max_lat: self.max_lat.min(other.max_lat),
        })
    }
}

impl TryFrom<[f64; 4]> for BoundingBox {
    type Error = GridError;

    fn try_from(bounds: [f64; 4]) -> Result<Self> {
        Self::from_total_bounds(bounds)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        bbox.total_bounds()
    }
}
