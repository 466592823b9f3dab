//! Coordinate reference systems and bounding-box reprojection.

use crate::{RasterError, Result};
use habitat_grid::BoundingBox;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// WGS84 semi-major axis, used as the Web Mercator sphere radius.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Web Mercator latitude limit (arctan(sinh(π))).
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Points sampled along each edge when reprojecting a box.
const DENSIFY_POINTS: usize = 21;

/// The spatial reference systems rasters and boundaries can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    /// Geographic longitude/latitude (EPSG:4326).
    #[default]
    Wgs84,
    /// Spherical Web Mercator in meters (EPSG:3857).
    WebMercator,
}

impl Crs {
    /// Look up a CRS by EPSG code.
    pub fn from_epsg(epsg: u32) -> Option<Crs> {
        match epsg {
            4326 => Some(Crs::Wgs84),
            3857 | 900913 => Some(Crs::WebMercator),
            _ => None,
        }
    }

    /// Parse `EPSG:4326`, `epsg:3857`, a bare code or `WGS84`.
    pub fn from_srs_spec(srs: &str) -> Option<Crs> {
        let srs = srs.trim();
        let code = srs
            .strip_prefix("EPSG:")
            .or_else(|| srs.strip_prefix("epsg:"))
            .unwrap_or(srs);

        if let Ok(epsg) = code.parse::<u32>() {
            return Self::from_epsg(epsg);
        }
        if srs.eq_ignore_ascii_case("WGS84") {
            return Some(Crs::Wgs84);
        }
        None
    }

    /// EPSG code of this CRS.
    pub fn epsg(&self) -> u32 {
        match *self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
        }
    }

    /// True for longitude/latitude systems.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    /// Transform one point from this CRS into `to`.
    pub fn transform_point(&self, to: Crs, x: f64, y: f64) -> (f64, f64) {
        match (*self, to) {
            (Crs::Wgs84, Crs::WebMercator) => {
                let lat = y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
                let mx = EARTH_RADIUS_M * x.to_radians();
                let my = EARTH_RADIUS_M * (PI / 4.0 + lat / 2.0).tan().ln();
                (mx, my)
            }
            (Crs::WebMercator, Crs::Wgs84) => {
                let lon = (x / EARTH_RADIUS_M).to_degrees();
                let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
                (lon, lat)
            }
            _ => (x, y),
        }
    }

    /// Reproject a bounding box into `to`.
    ///
    /// Each edge is densified before transforming so the result envelopes the
    /// curved image of the box, not just its corners.
    pub fn transform_bounds(&self, bbox: &BoundingBox, to: Crs) -> Result<BoundingBox> {
        if *self == to {
            return Ok(*bbox);
        }

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        let steps = (DENSIFY_POINTS - 1) as f64;
        for i in 0..DENSIFY_POINTS {
            let t = i as f64 / steps;
            let x = bbox.min_lon + t * bbox.width();
            let y = bbox.min_lat + t * bbox.height();
            let edge_points = [
                (x, bbox.min_lat),
                (x, bbox.max_lat),
                (bbox.min_lon, y),
                (bbox.max_lon, y),
            ];
            for (px, py) in edge_points {
                let (tx, ty) = self.transform_point(to, px, py);
                min_x = min_x.min(tx);
                min_y = min_y.min(ty);
                max_x = max_x.max(tx);
                max_y = max_y.max(ty);
            }
        }

        Ok(BoundingBox::new(min_x, min_y, max_x, max_y)?)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_srs_spec(s).ok_or_else(|| RasterError::UnsupportedCrs(s.to_string()))
    }
}

impl TryFrom<String> for Crs {
    type Error = RasterError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}
