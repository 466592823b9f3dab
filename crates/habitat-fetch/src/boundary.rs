//! Project boundary files.

use crate::{FetchError, Result};
use geojson::{GeoJson, Geometry, Value};
use habitat_grid::BoundingBox;
use shapefile::Shape;
use std::path::Path;
use tracing::debug;

/// Running envelope over boundary coordinates.
#[derive(Debug, Clone, Copy)]
struct Envelope {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Envelope {
    fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    fn add(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn is_empty(&self) -> bool {
        self.min_x > self.max_x
    }

    fn into_bbox(self, path: &Path) -> Result<BoundingBox> {
        if self.is_empty() {
            return Err(FetchError::EmptyBoundary(path.to_path_buf()));
        }
        Ok(BoundingBox::new(self.min_x, self.min_y, self.max_x, self.max_y)?)
    }
}

/// Bounding box of every shape in a boundary file.
///
/// Shapefiles (`.shp`) and GeoJSON (`.geojson`, `.json`) are supported.
/// Coordinates are returned as stored; no reprojection happens here.
pub fn load_boundary<P: AsRef<Path>>(path: P) -> Result<BoundingBox> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let bbox = match extension.as_deref() {
        Some("shp") => shapefile_bounds(path)?,
        Some("geojson") | Some("json") => geojson_bounds(path)?,
        _ => return Err(FetchError::UnsupportedBoundary(path.to_path_buf())),
    };
    debug!("Boundary {} -> {:?}", path.display(), bbox.total_bounds());
    Ok(bbox)
}

fn shapefile_bounds(path: &Path) -> Result<BoundingBox> {
    let shapes = shapefile::read_shapes(path)?;
    let mut env = Envelope::new();

    for shape in &shapes {
        match shape {
            Shape::Polygon(p) => {
                env.add(p.bbox().min.x, p.bbox().min.y);
                env.add(p.bbox().max.x, p.bbox().max.y);
            }
            Shape::PolygonM(p) => {
                env.add(p.bbox().min.x, p.bbox().min.y);
                env.add(p.bbox().max.x, p.bbox().max.y);
            }
            Shape::PolygonZ(p) => {
                env.add(p.bbox().min.x, p.bbox().min.y);
                env.add(p.bbox().max.x, p.bbox().max.y);
            }
            Shape::Polyline(p) => {
                env.add(p.bbox().min.x, p.bbox().min.y);
                env.add(p.bbox().max.x, p.bbox().max.y);
            }
            Shape::Point(p) => env.add(p.x, p.y),
            _ => {}
        }
    }

    env.into_bbox(path)
}

fn geojson_bounds(path: &Path) -> Result<BoundingBox> {
    let text = std::fs::read_to_string(path)?;
    let geojson: GeoJson = text.parse()?;
    let mut env = Envelope::new();

    match &geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(geometry) = &feature.geometry {
                    add_geometry(&mut env, geometry);
                }
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                add_geometry(&mut env, geometry);
            }
        }
        GeoJson::Geometry(geometry) => add_geometry(&mut env, geometry),
    }

    env.into_bbox(path)
}

fn add_geometry(env: &mut Envelope, geometry: &Geometry) {
    match &geometry.value {
        Value::Point(p) => add_position(env, p),
        Value::MultiPoint(ps) | Value::LineString(ps) => {
            ps.iter().for_each(|p| add_position(env, p))
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().for_each(|p| add_position(env, p))
        }
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .flatten()
            .for_each(|p| add_position(env, p)),
        Value::GeometryCollection(members) => {
            for member in members {
                add_geometry(env, member);
            }
        }
    }
}

fn add_position(env: &mut Envelope, position: &[f64]) {
    if position.len() >= 2 {
        env.add(position[0], position[1]);
    }
}
