//! Gridded climate variables read from NetCDF files or OPeNDAP endpoints.

use crate::{Crs, RasterError, RasterStack, Result};
use habitat_grid::{convert_lonlat, BoundingBox};
use netcdf::AttributeValue;
use std::ops::Range;
use tracing::{debug, info};

const LAT: &str = "lat";
const LON: &str = "lon";
const TIME: &str = "time";

/// Largest number of dimensions a variable may have.
const MAX_DIMS: usize = 4;

/// Role of one variable dimension, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dim {
    Time,
    Lat,
    Lon,
    /// Extra length-1 dimension (e.g. `height`), read at index 0.
    Singleton,
}

/// One variable of a `(time, lat, lon)` or `(lat, lon)` NetCDF dataset.
///
/// Longitudes are normalized into `[-180, 180)` when the axis is read, so
/// datasets stored on a 0..360 grid clip with ordinary WGS84 boxes. Extra
/// singleton dimensions, such as a one-level `height`, are squeezed out.
pub struct ClimateCube {
    file: netcdf::File,
    source: String,
    variable: String,
    layout: Vec<Dim>,
    lat: Axis,
    lon: Axis,
    time: Option<Vec<f64>>,
}

impl std::fmt::Debug for ClimateCube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClimateCube")
            .field("source", &self.source)
            .field("variable", &self.variable)
            .field("lat", &self.lat.values.len())
            .field("lon", &self.lon.values.len())
            .field("time", &self.time.as_ref().map(Vec::len))
            .finish()
    }
}

impl ClimateCube {
    /// Open `variable` from a local path or an OPeNDAP URL.
    pub fn open(source: &str, variable: &str) -> Result<Self> {
        info!("Opening {} from {}", variable, source);
        let file = netcdf::open(source)?;

        let (layout, lat, lon, time) = {
            let var = file
                .variable(variable)
                .ok_or_else(|| RasterError::MissingVariable(variable.to_string()))?;

            let dims: Vec<(String, usize)> = var
                .dimensions()
                .iter()
                .map(|d| (d.name(), d.len()))
                .collect();
            let layout = dim_layout(variable, &dims)?;
            let has_time = layout.contains(&Dim::Time);

            let lat = Axis::read(&file, LAT)?;
            let mut lon = Axis::read(&file, LON)?;
            if !lon.ascending() {
                return Err(RasterError::InvalidAxis {
                    axis: LON.to_string(),
                    reason: "values must increase".to_string(),
                });
            }
            for v in lon.values.iter_mut() {
                *v = convert_lonlat(*v);
            }
            let time = if has_time {
                Some(read_coordinates(&file, TIME)?)
            } else {
                None
            };
            (layout, lat, lon, time)
        };

        Ok(Self {
            file,
            source: source.to_string(),
            variable: variable.to_string(),
            layout,
            lat,
            lon,
            time,
        })
    }

    /// Variable name.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Time coordinate values, empty for 2-D variables.
    pub fn times(&self) -> &[f64] {
        self.time.as_deref().unwrap_or(&[])
    }

    /// Cell-edge bounds of the whole grid.
    pub fn bounds(&self) -> Result<BoundingBox> {
        let (lon_lo, lon_hi) = self.lon.edges(0..self.lon.values.len());
        let (lat_lo, lat_hi) = self.lat.edges(0..self.lat.values.len());
        Ok(BoundingBox::new(lon_lo, lat_lo, lon_hi, lat_hi)?)
    }

    /// Read the cells intersecting `clip`, every time step, as a stack.
    ///
    /// Only the index window covering the box is requested from the source.
    /// Fill and missing values become NaN and CF packing attributes are
    /// applied. Rows run north to south.
    pub fn clip_box(&self, clip: &BoundingBox) -> Result<RasterStack> {
        let no_overlap = || RasterError::NoOverlap {
            min_lon: clip.min_lon,
            min_lat: clip.min_lat,
            max_lon: clip.max_lon,
            max_lat: clip.max_lat,
        };
        let lats = self
            .lat
            .select(LAT, clip.min_lat, clip.max_lat)?
            .ok_or_else(no_overlap)?;
        let lons = self
            .lon
            .select(LON, clip.min_lon, clip.max_lon)?
            .ok_or_else(no_overlap)?;

        let var = self
            .file
            .variable(&self.variable)
            .ok_or_else(|| RasterError::MissingVariable(self.variable.clone()))?;

        let height = lats.len();
        let width = lons.len();
        let window: Vec<Range<usize>> = self
            .layout
            .iter()
            .map(|dim| match dim {
                Dim::Time => 0..self.times().len(),
                Dim::Lat => lats.clone(),
                Dim::Lon => lons.clone(),
                Dim::Singleton => 0..1,
            })
            .collect();
        let raw = read_window(&var, &window)?;
        let labels = match &self.time {
            Some(time) => time.clone(),
            None => vec![0.0],
        };
        debug!(
            "Read {} samples ({} layers of {}x{}) from {}",
            raw.len(),
            labels.len(),
            width,
            height,
            self.source
        );

        let packing = Packing::from_variable(&var);
        let mut data: Vec<f32> = raw.into_iter().map(|v| packing.unpack(v)).collect();

        // Stored south to north: flip each layer
        if self.lat.ascending() {
            for layer in data.chunks_mut(width * height) {
                let rows: Vec<&[f32]> = layer.chunks(width).rev().collect();
                let flipped: Vec<f32> = rows.concat();
                layer.copy_from_slice(&flipped);
            }
        }

        let (lon_lo, lon_hi) = self.lon.edges(lons);
        let (lat_lo, lat_hi) = self.lat.edges(lats);
        let bounds = BoundingBox::new(lon_lo, lat_lo, lon_hi, lat_hi)?;

        RasterStack::from_cube(data, width, height, labels, bounds, Some(Crs::Wgs84))
    }
}

/// Classify dimensions: `lat`, `lon` innermost, an optional leading `time`,
/// anything else only if it has length 1.
fn dim_layout(variable: &str, dims: &[(String, usize)]) -> Result<Vec<Dim>> {
    let unsupported = || RasterError::UnsupportedLayout {
        variable: variable.to_string(),
        dims: dims.iter().map(|(name, _)| name.clone()).collect(),
    };

    let n = dims.len();
    if n < 2 || n > MAX_DIMS || dims[n - 2].0 != LAT || dims[n - 1].0 != LON {
        return Err(unsupported());
    }

    let mut roles = Vec::with_capacity(n);
    for (i, (name, len)) in dims[..n - 2].iter().enumerate() {
        let role = if i == 0 && name == TIME {
            Dim::Time
        } else if *len == 1 {
            Dim::Singleton
        } else {
            return Err(unsupported());
        };
        roles.push(role);
    }
    roles.extend([Dim::Lat, Dim::Lon]);
    Ok(roles)
}

/// Read one hyperslab, one range per dimension.
fn read_window(var: &netcdf::Variable<'_>, window: &[Range<usize>]) -> Result<Vec<f32>> {
    let values = match window {
        [a, b] => var.get_values::<f32, _>((a.clone(), b.clone()))?,
        [a, b, c] => var.get_values::<f32, _>((a.clone(), b.clone(), c.clone()))?,
        [a, b, c, d] => {
            var.get_values::<f32, _>((a.clone(), b.clone(), c.clone(), d.clone()))?
        }
        _ => {
            return Err(RasterError::UnsupportedLayout {
                variable: var.name(),
                dims: vec![format!("{} dimensions", window.len())],
            })
        }
    };
    Ok(values)
}

/// CF `_FillValue`/`missing_value` masking and `scale_factor`/`add_offset`.
struct Packing {
    fill: Option<f32>,
    missing: Option<f32>,
    scale: f64,
    offset: f64,
}

impl Packing {
    fn from_variable(var: &netcdf::Variable<'_>) -> Self {
        Self {
            fill: numeric_attribute(var, "_FillValue").map(|v| v as f32),
            missing: numeric_attribute(var, "missing_value").map(|v| v as f32),
            scale: numeric_attribute(var, "scale_factor").unwrap_or(1.0),
            offset: numeric_attribute(var, "add_offset").unwrap_or(0.0),
        }
    }

    fn unpack(&self, raw: f32) -> f32 {
        if raw.is_nan() || Some(raw) == self.fill || Some(raw) == self.missing {
            return f32::NAN;
        }
        (raw as f64 * self.scale + self.offset) as f32
    }
}

fn numeric_attribute(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(v as f64),
        AttributeValue::Int(v) => Some(v as f64),
        AttributeValue::Short(v) => Some(v as f64),
        AttributeValue::Ushort(v) => Some(v as f64),
        AttributeValue::Uint(v) => Some(v as f64),
        AttributeValue::Schar(v) => Some(v as f64),
        AttributeValue::Uchar(v) => Some(v as f64),
        _ => None,
    }
}

fn read_coordinates(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
    let var = file.variable(name).ok_or_else(|| RasterError::InvalidAxis {
        axis: name.to_string(),
        reason: "coordinate variable not found".to_string(),
    })?;
    Ok(var.get_values::<f64, _>(..)?)
}

/// A regular spatial axis of cell centers.
#[derive(Debug, Clone)]
struct Axis {
    values: Vec<f64>,
    /// Half the cell size, from the axis as stored.
    half: f64,
}

impl Axis {
    /// Read an axis of at least two monotonic points.
    fn read(file: &netcdf::File, name: &str) -> Result<Self> {
        let values = read_coordinates(file, name)?;
        Self::new(name, values)
    }

    fn new(name: &str, values: Vec<f64>) -> Result<Self> {
        if values.len() < 2 {
            return Err(RasterError::InvalidAxis {
                axis: name.to_string(),
                reason: format!("{} points, need at least 2", values.len()),
            });
        }
        let ascending = values[1] > values[0];
        let monotonic = values
            .windows(2)
            .all(|w| if ascending { w[1] > w[0] } else { w[1] < w[0] });
        if !monotonic {
            return Err(RasterError::InvalidAxis {
                axis: name.to_string(),
                reason: "values are not monotonic".to_string(),
            });
        }
        let half = (values[1] - values[0]).abs() / 2.0;
        Ok(Self { values, half })
    }

    fn ascending(&self) -> bool {
        self.values[1] > self.values[0]
    }

    /// Outer cell edges of `values[range]`.
    fn edges(&self, range: Range<usize>) -> (f64, f64) {
        let half = self.half;
        self.values[range]
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v - half), hi.max(v + half))
            })
    }

    /// Contiguous index range of cells whose extent overlaps `[lo, hi]`.
    ///
    /// `None` when nothing overlaps. A zero-width range on a cell edge keeps
    /// the cell above the edge (the one below at the grid's top edge), so
    /// point and line boxes select at least one cell. A selection that is not
    /// contiguous (a box spanning the seam of a normalized 0..360 grid) is an
    /// error.
    fn select(&self, axis: &str, lo: f64, hi: f64) -> Result<Option<Range<usize>>> {
        let half = self.half;
        let overlaps = |v: f64| {
            if lo < hi {
                v + half > lo && v - half < hi
            } else {
                v - half <= lo && lo < v + half
            }
        };
        let mut selected: Vec<usize> = self
            .values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| overlaps(v))
            .map(|(i, _)| i)
            .collect();
        if selected.is_empty() && lo == hi {
            // On the outer edge of the last cell
            selected = self
                .values
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v + half == lo)
                .map(|(i, _)| i)
                .collect();
        }

        let (Some(&first), Some(&last)) = (selected.first(), selected.last()) else {
            return Ok(None);
        };
        if last - first + 1 != selected.len() {
            return Err(RasterError::InvalidAxis {
                axis: axis.to_string(),
                reason: format!("clip range {}..{} crosses the grid seam", lo, hi),
            });
        }
        Ok(Some(first..last + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(values: &[f64]) -> Axis {
        Axis::new("test", values.to_vec()).unwrap()
    }

    #[test]
    fn test_select_cells_by_extent() {
        let centers = axis(&[0.5, 1.5, 2.5, 3.5]);
        assert_eq!(centers.select(LON, 1.2, 2.8).unwrap(), Some(1..3));
        assert_eq!(centers.select(LON, 1.0, 2.0).unwrap(), Some(1..2));
        assert_eq!(centers.select(LON, 5.0, 6.0).unwrap(), None);

        // Descending axis selects the same cells
        let descending = axis(&[3.5, 2.5, 1.5, 0.5]);
        assert_eq!(descending.select(LAT, 1.2, 2.8).unwrap(), Some(1..3));
    }

    #[test]
    fn test_select_cells_across_seam() {
        // 0..360 grid; normalization wraps it between index 1 and 2
        let mut lon = axis(&[90.0, 150.0, 210.0, 270.0]);
        for v in lon.values.iter_mut() {
            *v = convert_lonlat(*v);
        }
        assert_eq!(lon.values, vec![90.0, 150.0, -150.0, -90.0]);

        assert!(lon.select(LON, -160.0, 100.0).is_err());
        assert_eq!(lon.select(LON, -160.0, -140.0).unwrap(), Some(2..3));
    }

    #[test]
    fn test_select_degenerate_range_on_edge() {
        let centers = axis(&[0.5, 1.5, 2.5, 3.5]);
        // Point on the edge between cells 0 and 1
        assert_eq!(centers.select(LON, 1.0, 1.0).unwrap(), Some(1..2));
        assert_eq!(centers.select(LON, 1.2, 1.2).unwrap(), Some(1..2));
        // Outer edges of the grid
        assert_eq!(centers.select(LON, 0.0, 0.0).unwrap(), Some(0..1));
        assert_eq!(centers.select(LON, 4.0, 4.0).unwrap(), Some(3..4));
        assert_eq!(centers.select(LON, 4.5, 4.5).unwrap(), None);

        let descending = axis(&[3.5, 2.5, 1.5, 0.5]);
        assert_eq!(descending.select(LAT, 2.0, 2.0).unwrap(), Some(1..2));
    }

    #[test]
    fn test_layout_squeezes_singletons() {
        let dims = |d: &[(&str, usize)]| -> Vec<(String, usize)> {
            d.iter().map(|(n, l)| (n.to_string(), *l)).collect()
        };

        assert_eq!(
            dim_layout("pr", &dims(&[("time", 12), ("height", 1), ("lat", 3), ("lon", 4)])).unwrap(),
            vec![Dim::Time, Dim::Singleton, Dim::Lat, Dim::Lon]
        );
        assert_eq!(
            dim_layout("pr", &dims(&[("height", 1), ("lat", 3), ("lon", 4)])).unwrap(),
            vec![Dim::Singleton, Dim::Lat, Dim::Lon]
        );
        assert_eq!(
            dim_layout("pr", &dims(&[("time", 1), ("lat", 3), ("lon", 4)])).unwrap(),
            vec![Dim::Time, Dim::Lat, Dim::Lon]
        );

        assert!(dim_layout("pr", &dims(&[("time", 12), ("height", 2), ("lat", 3), ("lon", 4)])).is_err());
        assert!(dim_layout("pr", &dims(&[("lon", 4), ("lat", 3)])).is_err());
        assert!(dim_layout("pr", &dims(&[("lat", 3), ("lon", 4), ("height", 1)])).is_err());
        assert!(dim_layout(
            "pr",
            &dims(&[("a", 1), ("b", 1), ("c", 1), ("lat", 3), ("lon", 4)])
        )
        .is_err());
    }

    #[test]
    fn test_axis_rejects_bad_values() {
        assert!(Axis::new(LAT, vec![1.0]).is_err());
        assert!(Axis::new(LAT, vec![1.0, 2.0, 1.5]).is_err());
    }

    #[test]
    fn test_edges() {
        let centers = axis(&[0.5, 1.5, 2.5]);
        assert_eq!(centers.edges(0..3), (0.0, 3.0));
        assert_eq!(centers.edges(1..2), (1.0, 2.0));
    }
}
