//! Single-band rasters and layer stacks.

use crate::{Crs, RasterError, Result};
use habitat_grid::BoundingBox;

/// Edge tolerance, in pixels, when snapping a clip box to the grid.
const SNAP_EPSILON: f64 = 1e-9;

/// A single-band raster with geographic bounds.
///
/// Samples are stored row-major, north to south and west to east. Missing
/// samples are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    data: Vec<f32>,
    width: usize,
    height: usize,
    bounds: BoundingBox,
    crs: Option<Crs>,
}

impl Raster {
    /// Build a raster from row-major samples.
    pub fn new(data: Vec<f32>, width: usize, height: usize, bounds: BoundingBox) -> Result<Self> {
        let expected = width * height;
        if data.len() != expected || expected == 0 {
            return Err(RasterError::ShapeMismatch {
                width,
                height,
                layers: 1,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            bounds,
            crs: None,
        })
    }

    /// Build a raster with every sample set to `value`.
    pub fn filled(width: usize, height: usize, bounds: BoundingBox, value: f32) -> Result<Self> {
        Self::new(vec![value; width * height], width, height, bounds)
    }

    /// Attach a CRS tag.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Replace the CRS tag.
    pub fn set_crs(&mut self, crs: Option<Crs>) {
        self.crs = crs;
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn crs(&self) -> Option<Crs> {
        self.crs
    }

    /// Raw samples in row-major order.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consume the raster and return its samples.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Pixel size `(x, y)` in CRS units.
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.bounds.width() / self.width as f64,
            self.bounds.height() / self.height as f64,
        )
    }

    /// Sample at pixel `(col, row)`, `None` outside the grid.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// Nearest-cell sample at a coordinate, `None` outside the bounds.
    ///
    /// Points on the east or south edge belong to the last column or row.
    pub fn value_at(&self, lon: f64, lat: f64) -> Option<f32> {
        if !self.bounds.contains(lon, lat) {
            return None;
        }
        let (res_x, res_y) = self.resolution();
        let col = ((lon - self.bounds.min_lon) / res_x).floor() as usize;
        let row = ((self.bounds.max_lat - lat) / res_y).floor() as usize;
        self.get(col.min(self.width - 1), row.min(self.height - 1))
    }

    /// Count of non-NaN samples.
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Restrict the raster to the cells intersecting `clip`.
    ///
    /// The result is snapped outward to whole pixels.
    pub fn clip_box(&self, clip: &BoundingBox) -> Result<Raster> {
        let window = PixelWindow::for_box(self.bounds, self.width, self.height, clip)?;
        let mut data = Vec::with_capacity(window.width() * window.height());
        for row in window.rows.clone() {
            let start = row * self.width;
            data.extend_from_slice(&self.data[start + window.cols.start..start + window.cols.end]);
        }
        Ok(Raster {
            data,
            width: window.width(),
            height: window.height(),
            bounds: window.bounds,
            crs: self.crs,
        })
    }
}

/// Pixel window of a grid selected by a clip box.
#[derive(Debug, Clone)]
pub(crate) struct PixelWindow {
    pub cols: std::ops::Range<usize>,
    pub rows: std::ops::Range<usize>,
    pub bounds: BoundingBox,
}

impl PixelWindow {
    pub(crate) fn for_box(
        bounds: BoundingBox,
        width: usize,
        height: usize,
        clip: &BoundingBox,
    ) -> Result<Self> {
        let no_overlap = || RasterError::NoOverlap {
            min_lon: clip.min_lon,
            min_lat: clip.min_lat,
            max_lon: clip.max_lon,
            max_lat: clip.max_lat,
        };
        if clip.min_lon > bounds.max_lon
            || clip.max_lon < bounds.min_lon
            || clip.min_lat > bounds.max_lat
            || clip.max_lat < bounds.min_lat
        {
            return Err(no_overlap());
        }

        let res_x = bounds.width() / width as f64;
        let res_y = bounds.height() / height as f64;

        // Columns count eastward from min_lon; rows count southward from max_lat.
        let cols = axis_window(
            clip.min_lon - bounds.min_lon,
            clip.max_lon - bounds.min_lon,
            res_x,
            width,
        )
        .ok_or_else(no_overlap)?;
        let rows = axis_window(
            bounds.max_lat - clip.max_lat,
            bounds.max_lat - clip.min_lat,
            res_y,
            height,
        )
        .ok_or_else(no_overlap)?;

        let window_bounds = BoundingBox::new(
            bounds.min_lon + cols.start as f64 * res_x,
            bounds.max_lat - rows.end as f64 * res_y,
            bounds.min_lon + cols.end as f64 * res_x,
            bounds.max_lat - rows.start as f64 * res_y,
        )?;

        Ok(Self {
            cols,
            rows,
            bounds: window_bounds,
        })
    }

    pub(crate) fn width(&self) -> usize {
        self.cols.len()
    }

    pub(crate) fn height(&self) -> usize {
        self.rows.len()
    }
}

/// Index range of cells overlapping `[lo, hi]`, offsets measured from the
/// grid origin in pixels of size `res`.
fn axis_window(lo: f64, hi: f64, res: f64, n: usize) -> Option<std::ops::Range<usize>> {
    if res.is_nan() || res <= 0.0 {
        return None;
    }
    let start = (lo / res + SNAP_EPSILON).floor().max(0.0);
    let end = (hi / res - SNAP_EPSILON).ceil().max(start + 1.0);
    let start = (start as usize).min(n);
    let end = (end as usize).min(n);
    if start >= end {
        return None;
    }
    Some(start..end)
}

/// Raster layers sharing one geometry, e.g. the months of a climate window.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStack {
    layers: Vec<Raster>,
    labels: Vec<f64>,
}

impl RasterStack {
    /// Build a stack. Every layer must share width, height, bounds and CRS,
    /// and there must be one label per layer.
    pub fn new(layers: Vec<Raster>, labels: Vec<f64>) -> Result<Self> {
        let first = layers.first().ok_or(RasterError::GeometryMismatch)?;
        if labels.len() != layers.len() {
            return Err(RasterError::ShapeMismatch {
                width: first.width,
                height: first.height,
                layers: layers.len(),
                expected: layers.len(),
                actual: labels.len(),
            });
        }
        let same_geometry = layers.iter().all(|l| {
            l.dimensions() == first.dimensions() && l.bounds == first.bounds && l.crs == first.crs
        });
        if !same_geometry {
            return Err(RasterError::GeometryMismatch);
        }
        Ok(Self { layers, labels })
    }

    /// Split a `(layer, row, col)` sample cube into a stack.
    pub fn from_cube(
        data: Vec<f32>,
        width: usize,
        height: usize,
        labels: Vec<f64>,
        bounds: BoundingBox,
        crs: Option<Crs>,
    ) -> Result<Self> {
        let layer_len = width * height;
        let expected = layer_len * labels.len();
        if data.len() != expected || expected == 0 {
            return Err(RasterError::ShapeMismatch {
                width,
                height,
                layers: labels.len(),
                expected,
                actual: data.len(),
            });
        }
        let layers = data
            .chunks(layer_len)
            .map(|chunk| {
                let mut layer = Raster::new(chunk.to_vec(), width, height, bounds)?;
                layer.set_crs(crs);
                Ok(layer)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(layers, labels)
    }

    pub fn layers(&self) -> &[Raster] {
        &self.layers
    }

    /// Per-layer labels (time coordinate values).
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.layers[0].dimensions()
    }

    pub fn bounds(&self) -> BoundingBox {
        self.layers[0].bounds
    }

    pub fn crs(&self) -> Option<Crs> {
        self.layers[0].crs
    }

    /// Clip every layer to `clip`.
    pub fn clip_box(&self, clip: &BoundingBox) -> Result<RasterStack> {
        let layers = self
            .layers
            .iter()
            .map(|l| l.clip_box(clip))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            layers,
            labels: self.labels.clone(),
        })
    }

    /// Per-cell mean over layers, skipping NaN. Cells with no valid sample
    /// stay NaN.
    pub fn mean_layer(&self) -> Raster {
        let first = &self.layers[0];
        let mut sums = vec![0.0f64; first.data.len()];
        let mut counts = vec![0u32; first.data.len()];

        for layer in &self.layers {
            for (i, &v) in layer.data.iter().enumerate() {
                if !v.is_nan() {
                    sums[i] += v as f64;
                    counts[i] += 1;
                }
            }
        }

        let data = sums
            .iter()
            .zip(&counts)
            .map(|(&s, &c)| if c == 0 { f32::NAN } else { (s / c as f64) as f32 })
            .collect();

        Raster {
            data,
            width: first.width,
            height: first.height,
            bounds: first.bounds,
            crs: first.crs,
        }
    }
}
