//! Merging rasters onto a common grid.

use crate::{Raster, RasterError, Result};
use tracing::debug;

/// Tolerance for treating a fractional pixel count as whole.
const GRID_EPSILON: f64 = 1e-6;

/// Merge rasters into one covering the union of their extents.
///
/// The output grid uses the first raster's resolution and is anchored at the
/// north-west corner of the union. Cells no input covers are NaN. Where inputs
/// overlap, the first raster holding a valid sample for a cell wins.
pub fn merge_rasters(rasters: &[Raster]) -> Result<Raster> {
    let first = rasters.first().ok_or(RasterError::EmptyMerge)?;

    if let Some(other) = rasters.iter().find(|r| r.crs() != first.crs()) {
        return Err(RasterError::CrsMismatch {
            expected: first.crs(),
            found: other.crs(),
        });
    }

    let bounds = rasters
        .iter()
        .skip(1)
        .fold(first.bounds(), |acc, r| acc.union(&r.bounds()));
    let (res_x, res_y) = first.resolution();
    let width = cells_along(bounds.width(), res_x);
    let height = cells_along(bounds.height(), res_y);

    debug!(
        "Merging {} rasters into {}x{} grid over {:?}",
        rasters.len(),
        width,
        height,
        bounds.total_bounds()
    );

    let mut data = vec![f32::NAN; width * height];
    for row in 0..height {
        let lat = bounds.max_lat - (row as f64 + 0.5) * res_y;
        for col in 0..width {
            let lon = bounds.min_lon + (col as f64 + 0.5) * res_x;
            data[row * width + col] = rasters
                .iter()
                .filter_map(|r| r.value_at(lon, lat))
                .find(|v| !v.is_nan())
                .unwrap_or(f32::NAN);
        }
    }

    // Snap the east and south edges to whole pixels.
    let grid_bounds = habitat_grid::BoundingBox::new(
        bounds.min_lon,
        bounds.max_lat - height as f64 * res_y,
        bounds.min_lon + width as f64 * res_x,
        bounds.max_lat,
    )?;

    let mut merged = Raster::new(data, width, height, grid_bounds)?;
    merged.set_crs(first.crs());
    Ok(merged)
}

fn cells_along(extent: f64, res: f64) -> usize {
    let cells = extent / res;
    let rounded = cells.round();
    let n = if (cells - rounded).abs() < GRID_EPSILON {
        rounded
    } else {
        cells.ceil()
    };
    (n as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Crs;
    use habitat_grid::BoundingBox;

    fn bbox(w: f64, s: f64, e: f64, n: f64) -> BoundingBox {
        BoundingBox::new(w, s, e, n).unwrap()
    }

    #[test]
    fn test_empty_merge() {
        assert!(matches!(merge_rasters(&[]), Err(RasterError::EmptyMerge)));
    }

    #[test]
    fn test_gap_is_nan() {
        let west = Raster::filled(2, 2, bbox(0.0, 0.0, 1.0, 1.0), 1.0).unwrap();
        let east = Raster::filled(2, 2, bbox(2.0, 0.0, 3.0, 1.0), 2.0).unwrap();

        let merged = merge_rasters(&[west, east]).unwrap();
        assert_eq!(merged.dimensions(), (6, 2));
        assert_eq!(merged.bounds().total_bounds(), [0.0, 0.0, 3.0, 1.0]);

        let row: Vec<f32> = merged.data()[..6].to_vec();
        assert_eq!(&row[..2], &[1.0, 1.0]);
        assert!(row[2].is_nan() && row[3].is_nan());
        assert_eq!(&row[4..], &[2.0, 2.0]);
    }

    #[test]
    fn test_overlap_is_first_write() {
        let a = Raster::filled(2, 2, bbox(0.0, 0.0, 1.0, 1.0), 1.0).unwrap();
        let b = Raster::filled(2, 2, bbox(0.5, 0.0, 1.5, 1.0), 2.0).unwrap();

        let merged = merge_rasters(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(merged.dimensions(), (3, 2));
        assert_eq!(&merged.data()[..3], &[1.0, 1.0, 2.0]);

        let reversed = merge_rasters(&[b, a]).unwrap();
        assert_eq!(&reversed.data()[..3], &[1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_nan_does_not_shadow_later_source() {
        let mut data = vec![1.0; 4];
        data[0] = f32::NAN;
        let a = Raster::new(data, 2, 2, bbox(0.0, 0.0, 1.0, 1.0)).unwrap();
        let b = Raster::filled(2, 2, bbox(0.0, 0.0, 1.0, 1.0), 5.0).unwrap();

        let merged = merge_rasters(&[a, b]).unwrap();
        assert_eq!(merged.data(), &[5.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_crs_mismatch() {
        let a = Raster::filled(1, 1, bbox(0.0, 0.0, 1.0, 1.0), 1.0)
            .unwrap()
            .with_crs(Crs::Wgs84);
        let b = Raster::filled(1, 1, bbox(1.0, 0.0, 2.0, 1.0), 1.0)
            .unwrap()
            .with_crs(Crs::WebMercator);

        assert!(matches!(
            merge_rasters(&[a, b]),
            Err(RasterError::CrsMismatch { .. })
        ));
    }
}
