//! # habitat-grid
//!
//! Tile enumeration and URL templating for gridded environmental datasets.
//!
//! This crate turns a geographic bounding box into the set of one-degree
//! tiles covering it, and maps each tile (or each year window) to the URL of
//! a remote dataset:
//! - POLARIS soil properties, one GeoTIFF per one-degree cell
//! - MACAv2 monthly climate projections, one NetCDF file per five-year window
//!
//! Nothing in this crate touches the network. Every function is a pure
//! function of its arguments.
//!
//! ## Tiles
//!
//! A tile is identified by the integer longitude/latitude of its lower-left
//! (south-west) corner. For a box spanning `-105.3..-104.1` longitude and
//! `39.5..40.2` latitude the covering tiles are `lon-106lat39`,
//! `lon-106lat40`, `lon-105lat39` and `lon-105lat40`.
//!
//! ## Example
//!
//! ```
//! use habitat_grid::{soil_url_map, BoundingBox, SoilDescriptor};
//!
//! let bbox = BoundingBox::new(-105.3, 39.5, -104.1, 40.2)?;
//! let urls = soil_url_map(&bbox, &SoilDescriptor::default())?;
//!
//! assert_eq!(urls.len(), 4);
//! assert!(urls["lon-106lat39"][0].ends_with("/sand/mean/100_200/lat3940_lon-106-105.tif"));
//! # Ok::<(), habitat_grid::GridError>(())
//! ```

mod bbox;
mod error;
mod lonlat;
mod template;
mod tile;

pub use bbox::BoundingBox;
pub use error::GridError;
pub use lonlat::convert_lonlat;
pub use template::{
    climate_url, soil_url, soil_url_map, ClimateDescriptor, ClimateWindow, SoilDescriptor,
    CLIMATE_WINDOW_YEARS, MACA_BASE_URL, POLARIS_BASE_URL,
};
pub use tile::{tile_url_map, tiles_for_bbox, TileCoord, TileUrls};

/// Result type for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
