//! Raster reading, georeferencing sidecars, band statistics and burning
//! vector geometry into pixel masks.
pub mod profile;
pub mod rasterize;
pub mod stats;

pub use self::profile::{RasterDtype, RasterFile, RasterProfile};
pub use self::rasterize::{burn_geometries, burn_geometry};
pub use self::stats::{band_stats, BandStats};
