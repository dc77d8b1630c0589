#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod geometry;
pub mod polygonize;
pub mod tensor;
pub mod writer;

// Building blocks shared by the pipelines; public for tools and tests.
pub mod angle;
pub mod crossfield;
pub mod image;
pub mod mask;
pub mod raster;
pub mod vector;

// --- High-level re-exports -------------------------------------------------

// Polygonization entry points.
pub use crate::polygonize::{
    PolygonSet, Polygonizer, PolygonizerConfig, PolygonizerProcessor, ProcessContext,
};
pub use crate::tensor::{CrossfieldBatch, Prediction, SegmentationBatch};

// Batch execution and reports.
pub use crate::diagnostics::{RunReport, UnitSummary};
pub use crate::executor::{BatchExecutor, BatchReport, ExecutionMode, WorkUnit};

pub use crate::error::Error;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use frame_field_polygonizer::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (w, h) = (64usize, 64usize);
/// let mut seg = ImageF32::new(w, h);
/// for y in 16..48 {
///     for x in 16..48 {
///         seg.set(x, y, 1.0);
///     }
/// }
///
/// let polygonizer = Polygonizer::from_config(&PolygonizerConfig::default())?;
/// let out = polygonizer.polygonize(&seg, None)?;
/// println!("polygons={} total_ms={:.3}", out.polygons.len(), out.timings.total_ms);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::crossfield::Crossfield;
    pub use crate::image::ImageF32;
    pub use crate::{Polygonizer, PolygonizerConfig};
}
