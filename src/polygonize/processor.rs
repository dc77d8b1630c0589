//! Batch entry point: one work unit per batch element, each running
//! polygonize → [to world] → write.
use super::{PolygonSet, Polygonizer};
use crate::crossfield::Crossfield;
use crate::diagnostics::UnitSummary;
use crate::error::{Error, PolygonizeError};
use crate::executor::{BatchExecutor, BatchReport, ExecutionMode, WorkUnit};
use crate::geometry::GeoTransform;
use crate::image::ImageF32;
use crate::tensor::Prediction;
use crate::writer::DataWriter;
use std::sync::Arc;
use std::time::Instant;

/// Per-call context shared by every element of a batch.
#[derive(Clone, Debug, Default)]
pub struct ProcessContext {
    pub transform: GeoTransform,
    pub crs: Option<String>,
    /// One name per batch element; empty means "use the element index".
    pub names: Vec<String>,
    pub convert_to_world_coords: bool,
}

/// Everything one unit needs, owned by that unit.
#[derive(Clone, Debug)]
pub struct UnitInput {
    pub seg: ImageF32,
    pub crossfield: Option<Crossfield>,
    pub transform: GeoTransform,
    pub crs: Option<String>,
}

pub struct PolygonizerProcessor {
    polygonizer: Polygonizer,
    writer: Arc<dyn DataWriter<PolygonSet>>,
    executor: BatchExecutor,
}

impl PolygonizerProcessor {
    pub fn new(
        polygonizer: Polygonizer,
        writer: Arc<dyn DataWriter<PolygonSet>>,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            polygonizer,
            writer,
            executor: BatchExecutor::new(mode),
        }
    }

    pub fn polygonizer(&self) -> &Polygonizer {
        &self.polygonizer
    }

    /// Validate the batch, then polygonize and write every element.
    ///
    /// Shape errors abort before any unit runs. Failures of individual
    /// units are logged and listed in the report.
    pub fn process(
        &self,
        prediction: &Prediction,
        ctx: &ProcessContext,
    ) -> Result<BatchReport<UnitSummary>, PolygonizeError> {
        prediction.validate()?;
        if self.polygonizer.requires_crossfield() && prediction.crossfield.is_none() {
            return Err(PolygonizeError::MissingCrossfield(self.polygonizer.method()));
        }
        let batch = prediction.seg.batch_size();
        if !ctx.names.is_empty() && ctx.names.len() != batch {
            return Err(PolygonizeError::BatchNameMismatch {
                names: ctx.names.len(),
                batch,
            });
        }

        let units = (0..batch)
            .map(|b| {
                let name = ctx.names.get(b).cloned().unwrap_or_else(|| b.to_string());
                WorkUnit::new(
                    name,
                    UnitInput {
                        seg: prediction.seg.interior(b),
                        crossfield: prediction.crossfield.as_ref().map(|cf| cf.element(b)),
                        transform: ctx.transform,
                        crs: ctx.crs.clone(),
                    },
                )
            })
            .collect();
        Ok(self.process_units(units, ctx.convert_to_world_coords))
    }

    /// Run prepared units, e.g. images with their own georeferencing.
    pub fn process_units(
        &self,
        units: Vec<WorkUnit<UnitInput>>,
        convert_to_world_coords: bool,
    ) -> BatchReport<UnitSummary> {
        self.executor.run(units, |name, input| {
            self.run_unit(name, input, convert_to_world_coords)
        })
    }

    fn run_unit(
        &self,
        name: &str,
        input: UnitInput,
        convert_to_world_coords: bool,
    ) -> Result<UnitSummary, Error> {
        let out = self
            .polygonizer
            .polygonize(&input.seg, input.crossfield.as_ref())?;
        let mut timings = out.timings;
        let mut set =
            PolygonSet::new(name, out.polygons, input.transform).with_crs(input.crs);
        if convert_to_world_coords {
            set = set.into_world();
        }
        let polygons = set.len();
        let vertices = set.vertex_count();

        let start = Instant::now();
        self.writer.write_data(set)?;
        let write_ms = start.elapsed().as_secs_f64() * 1000.0;
        timings.push("write", write_ms);
        timings.total_ms += write_ms;

        Ok(UnitSummary {
            name: name.to_string(),
            polygons,
            vertices,
            refine: out.refine,
            timings,
        })
    }
}
