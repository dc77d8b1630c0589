use super::contour::extract_polygons;
use super::graph::ContourGraph;
use super::optimize::refine_graphs;
use super::options::AcmOptions;
use super::simplify::simplify_polygons;
use super::PolygonizeOutput;
use crate::crossfield::Crossfield;
use crate::diagnostics::TimingBreakdown;
use crate::error::ConfigError;
use crate::image::ImageF32;
use std::time::Instant;

/// Active contour model. Each traced polygon becomes its own dense graph and
/// is refined independently.
#[derive(Clone, Debug, PartialEq)]
pub struct AcmPolygonizer {
    opts: AcmOptions,
}

impl AcmPolygonizer {
    pub fn new(opts: AcmOptions) -> Result<Self, ConfigError> {
        opts.validate()?;
        Ok(Self { opts })
    }

    pub fn options(&self) -> &AcmOptions {
        &self.opts
    }

    pub fn polygonize(&self, seg: &ImageF32, crossfield: &Crossfield) -> PolygonizeOutput {
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();

        let start = Instant::now();
        let raw = extract_polygons(seg, self.opts.threshold);
        timings.push("extract", start.elapsed().as_secs_f64() * 1000.0);

        let start = Instant::now();
        let graphs: Vec<ContourGraph> = raw
            .iter()
            .map(|p| ContourGraph::from_polygons(std::slice::from_ref(p)))
            .collect();
        let params = self.opts.refine_params();
        let (graphs, report) = refine_graphs(graphs, seg, crossfield, &params);
        let refined: Vec<_> = graphs
            .iter()
            .flat_map(|g| g.to_polygons().into_iter().map(|(_, poly)| poly))
            .collect();
        timings.push("refine", start.elapsed().as_secs_f64() * 1000.0);

        let start = Instant::now();
        let polygons = simplify_polygons(refined, self.opts.tolerance, self.opts.min_area);
        timings.push("simplify", start.elapsed().as_secs_f64() * 1000.0);

        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        PolygonizeOutput {
            polygons,
            refine: Some(report),
            timings,
        }
    }
}
