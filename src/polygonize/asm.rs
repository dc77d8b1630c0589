use super::contour::extract_polygons;
use super::graph::{remove_shallow_turns, ContourGraph};
use super::optimize::refine_graphs;
use super::options::AsmOptions;
use super::simplify::simplify_polygons;
use super::PolygonizeOutput;
use crate::crossfield::Crossfield;
use crate::diagnostics::TimingBreakdown;
use crate::error::ConfigError;
use crate::image::ImageF32;
use std::time::Instant;

/// Active skeleton model. Traced rings are decimated into a skeleton whose
/// nearby vertices are shared between footprints, refined per connected
/// component, then read back with near-collinear vertices removed.
#[derive(Clone, Debug, PartialEq)]
pub struct AsmPolygonizer {
    opts: AsmOptions,
}

impl AsmPolygonizer {
    pub fn new(opts: AsmOptions) -> Result<Self, ConfigError> {
        opts.validate()?;
        Ok(Self { opts })
    }

    pub fn options(&self) -> &AsmOptions {
        &self.opts
    }

    pub fn polygonize(&self, seg: &ImageF32, crossfield: &Crossfield) -> PolygonizeOutput {
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();

        let start = Instant::now();
        let raw = extract_polygons(seg, self.opts.threshold);
        timings.push("extract", start.elapsed().as_secs_f64() * 1000.0);

        let start = Instant::now();
        let skeleton = ContourGraph::skeleton(
            &raw,
            self.opts.tolerance,
            self.opts.skeleton_vertex_budget,
            self.opts.junction_snap,
        );
        log::debug!(
            "asm: skeleton of {} polygons has {} nodes, {} edges",
            raw.len(),
            skeleton.nodes.len(),
            skeleton.edges.len()
        );
        timings.push("skeleton", start.elapsed().as_secs_f64() * 1000.0);

        let start = Instant::now();
        let params = self.opts.refine_params();
        let (components, report) =
            refine_graphs(skeleton.into_components(), seg, crossfield, &params);
        let angle_tol = self.opts.angle_tolerance_deg.to_radians();
        let mut rebuilt: Vec<_> = components
            .iter()
            .flat_map(|g| g.to_polygons_with(|ring| remove_shallow_turns(ring, angle_tol)))
            .collect();
        rebuilt.sort_by_key(|(idx, _)| *idx);
        timings.push("refine", start.elapsed().as_secs_f64() * 1000.0);

        let start = Instant::now();
        let polygons = simplify_polygons(
            rebuilt.into_iter().map(|(_, p)| p).collect(),
            self.opts.tolerance,
            self.opts.min_area,
        );
        timings.push("simplify", start.elapsed().as_secs_f64() * 1000.0);

        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        PolygonizeOutput {
            polygons,
            refine: Some(report),
            timings,
        }
    }
}
