use super::contour::extract_polygons;
use super::options::SimpleOptions;
use super::simplify::simplify_polygons;
use super::PolygonizeOutput;
use crate::diagnostics::TimingBreakdown;
use crate::error::ConfigError;
use crate::image::ImageF32;
use std::time::Instant;

/// Threshold, trace, simplify. No iteration, so identical input always
/// yields identical polygons.
#[derive(Clone, Debug, PartialEq)]
pub struct SimplePolygonizer {
    opts: SimpleOptions,
}

impl SimplePolygonizer {
    pub fn new(opts: SimpleOptions) -> Result<Self, ConfigError> {
        opts.validate()?;
        Ok(Self { opts })
    }

    pub fn options(&self) -> &SimpleOptions {
        &self.opts
    }

    pub fn polygonize(&self, seg: &ImageF32) -> PolygonizeOutput {
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();

        let start = Instant::now();
        let raw = extract_polygons(seg, self.opts.threshold);
        timings.push("extract", start.elapsed().as_secs_f64() * 1000.0);

        let start = Instant::now();
        let polygons = simplify_polygons(raw, self.opts.tolerance, self.opts.min_area);
        timings.push("simplify", start.elapsed().as_secs_f64() * 1000.0);

        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        PolygonizeOutput {
            polygons,
            refine: None,
            timings,
        }
    }
}
