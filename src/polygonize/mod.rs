//! Raster-to-vector polygonization.
//!
//! Every strategy walks the same states: validate the inputs, EXTRACT
//! polygons from the probability plane with marching squares, REFINE them
//! (ACM and ASM only), SIMPLIFY, and optionally map them to world
//! coordinates. [`Polygonizer`] is the single entry point for one image;
//! [`PolygonizerProcessor`] fans a whole batch out through the executor and
//! hands each result to a data writer.
pub mod acm;
pub mod asm;
pub mod contour;
pub mod graph;
pub mod optimize;
pub mod options;
pub mod processor;
pub mod simple;
pub mod simplify;

pub use self::acm::AcmPolygonizer;
pub use self::asm::AsmPolygonizer;
pub use self::optimize::RefineReport;
pub use self::options::{AcmOptions, AsmOptions, PolygonizerConfig, SimpleOptions};
pub use self::processor::{PolygonizerProcessor, ProcessContext, UnitInput};
pub use self::simple::SimplePolygonizer;

use crate::crossfield::Crossfield;
use crate::diagnostics::TimingBreakdown;
use crate::error::{ConfigError, PolygonizeError};
use crate::geometry::GeoTransform;
use crate::image::ImageF32;
use geo::{CoordsIter, Geometry, Polygon};

/// Polygons extracted from one image or tile.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonSet {
    /// Provenance: source file stem or tile id.
    pub name: String,
    pub polygons: Vec<Polygon<f64>>,
    /// Pixel→world mapping of the source raster.
    pub transform: GeoTransform,
    pub crs: Option<String>,
    /// True once `polygons` are expressed in world coordinates.
    pub world_coords: bool,
}

impl PolygonSet {
    pub fn new(name: impl Into<String>, polygons: Vec<Polygon<f64>>, transform: GeoTransform) -> Self {
        Self {
            name: name.into(),
            polygons,
            transform,
            crs: None,
            world_coords: false,
        }
    }

    pub fn with_crs(mut self, crs: Option<String>) -> Self {
        self.crs = crs;
        self
    }

    /// Map pixel coordinates through the transform. No-op when already done.
    pub fn into_world(mut self) -> Self {
        if !self.world_coords {
            self.polygons = self
                .polygons
                .iter()
                .map(|p| self.transform.map_polygon(p))
                .collect();
            self.world_coords = true;
        }
        self
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(|p| p.coords_count()).sum()
    }

    pub fn geometries(&self) -> Vec<Geometry<f64>> {
        self.polygons.iter().cloned().map(Geometry::Polygon).collect()
    }
}

/// Output of a single polygonization call.
#[derive(Clone, Debug, Default)]
pub struct PolygonizeOutput {
    pub polygons: Vec<Polygon<f64>>,
    pub refine: Option<RefineReport>,
    pub timings: TimingBreakdown,
}

/// Strategy selected by configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum Polygonizer {
    Simple(SimplePolygonizer),
    Acm(AcmPolygonizer),
    Asm(AsmPolygonizer),
}

impl Polygonizer {
    pub fn from_config(cfg: &PolygonizerConfig) -> Result<Self, ConfigError> {
        Ok(match cfg {
            PolygonizerConfig::Simple(o) => Self::Simple(SimplePolygonizer::new(o.clone())?),
            PolygonizerConfig::Acm(o) => Self::Acm(AcmPolygonizer::new(o.clone())?),
            PolygonizerConfig::Asm(o) => Self::Asm(AsmPolygonizer::new(o.clone())?),
        })
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Simple(_) => "simple",
            Self::Acm(_) => "acm",
            Self::Asm(_) => "asm",
        }
    }

    pub fn requires_crossfield(&self) -> bool {
        !matches!(self, Self::Simple(_))
    }

    pub fn threshold(&self) -> f32 {
        match self {
            Self::Simple(p) => p.options().threshold,
            Self::Acm(p) => p.options().threshold,
            Self::Asm(p) => p.options().threshold,
        }
    }

    /// Polygonize one probability plane, in pixel coordinates.
    ///
    /// An all-background plane is a valid, empty result. Errors are returned
    /// for non-finite probabilities, a crossfield whose size differs from the
    /// plane, or a missing crossfield when the strategy needs one.
    pub fn polygonize(
        &self,
        seg: &ImageF32,
        crossfield: Option<&Crossfield>,
    ) -> Result<PolygonizeOutput, PolygonizeError> {
        let bad = seg.count_non_finite();
        if bad > 0 {
            return Err(PolygonizeError::NonFiniteInput { count: bad });
        }
        if let Some(cf) = crossfield {
            if cf.width() != seg.w || cf.height() != seg.h {
                return Err(PolygonizeError::ShapeMismatch {
                    seg: [1, 1, seg.h, seg.w],
                    crossfield: [1, 4, cf.height(), cf.width()],
                });
            }
        }
        let crossfield = match (self.requires_crossfield(), crossfield) {
            (true, None) => return Err(PolygonizeError::MissingCrossfield(self.method())),
            (_, cf) => cf,
        };

        if seg.is_below(self.threshold()) {
            log::debug!("{}: {}x{} plane has no foreground", self.method(), seg.w, seg.h);
            return Ok(PolygonizeOutput::default());
        }

        log::debug!("{}: polygonizing {}x{} plane", self.method(), seg.w, seg.h);
        let out = match (self, crossfield) {
            (Self::Simple(p), _) => p.polygonize(seg),
            (Self::Acm(p), Some(cf)) => p.polygonize(seg, cf),
            (Self::Asm(p), Some(cf)) => p.polygonize(seg, cf),
            (_, None) => return Err(PolygonizeError::MissingCrossfield(self.method())),
        };
        log::debug!(
            "{}: {} polygons, {} vertices in {:.2} ms",
            self.method(),
            out.polygons.len(),
            out.polygons.iter().map(|p| p.coords_count()).sum::<usize>(),
            out.timings.total_ms
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn acm_without_crossfield_is_rejected() {
        let p = Polygonizer::from_config(&PolygonizerConfig::Acm(AcmOptions::default())).unwrap();
        let seg = ImageF32::new(8, 8);
        assert!(matches!(
            p.polygonize(&seg, None),
            Err(PolygonizeError::MissingCrossfield("acm"))
        ));
    }

    #[test]
    fn crossfield_size_must_match() {
        let p = Polygonizer::from_config(&PolygonizerConfig::default()).unwrap();
        let seg = ImageF32::new(8, 8);
        let cf = Crossfield::uniform(8, 9, 0.0, FRAC_PI_2);
        assert!(matches!(
            p.polygonize(&seg, Some(&cf)),
            Err(PolygonizeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn nan_input_is_a_polygonization_error() {
        let p = Polygonizer::from_config(&PolygonizerConfig::default()).unwrap();
        let mut seg = ImageF32::new(4, 4);
        seg.set(1, 1, f32::NAN);
        assert!(matches!(
            p.polygonize(&seg, None),
            Err(PolygonizeError::NonFiniteInput { count: 1 })
        ));
    }

    #[test]
    fn world_conversion_uses_transform() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0)];
        let set = PolygonSet::new("t", vec![poly], GeoTransform::north_up(100.0, 50.0, 0.5, -0.5))
            .into_world();
        assert!(set.world_coords);
        let c = set.polygons[0].exterior().0[1];
        assert_eq!((c.x, c.y), (101.0, 50.0));
    }
}
