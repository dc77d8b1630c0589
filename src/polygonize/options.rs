//! Tunables for the three polygonization strategies.
//!
//! Every struct deserializes with `#[serde(default)]`, so a JSON config only
//! names the fields it overrides. Call `validate` once before use.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Simple strategy: threshold, contour, simplify.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleOptions {
    /// Probability cutoff; a pixel is foreground when strictly above it.
    pub threshold: f32,
    /// Simplification tolerance in pixels. Vertices spanning a triangle
    /// smaller than `tolerance²` with their neighbours are dropped.
    pub tolerance: f64,
    /// Polygons (and holes) with a smaller area in px² are dropped.
    pub min_area: f64,
}

impl Default for SimpleOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            tolerance: 1.0,
            min_area: 10.0,
        }
    }
}

impl SimpleOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(self.threshold, self.tolerance, self.min_area)
    }
}

/// Active contour model: dense contour vertices pulled toward the iso-line
/// and the frame field directions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcmOptions {
    pub threshold: f32,
    pub tolerance: f64,
    pub min_area: f64,
    /// Number of optimisation steps. Always run to completion.
    pub steps: usize,
    pub step_size: f64,
    /// Boundary-fidelity weight.
    pub data_coef: f64,
    /// Contour tension weight.
    pub length_coef: f64,
    /// Frame field alignment weight.
    pub crossfield_coef: f64,
    /// Upper bound on a single vertex move, in pixels.
    pub max_displacement: f64,
}

impl Default for AcmOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            tolerance: 1.0,
            min_area: 10.0,
            steps: 100,
            step_size: 0.1,
            data_coef: 1.0,
            length_coef: 0.4,
            crossfield_coef: 0.5,
            max_displacement: 0.5,
        }
    }
}

impl AcmOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(self.threshold, self.tolerance, self.min_area)?;
        validate_refine(
            self.step_size,
            self.data_coef,
            self.length_coef,
            self.crossfield_coef,
            self.max_displacement,
        )
    }

    pub fn refine_params(&self) -> RefineParams {
        RefineParams {
            threshold: self.threshold as f64,
            steps: self.steps,
            step_size: self.step_size,
            data_coef: self.data_coef,
            length_coef: self.length_coef,
            crossfield_coef: self.crossfield_coef,
            max_displacement: self.max_displacement,
            edge_samples: 0,
        }
    }
}

/// Active skeleton model: a reduced vertex graph with shared junctions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsmOptions {
    pub threshold: f32,
    /// Initial Douglas-Peucker tolerance used to build the skeleton.
    pub tolerance: f64,
    pub min_area: f64,
    pub steps: usize,
    pub step_size: f64,
    pub data_coef: f64,
    pub length_coef: f64,
    pub crossfield_coef: f64,
    pub max_displacement: f64,
    /// Maximum vertex count of one skeleton ring.
    pub skeleton_vertex_budget: usize,
    /// Vertices of different rings closer than this (px) become one junction.
    pub junction_snap: f64,
    /// Vertices turning by less than this after refinement are removed.
    pub angle_tolerance_deg: f64,
    /// Probability samples taken along each skeleton edge.
    pub edge_samples: usize,
}

impl Default for AsmOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            tolerance: 0.5,
            min_area: 10.0,
            steps: 100,
            step_size: 0.1,
            data_coef: 1.0,
            length_coef: 0.2,
            crossfield_coef: 0.5,
            max_displacement: 0.5,
            skeleton_vertex_budget: 64,
            junction_snap: 0.75,
            angle_tolerance_deg: 10.0,
            edge_samples: 4,
        }
    }
}

impl AsmOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(self.threshold, self.tolerance, self.min_area)?;
        validate_refine(
            self.step_size,
            self.data_coef,
            self.length_coef,
            self.crossfield_coef,
            self.max_displacement,
        )?;
        if self.skeleton_vertex_budget < 3 {
            return Err(ConfigError::invalid(
                "skeleton_vertex_budget",
                format!("must be at least 3, got {}", self.skeleton_vertex_budget),
            ));
        }
        if !(self.junction_snap >= 0.0) {
            return Err(ConfigError::invalid("junction_snap", "must be >= 0"));
        }
        if !(0.0..180.0).contains(&self.angle_tolerance_deg) {
            return Err(ConfigError::invalid(
                "angle_tolerance_deg",
                format!("must lie in [0, 180), got {}", self.angle_tolerance_deg),
            ));
        }
        Ok(())
    }

    pub fn refine_params(&self) -> RefineParams {
        RefineParams {
            threshold: self.threshold as f64,
            steps: self.steps,
            step_size: self.step_size,
            data_coef: self.data_coef,
            length_coef: self.length_coef,
            crossfield_coef: self.crossfield_coef,
            max_displacement: self.max_displacement,
            edge_samples: self.edge_samples,
        }
    }
}

/// Parameters consumed by the graph optimiser, shared by ACM and ASM.
#[derive(Clone, Debug, PartialEq)]
pub struct RefineParams {
    pub threshold: f64,
    pub steps: usize,
    pub step_size: f64,
    pub data_coef: f64,
    pub length_coef: f64,
    pub crossfield_coef: f64,
    pub max_displacement: f64,
    pub edge_samples: usize,
}

/// Strategy selection as it appears in tool configs:
/// `{"method": "acm", "steps": 50}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PolygonizerConfig {
    Simple(SimpleOptions),
    Acm(AcmOptions),
    Asm(AsmOptions),
}

impl Default for PolygonizerConfig {
    fn default() -> Self {
        Self::Simple(SimpleOptions::default())
    }
}

impl PolygonizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Simple(o) => o.validate(),
            Self::Acm(o) => o.validate(),
            Self::Asm(o) => o.validate(),
        }
    }
}

fn validate_common(threshold: f32, tolerance: f64, min_area: f64) -> Result<(), ConfigError> {
    if !threshold.is_finite() {
        return Err(ConfigError::invalid("threshold", "must be finite"));
    }
    if !(tolerance >= 0.0) {
        return Err(ConfigError::invalid(
            "tolerance",
            format!("must be >= 0, got {tolerance}"),
        ));
    }
    if !(min_area >= 0.0) {
        return Err(ConfigError::invalid(
            "min_area",
            format!("must be >= 0, got {min_area}"),
        ));
    }
    Ok(())
}

fn validate_refine(
    step_size: f64,
    data_coef: f64,
    length_coef: f64,
    crossfield_coef: f64,
    max_displacement: f64,
) -> Result<(), ConfigError> {
    if !(step_size > 0.0 && step_size.is_finite()) {
        return Err(ConfigError::invalid("step_size", "must be positive"));
    }
    for (field, value) in [
        ("data_coef", data_coef),
        ("length_coef", length_coef),
        ("crossfield_coef", crossfield_coef),
    ] {
        if !(value >= 0.0 && value.is_finite()) {
            return Err(ConfigError::invalid(field, format!("must be >= 0, got {value}")));
        }
    }
    if !(max_displacement > 0.0 && max_displacement.is_finite()) {
        return Err(ConfigError::invalid("max_displacement", "must be positive"));
    }
    Ok(())
}
