//! Error taxonomy shared across the crate.
//!
//! Each subsystem owns a focused error enum; [`Error`] wraps them at the
//! boundaries where several subsystems meet (a batch unit, a binary).
use crate::geometry::GeomType;
use std::path::PathBuf;

/// Geometry Handler failures.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("cannot convert {from} geometry to {to:?}")]
    InvalidGeometryConversion { from: &'static str, to: GeomType },

    #[error("invalid GeoJSON: {0}")]
    InvalidGeoJson(String),
}

/// Failures raised by a polygonization strategy or its input validation.
#[derive(Debug, thiserror::Error)]
pub enum PolygonizeError {
    #[error("shape mismatch: segmentation is {seg:?} but crossfield is {crossfield:?}")]
    ShapeMismatch {
        seg: [usize; 4],
        crossfield: [usize; 4],
    },

    #[error("crossfield must have 4 channels, got {0}")]
    InvalidCrossfieldChannels(usize),

    #[error("the {0} strategy requires a crossfield")]
    MissingCrossfield(&'static str),

    #[error("tensor data length {actual} does not match shape {shape:?}")]
    InvalidTensor { shape: [usize; 4], actual: usize },

    #[error("{names} names supplied for a batch of {batch}")]
    BatchNameMismatch { names: usize, batch: usize },

    #[error("segmentation contains {count} non-finite values")]
    NonFiniteInput { count: usize },

    #[error("polygonization failed: {0}")]
    Polygonization(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Sink-level failures. Never swallowed by the writer.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image encoding failed for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("table {0} already exists")]
    TableExists(String),

    #[error("raster sink supports 1 to 4 bands, got {0}")]
    UnsupportedBandCount(usize),

    #[error("raster payload has {actual} values, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("cannot derive an SRID from CRS {0:?}")]
    InvalidCrs(String),
}

impl WriteError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Raster reading failures.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid world file {path}: {reason}")]
    WorldFile { path: PathBuf, reason: String },

    #[error("affine transform is not invertible")]
    SingularTransform,
}

/// Mask-building pipeline failures.
#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    #[error("input path must not be in output_path ({input} contains {output})")]
    OutputInsideInput { input: PathBuf, output: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("vector database error: {0}")]
    Database(String),

    #[error("{0} requires the `postgis` feature")]
    FeatureDisabled(&'static str),
}

/// Configuration loading and validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Crate-wide error used where subsystems meet.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Polygonize(#[from] PolygonizeError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
