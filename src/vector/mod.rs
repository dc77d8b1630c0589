//! Vector ground-truth sources for the mask builder.
//!
//! A [`VectorSource`] is one GeoJSON file covering every image, a
//! directory of per-image files matched by file stem, or a PostGIS query.
mod postgis;

pub use self::postgis::PostgisSource;

use crate::error::MaskError;
use crate::geometry::geojson::{feature_from_value, parse_feature_collection, GeoFeature};
use geo::{BoundingRect, Geometry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Features of one vector file.
#[derive(Clone, Debug, Default)]
pub struct VectorLayer {
    pub crs: Option<String>,
    pub features: Vec<GeoFeature>,
}

impl VectorLayer {
    pub fn new(features: Vec<GeoFeature>, crs: Option<String>) -> Self {
        Self { crs, features }
    }

    /// Read a GeoJSON document, or newline-delimited features when the
    /// extension is `geojsonl` / `geojsons` / `jsonl`.
    pub fn open(path: &Path) -> Result<Self, MaskError> {
        let text = fs::read_to_string(path).map_err(|source| MaskError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let seq = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("geojsonl" | "geojsons" | "jsonl")
        );
        if !seq {
            let fc = parse_feature_collection(&text)?;
            return Ok(Self::new(fc.features, fc.crs));
        }

        let mut layer = Self::default();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
                crate::error::GeometryError::InvalidGeoJson(format!("{}: {e}", path.display()))
            })?;
            if layer.crs.is_none() {
                layer.crs = value
                    .pointer("/crs/properties/name")
                    .and_then(|v| v.as_str())
                    .map(str::to_owned);
            }
            layer.features.push(feature_from_value(&value)?);
        }
        Ok(layer)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Geometries whose bounding box intersects `(min_x, min_y, max_x, max_y)`.
    pub fn geometries_in(&self, bbox: (f64, f64, f64, f64)) -> Vec<&Geometry<f64>> {
        let (x0, y0, x1, y1) = bbox;
        self.features
            .iter()
            .map(|f| &f.geometry)
            .filter(|g| match g.bounding_rect() {
                Some(r) => r.min().x <= x1 && r.max().x >= x0 && r.min().y <= y1 && r.max().y >= y0,
                None => false,
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VectorSource {
    File {
        path: PathBuf,
    },
    BatchFile {
        root_dir: PathBuf,
        #[serde(default = "default_vector_extension")]
        file_extension: String,
    },
    /// Read once at startup; needs the `postgis` feature.
    Postgis(PostgisSource),
}

fn default_vector_extension() -> String {
    "geojson".to_string()
}

/// Resolved [`VectorSource`]: the single layer is read once, batch files are
/// indexed by stem and read on demand.
#[derive(Debug)]
pub enum VectorCatalog {
    Single(Arc<VectorLayer>),
    Batch(HashMap<String, PathBuf>),
}

impl VectorCatalog {
    pub fn open(source: &VectorSource) -> Result<Self, MaskError> {
        match source {
            VectorSource::File { path } => Ok(Self::Single(Arc::new(VectorLayer::open(path)?))),
            VectorSource::BatchFile {
                root_dir,
                file_extension,
            } => {
                let mut index = HashMap::new();
                for entry in WalkDir::new(root_dir).sort_by_file_name() {
                    let entry = entry?;
                    let path = entry.path();
                    let matches = entry.file_type().is_file()
                        && path.extension().and_then(|e| e.to_str()) == Some(file_extension.as_str());
                    if let (true, Some(stem)) = (matches, path.file_stem().and_then(|s| s.to_str())) {
                        index.entry(stem.to_string()).or_insert_with(|| path.to_path_buf());
                    }
                }
                log::debug!("indexed {} vector files under {}", index.len(), root_dir.display());
                Ok(Self::Batch(index))
            }
            VectorSource::Postgis(src) => open_postgis(src).map(|l| Self::Single(Arc::new(l))),
        }
    }

    /// Layer for the image with file stem `stem`, `None` when a batch has no
    /// file for it.
    pub fn layer_for(&self, stem: &str) -> Result<Option<Arc<VectorLayer>>, MaskError> {
        match self {
            Self::Single(layer) => Ok(Some(Arc::clone(layer))),
            Self::Batch(index) => match index.get(stem) {
                Some(path) => Ok(Some(Arc::new(VectorLayer::open(path)?))),
                None => Ok(None),
            },
        }
    }
}

#[cfg(feature = "postgis")]
fn open_postgis(src: &PostgisSource) -> Result<VectorLayer, MaskError> {
    postgis::read_layer(src)
}

#[cfg(not(feature = "postgis"))]
fn open_postgis(_src: &PostgisSource) -> Result<VectorLayer, MaskError> {
    Err(MaskError::FeatureDisabled("postgis vector source"))
}
