//! GeoJSON vector-file sink.
use super::DataWriter;
use crate::error::WriteError;
use crate::geometry::geojson::{crs_member, feature_to_value};
use crate::image::io::ensure_parent_dir;
use crate::polygonize::PolygonSet;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorFormat {
    /// One `FeatureCollection` document.
    #[default]
    Geojson,
    /// Newline-delimited features, one per line.
    GeojsonSeq,
}

/// Writes every polygon of a set as one feature carrying the set name.
///
/// `{name}` in the path template is replaced by the set name so that one
/// writer can serve a whole batch.
#[derive(Clone, Debug)]
pub struct VectorFileDataWriter {
    path_template: String,
    crs: Option<String>,
    format: VectorFormat,
}

impl VectorFileDataWriter {
    pub fn new(path_template: impl Into<String>, crs: Option<String>, format: VectorFormat) -> Self {
        Self {
            path_template: path_template.into(),
            crs,
            format,
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        PathBuf::from(self.path_template.replace("{name}", name))
    }

    fn render(&self, set: &PolygonSet) -> Result<String, WriteError> {
        let crs = self.crs.as_deref().or(set.crs.as_deref());
        let features: Vec<Value> = set
            .polygons
            .iter()
            .enumerate()
            .map(|(i, poly)| {
                let mut props = Map::new();
                props.insert("name".into(), json!(set.name));
                props.insert("index".into(), json!(i));
                feature_to_value(&geo::Geometry::Polygon(poly.clone()), props)
            })
            .collect();

        match self.format {
            VectorFormat::Geojson => {
                let mut doc = json!({
                    "type": "FeatureCollection",
                    "name": set.name,
                    "features": features,
                });
                if let (Some(crs), Some(obj)) = (crs, doc.as_object_mut()) {
                    obj.insert("crs".into(), crs_member(crs));
                }
                Ok(serde_json::to_string_pretty(&doc)?)
            }
            VectorFormat::GeojsonSeq => {
                let mut out = String::new();
                for mut feature in features {
                    if let (Some(crs), Some(obj)) = (crs, feature.as_object_mut()) {
                        obj.insert("crs".into(), crs_member(crs));
                    }
                    let _ = writeln!(out, "{}", serde_json::to_string(&feature)?);
                }
                Ok(out)
            }
        }
    }
}

impl DataWriter<PolygonSet> for VectorFileDataWriter {
    fn write_data(&self, data: PolygonSet) -> Result<(), WriteError> {
        let path = self.path_for(&data.name);
        let text = self.render(&data)?;
        ensure_parent_dir(&path)?;
        fs::write(&path, text).map_err(|e| WriteError::io(&path, e))?;
        log::debug!("wrote {} features to {}", data.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeoTransform;
    use geo::polygon;

    #[test]
    fn name_placeholder_is_substituted() {
        let w = VectorFileDataWriter::new("/tmp/out/{name}.geojson", None, VectorFormat::Geojson);
        assert_eq!(w.path_for("tile_7"), PathBuf::from("/tmp/out/tile_7.geojson"));
    }

    #[test]
    fn sequence_format_has_one_line_per_feature() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0)];
        let set = PolygonSet::new("a", vec![poly.clone(), poly], GeoTransform::identity());
        let w = VectorFileDataWriter::new("unused", Some("EPSG:3857".into()), VectorFormat::GeojsonSeq);
        let text = w.render(&set).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|l| l.contains("EPSG:3857")));
    }
}
