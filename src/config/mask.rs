use crate::error::ConfigError;
use crate::mask::MaskOutputType;
use crate::vector::VectorSource;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Options of the `build_masks` tool.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MaskBuilderConfig {
    pub root_dir: PathBuf,
    /// Directory receiving `<dataset_name>.csv`.
    pub output_csv_path: PathBuf,
    pub dataset_name: String,
    /// Write image and mask paths relative to `root_dir` in the CSV.
    pub dataset_has_relative_path: bool,
    pub image_root_dir: PathBuf,
    pub image_extension: String,
    pub image_dir_is_relative_to_root_dir: bool,
    /// Mirror the sub-directories of the image tree under each mask folder.
    pub replicate_image_folder_structure: bool,
    pub build_polygon_mask: bool,
    pub polygon_mask_folder_name: String,
    pub build_boundary_mask: bool,
    pub boundary_mask_folder_name: String,
    pub build_vertex_mask: bool,
    pub vertex_mask_folder_name: String,
    /// Polygons smaller than this (world units²) are not burnt.
    pub min_polygon_area: f64,
    pub mask_output_type: MaskOutputType,
    pub mask_extension: String,
    /// Write mask files; when off the masks are returned in memory and the
    /// catalog has no mask columns.
    pub write_masks: bool,
    pub vector_source: VectorSource,
    pub workers: Option<usize>,
}

impl Default for MaskBuilderConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("/data"),
            output_csv_path: PathBuf::from("/data"),
            dataset_name: "dsg_dataset".to_string(),
            dataset_has_relative_path: true,
            image_root_dir: PathBuf::from("images"),
            image_extension: "tif".to_string(),
            image_dir_is_relative_to_root_dir: true,
            replicate_image_folder_structure: true,
            build_polygon_mask: true,
            polygon_mask_folder_name: "polygon_masks".to_string(),
            build_boundary_mask: true,
            boundary_mask_folder_name: "boundary_masks".to_string(),
            build_vertex_mask: true,
            vertex_mask_folder_name: "vertex_masks".to_string(),
            min_polygon_area: 50.0,
            mask_output_type: MaskOutputType::default(),
            mask_extension: "tif".to_string(),
            write_masks: true,
            vector_source: VectorSource::BatchFile {
                root_dir: PathBuf::from("vectors"),
                file_extension: "geojson".to_string(),
            },
            workers: None,
        }
    }
}

impl MaskBuilderConfig {
    /// Directory holding the input images.
    pub fn image_base_path(&self) -> PathBuf {
        if self.image_dir_is_relative_to_root_dir {
            self.root_dir.join(&self.image_root_dir)
        } else {
            self.image_root_dir.clone()
        }
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_csv_path.join(format!("{}.csv", self.dataset_name))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dataset_name.trim().is_empty() {
            return Err(ConfigError::invalid("dataset_name", "must not be empty"));
        }
        if self.image_extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::invalid("image_extension", "must not be empty"));
        }
        if !matches!(
            self.mask_extension.trim_start_matches('.').to_ascii_lowercase().as_str(),
            "png" | "tif" | "tiff"
        ) {
            return Err(ConfigError::invalid(
                "mask_extension",
                format!("unsupported mask format {:?}", self.mask_extension),
            ));
        }
        if !self.min_polygon_area.is_finite() || self.min_polygon_area < 0.0 {
            return Err(ConfigError::invalid(
                "min_polygon_area",
                format!("must be finite and non-negative, got {}", self.min_polygon_area),
            ));
        }
        if !(self.build_polygon_mask || self.build_boundary_mask || self.build_vertex_mask) {
            return Err(ConfigError::invalid("build_*_mask", "no mask type enabled"));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::invalid("workers", "must be at least 1"));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<MaskBuilderConfig, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: MaskBuilderConfig =
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: MaskBuilderConfig = serde_json::from_str(
            r#"{"root_dir": "/tmp/ds", "build_vertex_mask": false,
                "vector_source": {"type": "file", "path": "/tmp/ds/buildings.geojson"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.dataset_name, "dsg_dataset");
        assert_eq!(cfg.min_polygon_area, 50.0);
        assert!(!cfg.build_vertex_mask);
        assert_eq!(cfg.image_base_path(), PathBuf::from("/tmp/ds/images"));
        assert_eq!(cfg.csv_path(), PathBuf::from("/data/dsg_dataset.csv"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_mask_format() {
        let cfg = MaskBuilderConfig {
            mask_extension: "jpg".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
