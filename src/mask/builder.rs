//! Build training masks from georeferenced images and vector ground truth.
use super::catalog::{write_dataset_csv, DatasetEntry};
use crate::config::mask::MaskBuilderConfig;
use crate::error::{MaskError, WriteError};
use crate::executor::{BatchExecutor, ExecutionMode, UnitFailure, WorkUnit};
use crate::geometry::{convert_all, GeomType};
use crate::image::ImageU8;
use crate::raster::{burn_geometries, RasterDtype, RasterFile, RasterProfile};
use crate::vector::{VectorCatalog, VectorLayer};
use crate::writer::{DataWriter, RasterArray, RasterDataWriter};
use geo::{Area, Geometry, MultiPolygon};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// How the masks of one image are laid out on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskOutputType {
    /// One single-band file per mask type, each in its own folder.
    #[default]
    SingleFilePerMask,
    /// One file with a band per mask type, stored in the first mask folder.
    SingleFileMultipleBand,
}

/// Outcome of [`build_masks`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskBuildReport {
    pub csv_path: PathBuf,
    pub entries: usize,
    pub failures: Vec<UnitFailure>,
    pub total_ms: f64,
    /// Burnt masks per image, kept only when `write_masks` is off.
    #[serde(skip)]
    pub masks: Vec<ImageMasks>,
}

/// Masks burnt for one image, in polygon / boundary / vertex order.
#[derive(Clone, Debug)]
pub struct ImageMasks {
    pub image: PathBuf,
    pub masks: Vec<(GeomType, ImageU8)>,
}

/// Mask types enabled in `cfg`, in polygon / boundary / vertex order.
pub fn build_mask_type_list(cfg: &MaskBuilderConfig) -> Vec<GeomType> {
    let mut types = Vec::with_capacity(3);
    if cfg.build_polygon_mask {
        types.push(GeomType::Polygon);
    }
    if cfg.build_boundary_mask {
        types.push(GeomType::Line);
    }
    if cfg.build_vertex_mask {
        types.push(GeomType::Point);
    }
    types
}

/// Mirror every directory below `input` under `output`, returning the
/// directories of the mirrored tree.
pub fn build_destination_dirs(input: &Path, output: &Path) -> Result<Vec<PathBuf>, MaskError> {
    if output.starts_with(input) {
        return Err(MaskError::OutputInsideInput {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
        });
    }
    let mut created = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let rel = entry.path().strip_prefix(input).unwrap_or(Path::new(""));
        let dir = output.join(rel);
        fs::create_dir_all(&dir).map_err(|source| MaskError::Io {
            path: dir.clone(),
            source,
        })?;
        created.push(dir);
    }
    Ok(created)
}

/// Run the whole pipeline: prepare folders, burn masks for every image
/// under the image root and write the dataset CSV.
pub fn build_masks(cfg: &MaskBuilderConfig) -> Result<MaskBuildReport, MaskError> {
    let start = Instant::now();
    let mask_types = build_mask_type_list(cfg);
    let image_base = cfg.image_base_path();

    let folders: &[GeomType] = if cfg.write_masks { &mask_types } else { &[] };
    for geom_type in folders {
        let out = cfg.root_dir.join(folder_name(cfg, *geom_type));
        if cfg.replicate_image_folder_structure {
            build_destination_dirs(&image_base, &out)?;
        } else {
            fs::create_dir_all(&out).map_err(|source| MaskError::Io {
                path: out.clone(),
                source,
            })?;
        }
    }

    let catalog = VectorCatalog::open(&cfg.vector_source)?;
    let extension = cfg.image_extension.trim_start_matches('.');
    let mut units = Vec::new();
    for entry in WalkDir::new(&image_base).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
            units.push(WorkUnit::new(path.display().to_string(), path.to_path_buf()));
        }
    }
    log::info!("building masks for {} images under {}", units.len(), image_base.display());

    let job = MaskJob {
        cfg,
        catalog: &catalog,
        image_base: &image_base,
        mask_types: &mask_types,
    };
    let executor = BatchExecutor::new(ExecutionMode::from_workers(cfg.workers));
    let batch = executor.run(units, |_, path: PathBuf| job.run(&path));

    let (mut entries, kept): (Vec<DatasetEntry>, Vec<Option<ImageMasks>>) =
        batch.completed.into_iter().unzip();
    entries.sort_by(|a, b| a.image.cmp(&b.image));
    let mut masks: Vec<ImageMasks> = kept.into_iter().flatten().collect();
    masks.sort_by(|a, b| a.image.cmp(&b.image));
    let csv_path = cfg.csv_path();
    write_dataset_csv(&csv_path, &entries)?;

    Ok(MaskBuildReport {
        csv_path,
        entries: entries.len(),
        failures: batch.failures,
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
        masks,
    })
}

struct MaskJob<'a> {
    cfg: &'a MaskBuilderConfig,
    catalog: &'a VectorCatalog,
    image_base: &'a Path,
    mask_types: &'a [GeomType],
}

impl MaskJob<'_> {
    fn run(&self, image_path: &Path) -> Result<(DatasetEntry, Option<ImageMasks>), MaskError> {
        let raster = RasterFile::open(image_path)?;
        let (w, h) = (raster.width(), raster.height());
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let layer = match self.catalog.layer_for(stem)? {
            Some(layer) => layer,
            None => {
                log::warn!("no vector data for {stem}; its masks will be empty");
                Default::default()
            }
        };
        let geoms = footprint_geometries(&layer, &raster, self.cfg.min_polygon_area);
        let world_to_pixel = raster.transform().inverse()?;

        let masks: Vec<(GeomType, ImageU8)> = self
            .mask_types
            .iter()
            .map(|&geom_type| {
                let converted = convert_all(geoms.iter().cloned(), geom_type, |i, err| {
                    log::warn!("{stem}: skipping feature {i}: {err}");
                });
                (geom_type, burn_geometries(&converted, w, h, &world_to_pixel))
            })
            .collect();

        let profile = RasterProfile::new(w, h, 1, RasterDtype::U8)
            .with_transform(*raster.transform())
            .with_crs(raster.profile.crs.clone());
        let mut entry = DatasetEntry {
            image: self.catalog_path(image_path),
            width: w,
            height: h,
            ..Default::default()
        };

        match self.cfg.mask_output_type {
            _ if !self.cfg.write_masks => {}
            MaskOutputType::SingleFilePerMask => {
                for (geom_type, mask) in &masks {
                    let path = self.mask_path(image_path, *geom_type);
                    write_mask(&path, profile.clone(), &[mask])?;
                    set_mask_column(&mut entry, *geom_type, self.catalog_path(&path));
                }
            }
            MaskOutputType::SingleFileMultipleBand => {
                if let Some((first, _)) = masks.first() {
                    let path = self.mask_path(image_path, *first);
                    let bands: Vec<&ImageU8> = masks.iter().map(|(_, m)| m).collect();
                    write_mask(&path, profile, &bands)?;
                    let rel = self.catalog_path(&path);
                    for (geom_type, _) in &masks {
                        set_mask_column(&mut entry, *geom_type, rel.clone());
                    }
                }
            }
        }

        let stats = raster.stats();
        entry.bands_means = stats.means;
        entry.bands_stds = stats.stds;
        log::debug!(
            "{}: burnt {} features into {} masks",
            image_path.display(),
            geoms.len(),
            masks.len()
        );
        let kept = (!self.cfg.write_masks).then(|| ImageMasks {
            image: image_path.to_path_buf(),
            masks,
        });
        Ok((entry, kept))
    }

    /// `<root>/<mask folder>/<image sub-directory>/<stem>.<mask extension>`.
    fn mask_path(&self, image_path: &Path, geom_type: GeomType) -> PathBuf {
        let mut dir = self.cfg.root_dir.join(folder_name(self.cfg, geom_type));
        if self.cfg.replicate_image_folder_structure {
            if let Some(sub) = image_path
                .parent()
                .and_then(|p| p.strip_prefix(self.image_base).ok())
            {
                dir = dir.join(sub);
            }
        }
        let stem = image_path.file_stem().unwrap_or_default().to_string_lossy();
        dir.join(format!(
            "{stem}.{}",
            self.cfg.mask_extension.trim_start_matches('.')
        ))
    }

    fn catalog_path(&self, path: &Path) -> String {
        let shown = if self.cfg.dataset_has_relative_path {
            path.strip_prefix(&self.cfg.root_dir).unwrap_or(path)
        } else {
            path
        };
        shown.display().to_string()
    }
}

/// Features of `layer` overlapping the raster, with polygon parts smaller
/// than `min_area` removed.
fn footprint_geometries(layer: &VectorLayer, raster: &RasterFile, min_area: f64) -> Vec<Geometry<f64>> {
    layer
        .geometries_in(raster.footprint())
        .into_iter()
        .filter_map(|g| match g {
            Geometry::Polygon(p) => {
                (p.unsigned_area() >= min_area).then(|| Geometry::Polygon(p.clone()))
            }
            Geometry::MultiPolygon(mp) => {
                let kept: Vec<_> = mp
                    .0
                    .iter()
                    .filter(|p| p.unsigned_area() >= min_area)
                    .cloned()
                    .collect();
                (!kept.is_empty()).then(|| Geometry::MultiPolygon(MultiPolygon(kept)))
            }
            other => Some(other.clone()),
        })
        .collect()
}

fn write_mask(path: &Path, profile: RasterProfile, masks: &[&ImageU8]) -> Result<(), WriteError> {
    let data = RasterArray::from_masks(masks).ok_or(WriteError::UnsupportedBandCount(masks.len()))?;
    RasterDataWriter::new(path, profile).write_data(data)
}

fn folder_name(cfg: &MaskBuilderConfig, geom_type: GeomType) -> &str {
    match geom_type {
        GeomType::Polygon => &cfg.polygon_mask_folder_name,
        GeomType::Line => &cfg.boundary_mask_folder_name,
        GeomType::Point => &cfg.vertex_mask_folder_name,
    }
}

fn set_mask_column(entry: &mut DatasetEntry, geom_type: GeomType, value: String) {
    match geom_type {
        GeomType::Polygon => entry.polygon_mask = Some(value),
        GeomType::Line => entry.boundary_mask = Some(value),
        GeomType::Point => entry.vertex_mask = Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_types_follow_flags() {
        let cfg = MaskBuilderConfig {
            build_boundary_mask: false,
            ..Default::default()
        };
        assert_eq!(build_mask_type_list(&cfg), vec![GeomType::Polygon, GeomType::Point]);
    }

    #[test]
    fn destination_inside_input_is_rejected() {
        let err = build_destination_dirs(Path::new("/data/images"), Path::new("/data/images/masks"))
            .unwrap_err();
        assert!(err.to_string().contains("input path must not be in output_path"));
    }

    #[test]
    fn destination_tree_is_replicated() {
        let root = std::env::temp_dir().join(format!("ffp_dest_dirs_{}", std::process::id()));
        fs::create_dir_all(root.join("images/a/b")).unwrap();
        let dirs = build_destination_dirs(&root.join("images"), &root.join("masks")).unwrap();
        assert_eq!(dirs.len(), 3);
        assert!(root.join("masks/a/b").is_dir());
        let _ = fs::remove_dir_all(&root);
    }
}
