//! Raster metadata and the georeferencing sidecars that travel with plain
//! PNG/TIFF files: an ESRI world file (`.pgw`, `.tfw`, ...) for the affine
//! transform and a `.prj` file holding the CRS identifier.
use crate::error::{RasterError, WriteError};
use crate::geometry::GeoTransform;
use crate::image::io::{ensure_parent_dir, open_image};
use crate::image::ImageF32;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::stats::{band_stats, BandStats};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RasterDtype {
    #[default]
    U8,
    U16,
}

impl RasterDtype {
    pub fn max_value(self) -> f32 {
        match self {
            Self::U8 => u8::MAX as f32,
            Self::U16 => u16::MAX as f32,
        }
    }
}

/// Template describing an output raster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterProfile {
    pub width: usize,
    pub height: usize,
    pub count: usize,
    #[serde(default)]
    pub dtype: RasterDtype,
    #[serde(default)]
    pub transform: GeoTransform,
    #[serde(default)]
    pub crs: Option<String>,
}

impl RasterProfile {
    pub fn new(width: usize, height: usize, count: usize, dtype: RasterDtype) -> Self {
        Self {
            width,
            height,
            count,
            dtype,
            transform: GeoTransform::identity(),
            crs: None,
        }
    }

    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_crs(mut self, crs: Option<String>) -> Self {
        self.crs = crs;
        self
    }
}

/// World-file path for `path`: first and last letter of the extension plus
/// `w` (`png` → `pgw`, `tif` → `tfw`), or `wld` without an extension.
pub fn world_file_path(path: &Path) -> PathBuf {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut chars = ext.chars();
    let sidecar = match (chars.next(), chars.last()) {
        (Some(first), Some(last)) => format!("{first}{last}w"),
        (Some(first), None) => format!("{first}w"),
        _ => "wld".to_string(),
    };
    path.with_extension(sidecar)
}

pub fn prj_path(path: &Path) -> PathBuf {
    path.with_extension("prj")
}

/// Read the transform and CRS stored next to `path`. Missing sidecars yield
/// the identity transform and no CRS.
pub fn read_sidecars(path: &Path) -> Result<(GeoTransform, Option<String>), RasterError> {
    let wf = world_file_path(path);
    let transform = if wf.is_file() {
        let text = fs::read_to_string(&wf).map_err(|source| RasterError::Io {
            path: wf.clone(),
            source,
        })?;
        GeoTransform::from_world_file(&text)
            .map_err(|reason| RasterError::WorldFile { path: wf, reason })?
    } else {
        GeoTransform::identity()
    };

    let prj = prj_path(path);
    let crs = if prj.is_file() {
        let text = fs::read_to_string(&prj).map_err(|source| RasterError::Io {
            path: prj.clone(),
            source,
        })?;
        Some(text.trim().to_string()).filter(|s| !s.is_empty())
    } else {
        None
    };
    Ok((transform, crs))
}

/// Write the world file and, when a CRS is known, the `.prj` file.
pub fn write_sidecars(
    path: &Path,
    transform: &GeoTransform,
    crs: Option<&str>,
) -> Result<(), WriteError> {
    ensure_parent_dir(path)?;
    let wf = world_file_path(path);
    fs::write(&wf, transform.to_world_file()).map_err(|e| WriteError::io(&wf, e))?;
    if let Some(crs) = crs {
        let prj = prj_path(path);
        fs::write(&prj, format!("{crs}\n")).map_err(|e| WriteError::io(&prj, e))?;
    }
    Ok(())
}

/// A decoded raster with its bands as f32 planes (native value range).
#[derive(Clone, Debug)]
pub struct RasterFile {
    pub path: PathBuf,
    pub profile: RasterProfile,
    bands: Vec<ImageF32>,
}

impl RasterFile {
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let img = open_image(path)?;
        let (transform, crs) = read_sidecars(path)?;
        let dtype = if img.color().bytes_per_pixel() / img.color().channel_count() > 1 {
            RasterDtype::U16
        } else {
            RasterDtype::U8
        };
        let bands = split_bands(&img);
        let profile = RasterProfile::new(
            img.width() as usize,
            img.height() as usize,
            bands.len(),
            dtype,
        )
        .with_transform(transform)
        .with_crs(crs);
        Ok(Self {
            path: path.to_path_buf(),
            profile,
            bands,
        })
    }

    pub fn from_bands(path: impl Into<PathBuf>, bands: Vec<ImageF32>, profile: RasterProfile) -> Self {
        Self {
            path: path.into(),
            profile,
            bands,
        }
    }

    pub fn width(&self) -> usize {
        self.profile.width
    }

    pub fn height(&self) -> usize {
        self.profile.height
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.profile.transform
    }

    pub fn bands(&self) -> &[ImageF32] {
        &self.bands
    }

    /// World bounding box `(min_x, min_y, max_x, max_y)`.
    pub fn footprint(&self) -> (f64, f64, f64, f64) {
        self.profile
            .transform
            .footprint(self.profile.width, self.profile.height)
    }

    pub fn stats(&self) -> BandStats {
        band_stats(&self.bands)
    }
}

fn split_bands(img: &DynamicImage) -> Vec<ImageF32> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let channels = img.color().channel_count() as usize;
    let (samples, channels): (Vec<f32>, usize) = match img {
        DynamicImage::ImageLuma8(b) => (to_f32(b.as_raw()), channels),
        DynamicImage::ImageLumaA8(b) => (to_f32(b.as_raw()), channels),
        DynamicImage::ImageRgb8(b) => (to_f32(b.as_raw()), channels),
        DynamicImage::ImageRgba8(b) => (to_f32(b.as_raw()), channels),
        DynamicImage::ImageLuma16(b) => (to_f32(b.as_raw()), channels),
        DynamicImage::ImageLumaA16(b) => (to_f32(b.as_raw()), channels),
        DynamicImage::ImageRgb16(b) => (to_f32(b.as_raw()), channels),
        DynamicImage::ImageRgba16(b) => (to_f32(b.as_raw()), channels),
        DynamicImage::ImageRgb32F(b) => (b.as_raw().clone(), channels),
        DynamicImage::ImageRgba32F(b) => (b.as_raw().clone(), channels),
        other => (other.to_rgba32f().into_raw(), 4),
    };
    (0..channels)
        .map(|c| ImageF32 {
            w,
            h,
            stride: w,
            data: samples.iter().skip(c).step_by(channels).copied().collect(),
        })
        .collect()
}

fn to_f32<T: Copy + Into<f32>>(raw: &[T]) -> Vec<f32> {
    raw.iter().map(|&v| v.into()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_names_follow_world_file_convention() {
        assert_eq!(world_file_path(Path::new("a/b.png")), PathBuf::from("a/b.pgw"));
        assert_eq!(world_file_path(Path::new("a/b.tif")), PathBuf::from("a/b.tfw"));
        assert_eq!(world_file_path(Path::new("a/b.tiff")), PathBuf::from("a/b.tfw"));
        assert_eq!(world_file_path(Path::new("a/b")), PathBuf::from("a/b.wld"));
    }

    #[test]
    fn sidecars_round_trip() {
        let dir = std::env::temp_dir().join(format!("ffp_sidecar_{}", std::process::id()));
        let path = dir.join("tile.png");
        let t = GeoTransform::north_up(500_000.0, 7_000_000.0, 0.5, 0.5);
        write_sidecars(&path, &t, Some("EPSG:31982")).unwrap();
        let (back, crs) = read_sidecars(&path).unwrap();
        assert!((back.c - t.c).abs() < 1e-6 && (back.f - t.f).abs() < 1e-6);
        assert_eq!(back.a, t.a);
        assert_eq!(crs.as_deref(), Some("EPSG:31982"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rgb_image_splits_into_bands() {
        let mut buf = image::RgbImage::new(2, 1);
        buf.put_pixel(0, 0, image::Rgb([10, 20, 30]));
        buf.put_pixel(1, 0, image::Rgb([40, 50, 60]));
        let bands = split_bands(&DynamicImage::ImageRgb8(buf));
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[1].data, vec![20.0, 50.0]);
    }
}
