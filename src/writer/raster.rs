//! Multi-band raster sink.
use super::DataWriter;
use crate::error::WriteError;
use crate::image::io::ensure_parent_dir;
use crate::image::{ImageF32, ImageU8};
use crate::raster::profile::write_sidecars;
use crate::raster::{RasterDtype, RasterProfile};
use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};
use std::path::{Path, PathBuf};

/// Interleaved (height, width, bands) samples, the layout of an image
/// read band-last.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterArray {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub data: Vec<f32>,
}

impl RasterArray {
    pub fn new(width: usize, height: usize, bands: usize, data: Vec<f32>) -> Self {
        Self {
            width,
            height,
            bands,
            data,
        }
    }

    /// Stack equally sized single-band planes.
    pub fn from_planes(planes: &[&ImageF32]) -> Option<Self> {
        let first = planes.first()?;
        let (w, h) = (first.w, first.h);
        if planes.iter().any(|p| p.w != w || p.h != h) {
            return None;
        }
        let bands = planes.len();
        let mut data = Vec::with_capacity(w * h * bands);
        for y in 0..h {
            for x in 0..w {
                data.extend(planes.iter().map(|p| p.get(x, y)));
            }
        }
        Some(Self::new(w, h, bands, data))
    }

    pub fn from_masks(masks: &[&ImageU8]) -> Option<Self> {
        let planes: Vec<ImageF32> = masks
            .iter()
            .map(|m| ImageF32 {
                w: m.w,
                h: m.h,
                stride: m.w,
                data: m.data.iter().map(|&v| v as f32).collect(),
            })
            .collect();
        let refs: Vec<&ImageF32> = planes.iter().collect();
        Self::from_planes(&refs)
    }
}

/// Writes a [`RasterArray`] as PNG or TIFF (chosen by extension) following a
/// profile. The band count always comes from the payload; the world file and
/// `.prj` sidecars carry the profile's georeferencing.
#[derive(Clone, Debug)]
pub struct RasterDataWriter {
    path: PathBuf,
    profile: RasterProfile,
}

impl RasterDataWriter {
    pub fn new(path: impl Into<PathBuf>, profile: RasterProfile) -> Self {
        Self {
            path: path.into(),
            profile,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Profile as written for `data`.
    pub fn effective_profile(&self, data: &RasterArray) -> RasterProfile {
        let mut profile = self.profile.clone();
        profile.count = data.bands;
        profile.width = data.width;
        profile.height = data.height;
        profile
    }
}

impl DataWriter<RasterArray> for RasterDataWriter {
    fn write_data(&self, data: RasterArray) -> Result<(), WriteError> {
        if !(1..=4).contains(&data.bands) {
            return Err(WriteError::UnsupportedBandCount(data.bands));
        }
        let expected = data.width * data.height * data.bands;
        if data.data.len() != expected {
            return Err(WriteError::SizeMismatch {
                expected,
                actual: data.data.len(),
            });
        }
        let profile = self.effective_profile(&data);
        let img = encode(&data, profile.dtype)?;
        ensure_parent_dir(&self.path)?;
        img.save(&self.path).map_err(|source| WriteError::Image {
            path: self.path.clone(),
            source,
        })?;
        write_sidecars(&self.path, &profile.transform, profile.crs.as_deref())?;
        log::debug!(
            "wrote {}x{}x{} raster to {}",
            profile.width,
            profile.height,
            profile.count,
            self.path.display()
        );
        Ok(())
    }
}

fn encode(data: &RasterArray, dtype: RasterDtype) -> Result<DynamicImage, WriteError> {
    let (w, h) = (data.width as u32, data.height as u32);
    let max = dtype.max_value();
    let mismatch = || WriteError::SizeMismatch {
        expected: data.width * data.height * data.bands,
        actual: data.data.len(),
    };
    let img = match dtype {
        RasterDtype::U8 => {
            let raw: Vec<u8> = data.data.iter().map(|&v| v.round().clamp(0.0, max) as u8).collect();
            match data.bands {
                1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
                2 => ImageBuffer::<LumaA<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageLumaA8),
                3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
                _ => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
            }
        }
        RasterDtype::U16 => {
            let raw: Vec<u16> = data.data.iter().map(|&v| v.round().clamp(0.0, max) as u16).collect();
            match data.bands {
                1 => ImageBuffer::<Luma<u16>, _>::from_raw(w, h, raw).map(DynamicImage::ImageLuma16),
                2 => ImageBuffer::<LumaA<u16>, _>::from_raw(w, h, raw).map(DynamicImage::ImageLumaA16),
                3 => ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, raw).map(DynamicImage::ImageRgb16),
                _ => ImageBuffer::<Rgba<u16>, _>::from_raw(w, h, raw).map(DynamicImage::ImageRgba16),
            }
        }
    };
    img.ok_or_else(mismatch)
}
