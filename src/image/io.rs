//! I/O helpers for prediction planes and JSON reports.
//!
//! - `load_probability_image`: read a PNG/TIFF into a [0, 1] probability plane.
//! - `load_crossfield_image`: read a 4-band RGBA image into crossfield planes.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::ImageF32;
use crate::error::{RasterError, WriteError};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk as a single-band probability plane.
///
/// 8-bit images map `0..=255` onto `[0, 1]`, 16-bit images `0..=65535`.
pub fn load_probability_image(path: &Path) -> Result<ImageF32, RasterError> {
    let img = open_image(path)?.to_luma32f();
    let w = img.width() as usize;
    let h = img.height() as usize;
    Ok(ImageF32 {
        w,
        h,
        stride: w,
        data: img.into_raw(),
    })
}

/// Load a crossfield encoded as an RGBA image.
///
/// Channels are `[Re c0, Im c0, Re c2, Im c2]`, each byte `b` decoded as
/// `2·b/255 − 1`.
pub fn load_crossfield_image(path: &Path) -> Result<[ImageF32; 4], RasterError> {
    let img = open_image(path)?.to_rgba8();
    let w = img.width() as usize;
    let h = img.height() as usize;
    let mut planes = [
        ImageF32::new(w, h),
        ImageF32::new(w, h),
        ImageF32::new(w, h),
        ImageF32::new(w, h),
    ];
    for (x, y, px) in img.enumerate_pixels() {
        for (c, plane) in planes.iter_mut().enumerate() {
            plane.set(x as usize, y as usize, decode_signed_byte(px.0[c]));
        }
    }
    Ok(planes)
}

#[inline]
pub(crate) fn decode_signed_byte(b: u8) -> f32 {
    2.0 * b as f32 / 255.0 - 1.0
}

pub(crate) fn open_image(path: &Path) -> Result<image::DynamicImage, RasterError> {
    image::open(path).map_err(|source| RasterError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), WriteError> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|e| WriteError::io(path, e))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), WriteError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| WriteError::io(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_byte_decoding_spans_unit_interval() {
        assert!((decode_signed_byte(0) + 1.0).abs() < 1e-6);
        assert!((decode_signed_byte(255) - 1.0).abs() < 1e-6);
        assert!(decode_signed_byte(128).abs() < 0.01);
    }
}
