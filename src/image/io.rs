//! I/O helpers for depth images, overlays and JSON documents.
//!
//! - `load_depth_image`: read a 16-bit (or 8-bit luma) depth image into millimetres.
//! - `save_rgb_f32`: write a `[0, 1]` RGB float buffer to any `image` format.
//! - `read_json_file`: deserialize a JSON document.
//! - `write_json_file`: pretty-print a serializable value to disk atomically.
use super::ImageF32;
use crate::error::{InputKind, StatsError};
use image::{DynamicImage, Rgb, RgbImage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Load a depth image and multiply raw values by `scale` (→ millimetres).
///
/// Accepts 8-bit and 16-bit luma. 16-bit images with several channels are
/// read from their first channel. Other layouts are rejected.
pub fn load_depth_image(path: &Path, scale: f32) -> Result<ImageF32, StatsError> {
    load_depth_as(path, scale, InputKind::Depth)
}

pub(crate) fn load_depth_as(
    path: &Path,
    scale: f32,
    kind: InputKind,
) -> Result<ImageF32, StatsError> {
    let img = image::open(path).map_err(|e| StatsError::missing(kind, path, e))?;
    let (w, h) = (img.width() as usize, img.height() as usize);
    let data = depth_samples(img).map_err(|reason| StatsError::missing(kind, path, reason))?;
    let mut depth = ImageF32::from_vec(w, h, data)?;
    depth.scale(scale);
    Ok(depth)
}

/// Raw depth samples of a decoded image, one per pixel.
fn depth_samples(img: DynamicImage) -> Result<Vec<f32>, String> {
    let first_channel = |raw: Vec<u16>, channels: usize| -> Vec<f32> {
        raw.into_iter().step_by(channels).map(f32::from).collect()
    };
    match img {
        DynamicImage::ImageLuma8(buf) => Ok(buf.into_raw().into_iter().map(f32::from).collect()),
        DynamicImage::ImageLuma16(buf) => Ok(first_channel(buf.into_raw(), 1)),
        DynamicImage::ImageLumaA16(buf) => Ok(first_channel(buf.into_raw(), 2)),
        DynamicImage::ImageRgb16(buf) => Ok(first_channel(buf.into_raw(), 3)),
        DynamicImage::ImageRgba16(buf) => Ok(first_channel(buf.into_raw(), 4)),
        other => Err(format!("unsupported depth format {:?}", other.color())),
    }
}

/// Save an RGB float buffer (`w * h * 3`, values in `[0, 1]`) to `path`.
pub fn save_rgb_f32(w: usize, h: usize, rgb: &[f32], path: &Path) -> Result<(), StatsError> {
    if rgb.len() != w * h * 3 {
        return Err(StatsError::ShapeMismatch {
            expected: (w, h),
            found: (rgb.len() / 3, 1),
        });
    }
    ensure_parent_dir(path)?;
    let mut out = RgbImage::new(w as u32, h as u32);
    for (i, px) in rgb.chunks_exact(3).enumerate() {
        let to_u8 = |v: f32| (v * 255.0).round().clamp(0.0, 255.0) as u8;
        out.put_pixel(
            (i % w) as u32,
            (i / w) as u32,
            Rgb([to_u8(px[0]), to_u8(px[1]), to_u8(px[2])]),
        );
    }
    out.save(path).map_err(|e| StatsError::output(path, e))
}

/// Deserialize a JSON document; any failure is reported as missing input.
pub fn read_json_file<T: DeserializeOwned>(path: &Path, kind: InputKind) -> Result<T, StatsError> {
    let data = fs::read_to_string(path).map_err(|e| StatsError::missing(kind, path, e))?;
    serde_json::from_str(&data).map_err(|e| StatsError::missing(kind, path, e))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
///
/// The document is written to a sibling temporary file and renamed into
/// place, so readers never observe a partial file.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), StatsError> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| StatsError::output(path, e))?;
    let tmp = tmp_path(path);
    fs::write(&tmp, json).map_err(|e| StatsError::output(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StatsError::output(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent_dir(path: &Path) -> Result<(), StatsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StatsError::output(parent, e))?;
        }
    }
    Ok(())
}
