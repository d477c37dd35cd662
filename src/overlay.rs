//! Debug overlay: measured depth in grey with the visibility mask in green.
//!
//! Purely presentational; nothing here feeds back into the statistics.
use std::path::Path;

use crate::error::StatsError;
use crate::image::io::save_rgb_f32;
use crate::image::{ImageF32, Mask};

/// Grey level assigned to the nearest measured pixel.
const NEAR_LEVEL: f32 = 0.2;
/// Grey level assigned to the farthest measured pixel.
const FAR_LEVEL: f32 = 1.0;

/// Map measured depths linearly onto `[near, far]`; missing pixels stay 0.
pub fn normalize_depth(depth: &ImageF32, near: f32, far: f32) -> ImageF32 {
    let mut out = ImageF32::new(depth.w, depth.h);
    let (lo, hi) = depth
        .data
        .iter()
        .filter(|&&d| d > 0.0)
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &d| {
            (lo.min(d), hi.max(d))
        });
    if !lo.is_finite() {
        return out;
    }
    let span = hi - lo;
    for (o, &d) in out.data.iter_mut().zip(&depth.data) {
        if d > 0.0 {
            let t = if span > 0.0 { (d - lo) / span } else { 0.0 };
            *o = near + t * (far - near);
        }
    }
    out
}

/// Blend normalized depth (50%) with the mask in the green channel (50%).
///
/// Returns interleaved RGB in `[0, 1]`.
pub fn compose_overlay(depth: &ImageF32, visible: &Mask) -> Result<Vec<f32>, StatsError> {
    if depth.dims() != visible.dims() {
        return Err(StatsError::ShapeMismatch {
            expected: depth.dims(),
            found: visible.dims(),
        });
    }
    let grey = normalize_depth(depth, NEAR_LEVEL, FAR_LEVEL);
    let mut rgb = Vec::with_capacity(grey.data.len() * 3);
    for (&g, &v) in grey.data.iter().zip(&visible.data) {
        let base = 0.5 * g;
        let green = if v { 0.5 } else { 0.0 };
        rgb.extend_from_slice(&[base, (base + green).min(1.0), base]);
    }
    Ok(rgb)
}

/// Compose and write the overlay of one instance.
pub fn save_overlay(depth: &ImageF32, visible: &Mask, path: &Path) -> Result<(), StatsError> {
    let rgb = compose_overlay(depth, visible)?;
    save_rgb_f32(depth.w, depth.h, &rgb, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_spans_near_to_far() {
        let depth = ImageF32::from_vec(3, 1, vec![0.0, 500.0, 1500.0]).unwrap();
        let n = normalize_depth(&depth, 0.2, 1.0);
        assert_eq!(n.data[0], 0.0);
        assert!((n.data[1] - 0.2).abs() < 1e-6);
        assert!((n.data[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_depth_normalizes_to_black() {
        let n = normalize_depth(&ImageF32::new(2, 2), 0.2, 1.0);
        assert!(n.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn visible_pixels_are_tinted_green() {
        let depth = ImageF32::from_vec(2, 1, vec![1000.0, 1000.0]).unwrap();
        let mut mask = Mask::new(2, 1);
        mask.set(1, 0, true);
        let rgb = compose_overlay(&depth, &mask).unwrap();
        // Constant depth maps to the near level.
        let expected = [0.1, 0.1, 0.1, 0.1, 0.6, 0.1];
        for (got, want) in rgb.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {rgb:?}");
        }
    }
}
