//! Depth buffer → range image conversion.
//!
//! A depth buffer stores, per pixel, the Z coordinate of the observed surface
//! point along the optical axis. A range image stores the Euclidean distance
//! from the camera centre to that point instead. Back-projecting pixel
//! `(x, y)` with depth `d` gives `X = (x − cx)·d/fx`, `Y = (y − cy)·d/fy`,
//! `Z = d`, so the range is `d · sqrt(((x − cx)/fx)² + ((y − cy)/fy)² + 1)`.
//!
//! The per-pixel factor only depends on the intrinsics, so it is computed once
//! per column and per row. Pixels without depth (zero, negative or NaN) stay
//! zero.
use crate::camera::Intrinsics;
use crate::image::{ImageF32, ImageView, ImageViewMut};

/// Convert a depth buffer (millimetres) into a range image (millimetres).
pub fn depth_to_range(depth: &ImageF32, intrinsics: &Intrinsics) -> ImageF32 {
    let mut range = ImageF32::new(depth.w, depth.h);
    let xs: Vec<f64> = (0..depth.w)
        .map(|x| (x as f64 - intrinsics.cx) / intrinsics.fx)
        .collect();

    for y in 0..depth.h {
        let yn = (y as f64 - intrinsics.cy) / intrinsics.fy;
        let yn2 = yn * yn + 1.0;
        let src = depth.row(y);
        let dst = range.row_mut(y);
        for ((out, &d), &xn) in dst.iter_mut().zip(src).zip(&xs) {
            // `d > 0.0` is false for NaN as well.
            if d > 0.0 {
                *out = (f64::from(d) * (xn * xn + yn2).sqrt()) as f32;
            }
        }
    }
    range
}
