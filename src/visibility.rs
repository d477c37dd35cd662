//! Per-pixel visibility of a rendered object against the measured scene.
//!
//! A pixel covered by the rendered object (`instance > 0`) is visible when the
//! sensor has no measurement there (`scene == 0`) or when the measured surface
//! is not closer than the object surface by more than `tolerance`:
//! `scene >= instance − tolerance`. Everything else is occluded by something
//! nearer to the camera. The test is purely local and does not attribute the
//! occluder.
use crate::error::StatsError;
use crate::image::{ImageF32, ImageView, Mask};

/// Default visibility tolerance in millimetres.
pub const DEFAULT_TOLERANCE_MM: f32 = 15.0;

#[inline]
fn is_visible(scene: f32, instance: f32, tolerance: f32) -> bool {
    instance > 0.0 && (scene == 0.0 || scene >= instance - tolerance)
}

/// Estimate the visibility mask of one ground-truth instance.
///
/// Both range images must share the same resolution; the check runs before
/// any pixel is compared.
pub fn estimate_visibility(
    scene: &ImageF32,
    instance: &ImageF32,
    tolerance: f32,
) -> Result<Mask, StatsError> {
    if scene.dims() != instance.dims() {
        return Err(StatsError::ShapeMismatch {
            expected: scene.dims(),
            found: instance.dims(),
        });
    }
    let mut mask = Mask::new(instance.w, instance.h);
    for (y, (srow, irow)) in scene.rows().zip(instance.rows()).enumerate() {
        let out = &mut mask.data[y * instance.w..(y + 1) * instance.w];
        for ((o, &s), &i) in out.iter_mut().zip(srow).zip(irow) {
            *o = is_visible(s, i, tolerance);
        }
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(w: usize, h: usize, value: f32) -> ImageF32 {
        let mut img = ImageF32::new(w, h);
        img.fill_rect(2, 2, 6, 6, value);
        img
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let err = estimate_visibility(&ImageF32::new(4, 4), &ImageF32::new(5, 4), 15.0);
        assert!(matches!(
            err,
            Err(StatsError::ShapeMismatch {
                expected: (4, 4),
                found: (5, 4)
            })
        ));
    }

    #[test]
    fn empty_instance_gives_empty_mask() {
        let scene = block(8, 8, 100.0);
        let mask = estimate_visibility(&scene, &ImageF32::new(8, 8), 15.0).unwrap();
        assert!(mask.is_empty());
    }

    #[test]
    fn pixels_outside_object_are_never_visible() {
        let scene = ImageF32::new(8, 8);
        let instance = block(8, 8, 50.0);
        let mask = estimate_visibility(&scene, &instance, 15.0).unwrap();
        assert_eq!(mask.count(), 16);
        assert!(!mask.get(0, 0));
        assert!(mask.get(2, 2));
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        assert!(is_visible(35.0, 50.0, 15.0));
        assert!(!is_visible(34.999, 50.0, 15.0));
        assert!(is_visible(1000.0, 50.0, 0.0));
    }
}
