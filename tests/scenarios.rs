mod common;

use common::synthetic_scene::block_image;
use gt_stats::image::EMPTY_BBOX;
use gt_stats::prelude::*;

const W: usize = 20;
const H: usize = 16;
const TOL: f32 = 15.0;

/// 10×10 block at 50 mm, as seen by the object.
fn instance() -> ImageF32 {
    block_image(W, H, 4, 3, 10, 50.0)
}

fn scene_with_block(value: f32) -> ImageF32 {
    block_image(W, H, 4, 3, 10, value)
}

fn stats(scene: &ImageF32, object: &ImageF32, tolerance: f32) -> InstanceStats {
    InstanceStats::from_ranges(scene, object, tolerance)
        .expect("shapes match")
        .0
}

#[test]
fn unoccluded_block_is_fully_visible() {
    let s = stats(&scene_with_block(50.0), &instance(), TOL);
    assert_eq!(s.pixel_count_all, 100);
    assert_eq!(s.pixel_count_visible, 100);
    assert_eq!(s.pixel_count_valid_measurement, 100);
    assert_eq!(s.visible_fraction, Some(1.0));
    assert_eq!(s.bbox_all, [4, 3, 13, 12]);
    assert_eq!(s.bbox_visible, s.bbox_all);
}

#[test]
fn much_closer_measurement_occludes_everything() {
    let s = stats(&scene_with_block(10.0), &instance(), TOL);
    assert_eq!(s.pixel_count_all, 100);
    assert_eq!(s.pixel_count_visible, 0);
    assert_eq!(s.bbox_visible, EMPTY_BBOX);
    assert_eq!(s.visible_fraction, Some(0.0));
}

#[test]
fn missing_measurement_counts_as_visible() {
    let s = stats(&ImageF32::new(W, H), &instance(), TOL);
    assert_eq!(s.pixel_count_visible, 100);
    assert_eq!(s.pixel_count_valid_measurement, 0);
    assert_eq!(s.visible_fraction, Some(1.0));
}

#[test]
fn tolerance_boundary_both_sides() {
    // 40 >= 50 - 15
    assert_eq!(stats(&scene_with_block(40.0), &instance(), TOL).pixel_count_visible, 100);
    // 35 == 50 - 15 is still visible
    assert_eq!(stats(&scene_with_block(35.0), &instance(), TOL).pixel_count_visible, 100);
    // 34 < 35
    let occluded = stats(&scene_with_block(34.0), &instance(), TOL);
    assert_eq!(occluded.pixel_count_visible, 0);
    assert_eq!(occluded.visible_fraction, Some(0.0));
}

#[test]
fn empty_object_is_degenerate_not_nan() {
    let s = stats(&scene_with_block(50.0), &ImageF32::new(W, H), TOL);
    assert_eq!(s.pixel_count_all, 0);
    assert_eq!(s.pixel_count_visible, 0);
    assert_eq!(s.bbox_all, EMPTY_BBOX);
    assert_eq!(s.bbox_visible, EMPTY_BBOX);
    assert_eq!(s.visible_fraction, None);
}

/// Scene with a gradient of measured ranges and a partially covering
/// occluder, so tolerance changes flip individual pixels.
fn ramp_scene() -> (ImageF32, ImageF32) {
    let mut scene = ImageF32::new(W, H);
    let mut object = ImageF32::new(W, H);
    for y in 0..H {
        for x in 0..W {
            object.set(x, y, if x >= 2 && y >= 2 { 600.0 } else { 0.0 });
            let measured = match (x + 3 * y) % 7 {
                0 => 0.0,
                k => 560.0 + 8.0 * k as f32,
            };
            scene.set(x, y, measured);
        }
    }
    (scene, object)
}

#[test]
fn visible_count_is_monotonic_in_tolerance() {
    let (scene, object) = ramp_scene();
    let mut previous = 0;
    for tol in [0.0, 5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0] {
        let s = stats(&scene, &object, tol);
        assert!(
            s.pixel_count_visible >= previous,
            "tolerance {tol} decreased visible count {} -> {}",
            previous,
            s.pixel_count_visible
        );
        assert!(s.pixel_count_visible <= s.pixel_count_all);
        previous = s.pixel_count_visible;
    }
    assert_eq!(previous, stats(&scene, &object, 60.0).pixel_count_all);
}

#[test]
fn visible_box_lies_within_object_box() {
    let (scene, object) = ramp_scene();
    for tol in [0.0, 15.0, 30.0] {
        let s = stats(&scene, &object, tol);
        let (a, v) = (s.bbox_all, s.bbox_visible);
        if v == EMPTY_BBOX {
            continue;
        }
        assert!(v[0] >= a[0] && v[1] >= a[1], "{v:?} not within {a:?}");
        assert!(v[2] <= a[2] && v[3] <= a[3], "{v:?} not within {a:?}");
    }
}

#[test]
fn range_conversion_keeps_comparisons_consistent() {
    // The same depth seen by the sensor and the renderer must stay visible
    // after conversion, wherever it is in the image.
    let intr = Intrinsics::new(120.0, 110.0, 9.5, 7.5);
    let depth = block_image(W, H, 0, 0, 16, 900.0);
    let scene = depth_to_range(&depth, &intr);
    let object = depth_to_range(&depth, &intr);
    let s = stats(&scene, &object, 0.0);
    assert_eq!(s.pixel_count_visible, 256);
    assert_eq!(s.visible_fraction, Some(1.0));
    assert!(scene.data.iter().all(|&r| r == 0.0 || r >= 900.0));
}

#[test]
fn mismatched_resolutions_fail_before_comparison() {
    let err = estimate_visibility(&ImageF32::new(W, H), &ImageF32::new(H, W), TOL).unwrap_err();
    assert!(matches!(err, gt_stats::StatsError::ShapeMismatch { .. }));
}
