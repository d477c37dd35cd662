//! Per-instance pixel counts, visible fraction and 2D boxes.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StatsError;
use crate::image::{BBox, ImageF32, Mask, EMPTY_BBOX};
use crate::visibility::estimate_visibility;

/// Statistics of one ground-truth instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStats {
    /// Pixels covered by the rendered object.
    pub pixel_count_all: usize,
    /// Object pixels judged visible.
    pub pixel_count_visible: usize,
    /// Object pixels where the scene has a measurement.
    pub pixel_count_valid_measurement: usize,
    /// `visible / all`; `None` when the object covers no pixel.
    pub visible_fraction: Option<f64>,
    pub bbox_all: BBox,
    pub bbox_visible: BBox,
}

impl InstanceStats {
    /// Statistics of an instance that covers no pixel.
    pub fn degenerate() -> Self {
        Self {
            pixel_count_all: 0,
            pixel_count_visible: 0,
            pixel_count_valid_measurement: 0,
            visible_fraction: None,
            bbox_all: EMPTY_BBOX,
            bbox_visible: EMPTY_BBOX,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.pixel_count_all == 0
    }

    /// Run the visibility test on a pair of range images and aggregate.
    ///
    /// Returns the visibility mask too so callers can render overlays.
    pub fn from_ranges(
        scene: &ImageF32,
        instance: &ImageF32,
        tolerance: f32,
    ) -> Result<(Self, Mask), StatsError> {
        let visible = estimate_visibility(scene, instance, tolerance)?;
        let object = Mask::positive(instance);
        let scene_valid = Mask::positive(scene);
        let stats = aggregate(&object, &visible, &scene_valid)?;
        Ok((stats, visible))
    }
}

/// Aggregate the masks of one instance into [`InstanceStats`].
pub fn aggregate(
    object: &Mask,
    visible: &Mask,
    scene_valid: &Mask,
) -> Result<InstanceStats, StatsError> {
    object.ensure_same_dims(visible)?;
    let pixel_count_all = object.count();
    let pixel_count_visible = visible.count();
    let pixel_count_valid_measurement = object.count_and(scene_valid)?;

    let visible_fraction =
        (pixel_count_all > 0).then(|| pixel_count_visible as f64 / pixel_count_all as f64);

    Ok(InstanceStats {
        pixel_count_all,
        pixel_count_visible,
        pixel_count_valid_measurement,
        visible_fraction,
        bbox_all: object.bbox(),
        bbox_visible: visible.bbox(),
    })
}

/// Statistics of all instances of one image, index-aligned with its
/// ground-truth list.
pub type ImageStats = Vec<InstanceStats>;

/// Per-scene output keyed by image id.
pub type SceneStats = BTreeMap<u32, ImageStats>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_instance_has_no_fraction() {
        let empty = Mask::new(6, 6);
        let stats = aggregate(&empty, &empty, &empty).unwrap();
        assert_eq!(stats, InstanceStats::degenerate());
        assert!(stats.is_degenerate());
    }

    #[test]
    fn valid_measurement_counts_only_object_pixels() {
        let mut object = Mask::new(4, 4);
        let mut valid = Mask::new(4, 4);
        for x in 0..4 {
            object.set(x, 1, true);
            valid.set(x, 1, x % 2 == 0);
            valid.set(x, 3, true);
        }
        let visible = object.clone();
        let stats = aggregate(&object, &visible, &valid).unwrap();
        assert_eq!(stats.pixel_count_all, 4);
        assert_eq!(stats.pixel_count_valid_measurement, 2);
        assert_eq!(stats.visible_fraction, Some(1.0));
        assert_eq!(stats.bbox_all, [0, 1, 3, 1]);
    }

    #[test]
    fn undefined_fraction_serializes_as_null() {
        let json = serde_json::to_value(InstanceStats::degenerate()).unwrap();
        assert!(json["visibleFraction"].is_null());
        assert_eq!(json["bboxAll"], serde_json::json!([-1, -1, -1, -1]));
        assert_eq!(json["pixelCountValidMeasurement"], 0);
    }
}
