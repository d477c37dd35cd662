//! Ground-truth annotations and per-image camera info of one scene.
//!
//! Both documents are JSON objects keyed by image id:
//!
//! ```json
//! { "0": [{ "obj_id": 2, "cam_R_m2c": [9 values], "cam_t_m2c": [3 values] }] }
//! { "0": { "cam_K": [9 values], "depth_scale": 0.1 } }
//! ```
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::camera::{Intrinsics, Pose};
use crate::error::{InputKind, StatsError};
use crate::image::io::read_json_file;

/// One annotated object occurrence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub obj_id: u32,
    #[serde(rename = "cam_R_m2c")]
    pub cam_r_m2c: Vec<f64>,
    pub cam_t_m2c: Vec<f64>,
    /// Annotated box `[x, y, w, h]`, informative only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj_bb: Option<[i32; 4]>,
}

impl GroundTruth {
    pub fn pose(&self) -> Result<Pose, StatsError> {
        Pose::from_slices(&self.cam_r_m2c, &self.cam_t_m2c)
    }
}

/// Camera parameters of one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    #[serde(rename = "cam_K")]
    pub cam_k: Vec<f64>,
    /// Overrides the dataset depth scale for this image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_scale: Option<f32>,
}

impl SceneInfo {
    pub fn intrinsics(&self) -> Result<Intrinsics, StatsError> {
        Intrinsics::from_row_slice(&self.cam_k)
    }
}

pub type SceneGt = BTreeMap<u32, Vec<GroundTruth>>;
pub type SceneInfoMap = BTreeMap<u32, SceneInfo>;

pub fn load_scene_gt(path: &Path) -> Result<SceneGt, StatsError> {
    read_json_file(path, InputKind::GroundTruth)
}

pub fn load_scene_info(path: &Path) -> Result<SceneInfoMap, StatsError> {
    read_json_file(path, InputKind::SceneInfo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gt_document_with_integer_keys() {
        let gt: SceneGt = serde_json::from_str(
            r#"{ "4": [ { "obj_id": 2,
                        "cam_R_m2c": [1,0,0, 0,1,0, 0,0,1],
                        "cam_t_m2c": [10, -5, 700],
                        "obj_bb": [1, 2, 3, 4] } ] }"#,
        )
        .unwrap();
        let entry = &gt[&4][0];
        assert_eq!(entry.obj_id, 2);
        assert_eq!(entry.pose().unwrap().t.z, 700.0);
        assert_eq!(entry.obj_bb, Some([1, 2, 3, 4]));
    }

    #[test]
    fn parses_info_with_optional_depth_scale() {
        let info: SceneInfoMap = serde_json::from_str(
            r#"{ "0": { "cam_K": [500,0,320, 0,500,240, 0,0,1] },
                 "1": { "cam_K": [500,0,320, 0,500,240, 0,0,1], "depth_scale": 0.1 } }"#,
        )
        .unwrap();
        assert_eq!(info[&0].depth_scale, None);
        assert_eq!(info[&1].depth_scale, Some(0.1));
        assert_eq!(info[&0].intrinsics().unwrap().cx, 320.0);
    }

    #[test]
    fn missing_file_is_missing_input() {
        let err = load_scene_gt(Path::new("/nonexistent/gt.json")).unwrap_err();
        assert!(matches!(
            err,
            StatsError::MissingInput {
                kind: InputKind::GroundTruth,
                ..
            }
        ));
    }
}
