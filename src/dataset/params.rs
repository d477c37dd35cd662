//! Dataset parameters: object / scene counts, depth scale and path templates.
//!
//! Templates are relative to `root` unless absolute. Recognized placeholders:
//! `{obj}` for models, `{scene}` for scene documents and `{scene}`, `{im}` for
//! depth images.
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::template::{PathFields, PathTemplate};
use crate::error::StatsError;

#[derive(Clone, Debug, Deserialize)]
pub struct DatasetParams {
    /// Dataset label used in logs and summaries (e.g. `tless`).
    pub name: String,
    #[serde(default)]
    pub root: PathBuf,
    /// Object ids are `1..=obj_count`.
    pub obj_count: u32,
    /// Scene ids are `1..=scene_count` unless the run config lists them.
    pub scene_count: u32,
    /// Factor converting stored depth values to millimetres.
    #[serde(default = "default_depth_scale")]
    pub depth_scale: f32,
    /// PLY model per object. Renderers that do not need geometry may omit it.
    #[serde(default)]
    pub model_mpath: Option<PathTemplate>,
    pub scene_info_mpath: PathTemplate,
    pub scene_gt_mpath: PathTemplate,
    pub test_depth_mpath: PathTemplate,
}

fn default_depth_scale() -> f32 {
    1.0
}

impl DatasetParams {
    /// Check counts, scale and template placeholders.
    pub fn validate(&self) -> Result<(), StatsError> {
        if !(self.depth_scale.is_finite() && self.depth_scale > 0.0) {
            return Err(StatsError::InvalidConfig(format!(
                "dataset '{}': depth_scale must be positive, got {}",
                self.name, self.depth_scale
            )));
        }
        if let Some(model) = &self.model_mpath {
            model.check_fields(&["obj"], &["obj"])?;
        }
        self.scene_info_mpath.check_fields(&["scene"], &["scene"])?;
        self.scene_gt_mpath.check_fields(&["scene"], &["scene"])?;
        self.test_depth_mpath
            .check_fields(&["scene", "im"], &["scene", "im"])?;
        Ok(())
    }

    pub fn obj_ids(&self) -> impl Iterator<Item = u32> {
        1..=self.obj_count
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = u32> {
        1..=self.scene_count
    }

    pub fn model_path(&self, obj_id: u32) -> Result<Option<PathBuf>, StatsError> {
        self.model_mpath
            .as_ref()
            .map(|t| self.resolve(t, &PathFields::object(obj_id)))
            .transpose()
    }

    pub fn scene_info_path(&self, scene_id: u32) -> Result<PathBuf, StatsError> {
        self.resolve(&self.scene_info_mpath, &PathFields::scene(scene_id))
    }

    pub fn scene_gt_path(&self, scene_id: u32) -> Result<PathBuf, StatsError> {
        self.resolve(&self.scene_gt_mpath, &PathFields::scene(scene_id))
    }

    pub fn depth_path(&self, scene_id: u32, im_id: u32) -> Result<PathBuf, StatsError> {
        self.resolve(&self.test_depth_mpath, &PathFields::image(scene_id, im_id))
    }

    pub(crate) fn resolve(
        &self,
        template: &PathTemplate,
        fields: &PathFields,
    ) -> Result<PathBuf, StatsError> {
        Ok(join_root(&self.root, template.render(fields)?))
    }
}

pub(crate) fn join_root(root: &Path, rel: PathBuf) -> PathBuf {
    if rel.is_absolute() || root.as_os_str().is_empty() {
        rel
    } else {
        root.join(rel)
    }
}
