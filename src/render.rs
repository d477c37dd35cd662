//! Renderer contract and a file-backed implementation.
//!
//! A renderer produces the depth buffer (millimetres along the optical axis,
//! `0` where the object is absent) of one model at one pose, with the same
//! resolution and intrinsics as the measured image. Poses map model
//! coordinates into the camera frame, matching the ground-truth convention.
use std::path::PathBuf;

use crate::camera::{Intrinsics, Pose};
use crate::dataset::params::join_root;
use crate::dataset::template::{PathFields, PathTemplate};
use crate::dataset::Model;
use crate::error::{InputKind, StatsError};
use crate::image::io::load_depth_as;
use crate::image::ImageF32;

/// Identifies one ground-truth instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceKey {
    pub scene_id: u32,
    pub im_id: u32,
    pub gt_id: usize,
    pub obj_id: u32,
}

/// Everything a renderer needs to draw one ground-truth instance.
#[derive(Clone, Debug)]
pub struct RenderRequest<'a> {
    pub key: InstanceKey,
    /// `None` when the dataset has no model template configured.
    pub model: Option<&'a Model>,
    /// `(width, height)` of the measured image.
    pub image_size: (usize, usize),
    pub intrinsics: Intrinsics,
    pub pose: Pose,
}

pub trait DepthRenderer: Send + Sync {
    fn render(&self, request: &RenderRequest<'_>) -> Result<ImageF32, StatsError>;
}

/// Reads depth buffers rendered ahead of time, one file per instance.
///
/// The template may use `{scene}`, `{im}`, `{gt}` and `{obj}`.
#[derive(Clone, Debug)]
pub struct PrerenderedDepthRenderer {
    root: PathBuf,
    template: PathTemplate,
    depth_scale: f32,
}

impl PrerenderedDepthRenderer {
    pub fn new(
        root: impl Into<PathBuf>,
        template: PathTemplate,
        depth_scale: f32,
    ) -> Result<Self, StatsError> {
        template.check_fields(&["scene", "im", "gt", "obj"], &["scene", "im", "gt"])?;
        if !(depth_scale.is_finite() && depth_scale > 0.0) {
            return Err(StatsError::InvalidConfig(format!(
                "rendered depth_scale must be positive, got {depth_scale}"
            )));
        }
        Ok(Self {
            root: root.into(),
            template,
            depth_scale,
        })
    }

    pub fn path_for(&self, key: &InstanceKey) -> Result<PathBuf, StatsError> {
        let fields = PathFields {
            obj: Some(key.obj_id),
            ..PathFields::instance(key.scene_id, key.im_id, key.gt_id)
        };
        Ok(join_root(&self.root, self.template.render(&fields)?))
    }
}

impl DepthRenderer for PrerenderedDepthRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<ImageF32, StatsError> {
        let path = self.path_for(&request.key)?;
        let depth = load_depth_as(&path, self.depth_scale, InputKind::RenderedDepth)?;
        if depth.dims() != request.image_size {
            return Err(StatsError::ShapeMismatch {
                expected: request.image_size,
                found: depth.dims(),
            });
        }
        Ok(depth)
    }
}
