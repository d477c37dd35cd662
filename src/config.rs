//! JSON run configuration for the statistics tool.
//!
//! ```json
//! {
//!   "dataset": { "name": "tless", "root": "/data/tless", ... },
//!   "tolerance": 15,
//!   "render_debug_overlay": true,
//!   "scene_ids": [1, 2],
//!   "renderer": { "kind": "prerendered", "depth_mpath": "rendered/{scene:02}/{im:04}_{gt:02}.png" },
//!   "output": {
//!     "stats_mpath": "out/{scene:02}/gt_stats_delta={delta}.json",
//!     "vis_mpath": "out/vis_delta={delta}/{scene:02}/{im:04}_{gt:02}.jpg"
//!   }
//! }
//! ```
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dataset::{DatasetParams, PathFields, PathTemplate};
use crate::error::{InputKind, StatsError};
use crate::image::io::read_json_file;
use crate::render::{DepthRenderer, PrerenderedDepthRenderer};
use crate::visibility::DEFAULT_TOLERANCE_MM;

#[derive(Clone, Debug, Deserialize)]
pub struct StatsConfig {
    pub dataset: DatasetParams,
    /// Visibility tolerance in millimetres.
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
    /// Write one overlay image per instance.
    #[serde(default, alias = "renderDebugOverlay")]
    pub render_debug_overlay: bool,
    /// Restrict processing to these scenes; defaults to all of the dataset.
    #[serde(default)]
    pub scene_ids: Option<Vec<u32>>,
    #[serde(default)]
    pub renderer: Option<RendererConfig>,
    pub output: OutputConfig,
}

fn default_tolerance() -> f32 {
    DEFAULT_TOLERANCE_MM
}

#[derive(Clone, Debug, Deserialize)]
pub struct OutputConfig {
    /// Per-scene statistics document; placeholders `{scene}`, `{delta}`.
    pub stats_mpath: PathTemplate,
    /// Overlay image per instance; placeholders `{scene}`, `{im}`, `{gt}`,
    /// `{obj}`, `{delta}`.
    #[serde(default)]
    pub vis_mpath: Option<PathTemplate>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RendererConfig {
    /// Depth buffers rendered ahead of time, resolved under the dataset root.
    Prerendered {
        depth_mpath: PathTemplate,
        #[serde(default = "default_rendered_scale")]
        depth_scale: f32,
    },
}

fn default_rendered_scale() -> f32 {
    1.0
}

impl RendererConfig {
    pub fn build(&self, dataset_root: &Path) -> Result<Box<dyn DepthRenderer>, StatsError> {
        match self {
            RendererConfig::Prerendered {
                depth_mpath,
                depth_scale,
            } => Ok(Box::new(PrerenderedDepthRenderer::new(
                dataset_root,
                depth_mpath.clone(),
                *depth_scale,
            )?)),
        }
    }
}

impl StatsConfig {
    pub fn validate(&self) -> Result<(), StatsError> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(StatsError::InvalidConfig(format!(
                "tolerance must be a non-negative distance, got {}",
                self.tolerance
            )));
        }
        self.dataset.validate()?;
        self.output
            .stats_mpath
            .check_fields(&["scene", "delta"], &["scene"])?;
        match (&self.output.vis_mpath, self.render_debug_overlay) {
            (Some(vis), _) => vis.check_fields(
                &["scene", "im", "gt", "obj", "delta"],
                &["scene", "im", "gt"],
            )?,
            (None, true) => {
                return Err(StatsError::InvalidConfig(
                    "render_debug_overlay requires output.vis_mpath".to_string(),
                ))
            }
            (None, false) => {}
        }
        if let Some(RendererConfig::Prerendered { depth_mpath, .. }) = &self.renderer {
            depth_mpath.check_fields(&["scene", "im", "gt", "obj"], &["scene", "im", "gt"])?;
        }
        if let Some(ids) = &self.scene_ids {
            if let Some(bad) = ids.iter().find(|&&id| id == 0 || id > self.dataset.scene_count) {
                return Err(StatsError::InvalidConfig(format!(
                    "scene id {bad} outside 1..={}",
                    self.dataset.scene_count
                )));
            }
        }
        Ok(())
    }

    /// Scenes to process, in ascending order.
    pub fn scene_ids(&self) -> Vec<u32> {
        match &self.scene_ids {
            Some(ids) => {
                let mut ids = ids.clone();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
            None => self.dataset.scene_ids().collect(),
        }
    }

    pub fn stats_path(&self, scene_id: u32) -> Result<PathBuf, StatsError> {
        self.output
            .stats_mpath
            .render(&PathFields::scene(scene_id).with_delta(self.tolerance))
    }

    /// Overlay path of one instance, when overlays are enabled.
    pub fn vis_path(
        &self,
        scene_id: u32,
        im_id: u32,
        gt_id: usize,
        obj_id: u32,
    ) -> Result<Option<PathBuf>, StatsError> {
        if !self.render_debug_overlay {
            return Ok(None);
        }
        let Some(template) = &self.output.vis_mpath else {
            return Ok(None);
        };
        let fields = PathFields {
            obj: Some(obj_id),
            ..PathFields::instance(scene_id, im_id, gt_id).with_delta(self.tolerance)
        };
        template.render(&fields).map(Some)
    }
}

pub fn load_config(path: &Path) -> Result<StatsConfig, StatsError> {
    let config: StatsConfig = read_json_file(path, InputKind::Config)?;
    config.validate()?;
    Ok(config)
}
