//! Scene driver: walks scenes, images and ground-truth instances, renders
//! each instance, runs the visibility test and aggregates statistics.
//!
//! Per instance the data flows strictly bottom-up:
//! rendered depth → range image → visibility mask → [`InstanceStats`].
//! The measured range image of an image is computed once and shared by all
//! of its instances. Instance results stay index-aligned with the
//! ground-truth list, also when the `parallel` feature processes instances
//! concurrently.
//!
//! Any failure aborts the scene and is reported with the failing scene,
//! image and instance. Overlays are the exception: a failed overlay write is
//! logged and the statistics are kept. Statistics are only written once a whole scene
//! succeeded, atomically, so earlier scenes' outputs stay intact.
use log::{debug, info, warn};
use std::time::Instant;

use crate::camera::Intrinsics;
use crate::config::StatsConfig;
use crate::dataset::{
    load_scene_gt, load_scene_info, GroundTruth, Model, ModelStore, SceneInfoMap,
};
use crate::diagnostics::{SceneSummary, TimingBreakdown};
use crate::error::{InputKind, StatsError, UnitLocation};
use crate::image::io::{load_depth_image, write_json_file};
use crate::image::ImageF32;
use crate::overlay::save_overlay;
use crate::range::depth_to_range;
use crate::render::{DepthRenderer, InstanceKey, RenderRequest};
use crate::stats::{ImageStats, InstanceStats, SceneStats};

const STAGE_LOAD: &str = "load";
const STAGE_RENDER: &str = "render";
const STAGE_RANGE: &str = "range";
const STAGE_VISIBILITY: &str = "visibility";
const STAGE_OVERLAY: &str = "overlay";

/// Measured data of one image shared by all of its instances.
struct MeasuredImage {
    im_id: u32,
    intrinsics: Intrinsics,
    depth: ImageF32,
    range: ImageF32,
}

struct InstanceOutcome {
    stats: InstanceStats,
    timings: Vec<(&'static str, f64)>,
}

pub struct SceneStatsDriver<'a> {
    config: &'a StatsConfig,
    models: &'a ModelStore,
    renderer: &'a dyn DepthRenderer,
}

impl<'a> SceneStatsDriver<'a> {
    pub fn new(
        config: &'a StatsConfig,
        models: &'a ModelStore,
        renderer: &'a dyn DepthRenderer,
    ) -> Self {
        Self {
            config,
            models,
            renderer,
        }
    }

    /// Process and persist every configured scene; stops at the first error.
    pub fn run(&self) -> Result<Vec<SceneSummary>, StatsError> {
        self.config
            .scene_ids()
            .into_iter()
            .map(|scene_id| self.run_scene(scene_id))
            .collect()
    }

    /// Process one scene and write its statistics document.
    pub fn run_scene(&self, scene_id: u32) -> Result<SceneSummary, StatsError> {
        let (stats, summary) = self.process_scene(scene_id)?;
        let path = self
            .config
            .stats_path(scene_id)
            .map_err(|e| e.at(UnitLocation::scene(scene_id)))?;
        write_json_file(&path, &stats).map_err(|e| e.at(UnitLocation::scene(scene_id)))?;
        info!(
            "scene {} done: images={} instances={} mean_visible_fraction={:?} -> {}",
            scene_id,
            summary.image_count,
            summary.instance_count,
            summary.mean_visible_fraction,
            path.display()
        );
        Ok(summary)
    }

    /// Compute the statistics of one scene without persisting them.
    /// Overlays are written when enabled.
    pub fn process_scene(&self, scene_id: u32) -> Result<(SceneStats, SceneSummary), StatsError> {
        let scene_start = Instant::now();
        let mut timing = TimingBreakdown::default();
        let at_scene = |e: StatsError| e.at(UnitLocation::scene(scene_id));

        let dataset = &self.config.dataset;
        let info_path = dataset.scene_info_path(scene_id).map_err(at_scene)?;
        let gt_path = dataset.scene_gt_path(scene_id).map_err(at_scene)?;
        let info = load_scene_info(&info_path).map_err(at_scene)?;
        let gts = load_scene_gt(&gt_path).map_err(at_scene)?;
        info!(
            "dataset={} scene={} images={} tolerance={}",
            dataset.name,
            scene_id,
            gts.len(),
            self.config.tolerance
        );

        let mut stats = SceneStats::new();
        for (&im_id, im_gts) in &gts {
            let image_stats = self
                .process_image(scene_id, im_id, im_gts, &info, &info_path, &mut timing)
                .map_err(|e| e.at(UnitLocation::image(scene_id, im_id)))?;
            stats.insert(im_id, image_stats);
        }

        timing.total_ms = scene_start.elapsed().as_secs_f64() * 1000.0;
        let summary = SceneSummary::from_stats(scene_id, &stats, timing);
        Ok((stats, summary))
    }

    fn process_image(
        &self,
        scene_id: u32,
        im_id: u32,
        gts: &[GroundTruth],
        info: &SceneInfoMap,
        info_path: &std::path::Path,
        timing: &mut TimingBreakdown,
    ) -> Result<ImageStats, StatsError> {
        debug!("scene={} im={} instances={}", scene_id, im_id, gts.len());
        let load_start = Instant::now();
        let im_info = info.get(&im_id).ok_or_else(|| {
            StatsError::missing(
                InputKind::SceneInfo,
                info_path,
                format!("no entry for image {im_id}"),
            )
        })?;
        let intrinsics = im_info.intrinsics()?;
        let scale = im_info.depth_scale.unwrap_or(self.config.dataset.depth_scale);
        let depth_path = self.config.dataset.depth_path(scene_id, im_id)?;
        let depth = load_depth_image(&depth_path, scale)?;
        timing.add(STAGE_LOAD, elapsed_ms(load_start));

        let range_start = Instant::now();
        let range = depth_to_range(&depth, &intrinsics);
        timing.add(STAGE_RANGE, elapsed_ms(range_start));

        let measured = MeasuredImage {
            im_id,
            intrinsics,
            depth,
            range,
        };
        let outcomes = self.process_instances(scene_id, &measured, gts)?;

        let mut image_stats = ImageStats::with_capacity(outcomes.len());
        for outcome in outcomes {
            for (label, ms) in outcome.timings {
                timing.add(label, ms);
            }
            image_stats.push(outcome.stats);
        }
        Ok(image_stats)
    }

    #[cfg(not(feature = "parallel"))]
    fn process_instances(
        &self,
        scene_id: u32,
        measured: &MeasuredImage,
        gts: &[GroundTruth],
    ) -> Result<Vec<InstanceOutcome>, StatsError> {
        gts.iter()
            .enumerate()
            .map(|(gt_id, gt)| self.process_instance(scene_id, measured, gt_id, gt))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn process_instances(
        &self,
        scene_id: u32,
        measured: &MeasuredImage,
        gts: &[GroundTruth],
    ) -> Result<Vec<InstanceOutcome>, StatsError> {
        use rayon::prelude::*;

        gts.par_iter()
            .enumerate()
            .map(|(gt_id, gt)| self.process_instance(scene_id, measured, gt_id, gt))
            .collect()
    }

    fn process_instance(
        &self,
        scene_id: u32,
        measured: &MeasuredImage,
        gt_id: usize,
        gt: &GroundTruth,
    ) -> Result<InstanceOutcome, StatsError> {
        let im_id = measured.im_id;
        let location = UnitLocation::instance(scene_id, im_id, gt_id);
        let key = InstanceKey {
            scene_id,
            im_id,
            gt_id,
            obj_id: gt.obj_id,
        };
        self.instance_outcome(measured, &key, gt)
            .map_err(|e| e.at(location))
    }

    fn instance_outcome(
        &self,
        measured: &MeasuredImage,
        key: &InstanceKey,
        gt: &GroundTruth,
    ) -> Result<InstanceOutcome, StatsError> {
        let mut timings = Vec::with_capacity(4);

        let render_start = Instant::now();
        let request = RenderRequest {
            key: *key,
            model: self.model_for(gt.obj_id)?,
            image_size: measured.depth.dims(),
            intrinsics: measured.intrinsics,
            pose: gt.pose()?,
        };
        let rendered = self.renderer.render(&request)?;
        if rendered.dims() != measured.depth.dims() {
            return Err(StatsError::ShapeMismatch {
                expected: measured.depth.dims(),
                found: rendered.dims(),
            });
        }
        timings.push((STAGE_RENDER, elapsed_ms(render_start)));

        let range_start = Instant::now();
        let instance_range = depth_to_range(&rendered, &measured.intrinsics);
        timings.push((STAGE_RANGE, elapsed_ms(range_start)));

        let vis_start = Instant::now();
        let (stats, visible) =
            InstanceStats::from_ranges(&measured.range, &instance_range, self.config.tolerance)?;
        timings.push((STAGE_VISIBILITY, elapsed_ms(vis_start)));

        if stats.is_degenerate() {
            debug!(
                "scene={} im={} gt={} obj={}: object covers no pixel",
                key.scene_id, key.im_id, key.gt_id, key.obj_id
            );
        } else {
            debug!(
                "scene={} im={} gt={} obj={}: all={} visible={} valid={}",
                key.scene_id,
                key.im_id,
                key.gt_id,
                key.obj_id,
                stats.pixel_count_all,
                stats.pixel_count_visible,
                stats.pixel_count_valid_measurement
            );
        }

        if let Some(path) =
            self.config
                .vis_path(key.scene_id, key.im_id, key.gt_id, key.obj_id)?
        {
            let overlay_start = Instant::now();
            match save_overlay(&measured.depth, &visible, &path) {
                Ok(()) => timings.push((STAGE_OVERLAY, elapsed_ms(overlay_start))),
                Err(err) => warn!(
                    "scene={} im={} gt={}: overlay skipped: {}",
                    key.scene_id, key.im_id, key.gt_id, err
                ),
            }
        }

        Ok(InstanceOutcome { stats, timings })
    }

    fn model_for(&self, obj_id: u32) -> Result<Option<&'a Model>, StatsError> {
        if self.models.is_empty() {
            return Ok(None);
        }
        match self.models.get(obj_id) {
            Some(model) => Ok(Some(model.as_ref())),
            None => {
                let path = self
                    .config
                    .dataset
                    .model_path(obj_id)?
                    .unwrap_or_default();
                Err(StatsError::missing(
                    InputKind::Model,
                    path,
                    format!("no model loaded for object {obj_id}"),
                ))
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
