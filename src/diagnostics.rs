//! Per-scene run summaries and stage timings.
use serde::{Deserialize, Serialize};

use crate::stats::SceneStats;

/// Timing entry describing a single stage of the scene run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Aggregated timings of one scene, stages summed over all images.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    /// Add `elapsed_ms` to the stage named `label`, creating it if needed.
    pub fn add(&mut self, label: &str, elapsed_ms: f64) {
        match self.stages.iter_mut().find(|s| s.label == label) {
            Some(stage) => stage.elapsed_ms += elapsed_ms,
            None => self.stages.push(StageTiming::new(label, elapsed_ms)),
        }
    }

    pub fn stage_ms(&self, label: &str) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.elapsed_ms)
    }
}

/// Compact description of a processed scene.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSummary {
    pub scene_id: u32,
    pub image_count: usize,
    pub instance_count: usize,
    /// Instances whose rendered mask was empty.
    pub degenerate_count: usize,
    /// Mean of the defined visible fractions.
    pub mean_visible_fraction: Option<f64>,
    pub timing: TimingBreakdown,
}

impl SceneSummary {
    pub fn from_stats(scene_id: u32, stats: &SceneStats, timing: TimingBreakdown) -> Self {
        let instances = stats.values().flatten();
        let fractions: Vec<f64> = instances
            .clone()
            .filter_map(|s| s.visible_fraction)
            .collect();
        let mean_visible_fraction = (!fractions.is_empty())
            .then(|| fractions.iter().sum::<f64>() / fractions.len() as f64);
        Self {
            scene_id,
            image_count: stats.len(),
            instance_count: instances.clone().count(),
            degenerate_count: instances.filter(|s| s.is_degenerate()).count(),
            mean_visible_fraction,
            timing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::InstanceStats;

    #[test]
    fn timing_accumulates_per_label() {
        let mut t = TimingBreakdown::default();
        t.add("render", 1.0);
        t.add("visibility", 0.5);
        t.add("render", 2.0);
        assert_eq!(t.stages.len(), 2);
        assert_eq!(t.stage_ms("render"), Some(3.0));
        assert_eq!(t.stage_ms("overlay"), None);
    }

    #[test]
    fn summary_ignores_undefined_fractions() {
        let visible = InstanceStats {
            pixel_count_all: 4,
            pixel_count_visible: 2,
            pixel_count_valid_measurement: 4,
            visible_fraction: Some(0.5),
            bbox_all: [0, 0, 1, 1],
            bbox_visible: [0, 0, 1, 0],
        };
        let mut stats = SceneStats::new();
        stats.insert(0, vec![visible.clone(), InstanceStats::degenerate()]);
        stats.insert(1, vec![visible]);
        let summary = SceneSummary::from_stats(7, &stats, TimingBreakdown::default());
        assert_eq!(summary.image_count, 2);
        assert_eq!(summary.instance_count, 3);
        assert_eq!(summary.degenerate_count, 1);
        assert_eq!(summary.mean_visible_fraction, Some(0.5));
    }
}
