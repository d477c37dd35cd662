#![doc = include_str!("../README.md")]

// Core: depth → range, visibility test, statistics.
pub mod range;
pub mod stats;
pub mod visibility;

// Scene processing and its collaborators.
pub mod camera;
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod image;
pub mod overlay;
pub mod render;

// --- High-level re-exports -------------------------------------------------

pub use crate::camera::{Intrinsics, Pose};
pub use crate::config::{load_config, StatsConfig};
pub use crate::driver::SceneStatsDriver;
pub use crate::error::{StatsError, UnitLocation};
pub use crate::range::depth_to_range;
pub use crate::render::{DepthRenderer, RenderRequest};
pub use crate::stats::{aggregate, ImageStats, InstanceStats, SceneStats};
pub use crate::visibility::{estimate_visibility, DEFAULT_TOLERANCE_MM};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```
/// use gt_stats::prelude::*;
///
/// let intr = Intrinsics::new(500.0, 500.0, 4.0, 4.0);
/// let mut depth = ImageF32::new(8, 8);
/// depth.fill_rect(2, 2, 6, 6, 700.0);
/// let scene = depth_to_range(&depth, &intr);
/// let object = depth_to_range(&depth, &intr);
/// let (stats, _mask) = InstanceStats::from_ranges(&scene, &object, DEFAULT_TOLERANCE_MM).unwrap();
/// assert_eq!(stats.visible_fraction, Some(1.0));
/// ```
pub mod prelude {
    pub use crate::image::{ImageF32, Mask};
    pub use crate::{
        depth_to_range, estimate_visibility, InstanceStats, Intrinsics, DEFAULT_TOLERANCE_MM,
    };
}
