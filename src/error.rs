//! Error taxonomy for the statistics pipeline.
//!
//! An instance whose rendered mask is empty is not an error; it produces
//! zero counts and sentinel boxes.
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Kind of input a [`StatsError::MissingInput`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Model,
    Depth,
    GroundTruth,
    SceneInfo,
    RenderedDepth,
    Config,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputKind::Model => "model",
            InputKind::Depth => "depth image",
            InputKind::GroundTruth => "ground truth",
            InputKind::SceneInfo => "scene info",
            InputKind::RenderedDepth => "rendered depth",
            InputKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// Scene / image / instance that was being processed when an error occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitLocation {
    pub scene_id: u32,
    pub im_id: Option<u32>,
    pub gt_id: Option<usize>,
}

impl UnitLocation {
    pub fn scene(scene_id: u32) -> Self {
        Self {
            scene_id,
            im_id: None,
            gt_id: None,
        }
    }

    pub fn image(scene_id: u32, im_id: u32) -> Self {
        Self {
            scene_id,
            im_id: Some(im_id),
            gt_id: None,
        }
    }

    pub fn instance(scene_id: u32, im_id: u32, gt_id: usize) -> Self {
        Self {
            scene_id,
            im_id: Some(im_id),
            gt_id: Some(gt_id),
        }
    }
}

impl fmt::Display for UnitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene {}", self.scene_id)?;
        if let Some(im_id) = self.im_id {
            write!(f, ", image {im_id}")?;
        }
        if let Some(gt_id) = self.gt_id {
            write!(f, ", instance {gt_id}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("missing {kind} input {}: {reason}", .path.display())]
    MissingInput {
        kind: InputKind,
        path: PathBuf,
        reason: String,
    },
    #[error("image shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to write {}: {reason}", .path.display())]
    Output { path: PathBuf, reason: String },
    #[error("{location}: {source}")]
    Unit {
        location: UnitLocation,
        #[source]
        source: Box<StatsError>,
    },
}

impl StatsError {
    pub fn missing(kind: InputKind, path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        StatsError::MissingInput {
            kind,
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn output(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        StatsError::Output {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Attach the failing unit; an error that already carries a location
    /// keeps the innermost one.
    pub fn at(self, location: UnitLocation) -> Self {
        match self {
            err @ StatsError::Unit { .. } => err,
            err => StatsError::Unit {
                location,
                source: Box::new(err),
            },
        }
    }

    /// Location of the failing unit, if known.
    pub fn location(&self) -> Option<UnitLocation> {
        match self {
            StatsError::Unit { location, .. } => Some(*location),
            _ => None,
        }
    }
}
