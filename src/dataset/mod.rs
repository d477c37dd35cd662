//! Dataset-side collaborators: parameters and path templates, ground-truth
//! documents, and object models.
pub mod gt;
pub mod model;
pub mod params;
pub mod template;

pub use gt::{load_scene_gt, load_scene_info, GroundTruth, SceneGt, SceneInfo, SceneInfoMap};
pub use model::{Model, ModelStore};
pub use params::DatasetParams;
pub use template::{PathFields, PathTemplate};
