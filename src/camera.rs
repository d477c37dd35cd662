//! Pinhole intrinsics and model-to-camera poses.
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// Pinhole camera intrinsics (pixels). Skew is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Extract intrinsics from a 3×3 camera matrix `K`.
    pub fn from_matrix(kmtx: &Matrix3<f64>) -> Result<Self, StatsError> {
        let (fx, fy) = (kmtx[(0, 0)], kmtx[(1, 1)]);
        if !(fx.is_finite() && fy.is_finite()) || fx == 0.0 || fy == 0.0 {
            return Err(StatsError::InvalidConfig(format!(
                "camera matrix has degenerate focal lengths fx={fx} fy={fy}"
            )));
        }
        Ok(Self::new(fx, fy, kmtx[(0, 2)], kmtx[(1, 2)]))
    }

    /// Build from nine row-major values (`cam_K` in the dataset documents).
    pub fn from_row_slice(values: &[f64]) -> Result<Self, StatsError> {
        if values.len() != 9 {
            return Err(StatsError::InvalidConfig(format!(
                "camera matrix needs 9 values, got {}",
                values.len()
            )));
        }
        Self::from_matrix(&Matrix3::from_row_slice(values))
    }

    /// Camera matrix `K`, for renderers that project with a full matrix.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }
}

/// Rigid transform mapping model coordinates into the camera frame.
/// Translation is in millimetres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub r: Matrix3<f64>,
    pub t: Vector3<f64>,
}

impl Pose {
    pub fn new(r: Matrix3<f64>, t: Vector3<f64>) -> Self {
        Self { r, t }
    }

    /// Build from row-major `cam_R_m2c` (9 values) and `cam_t_m2c` (3 values).
    pub fn from_slices(r: &[f64], t: &[f64]) -> Result<Self, StatsError> {
        if r.len() != 9 || t.len() != 3 {
            return Err(StatsError::InvalidConfig(format!(
                "pose needs 9 rotation and 3 translation values, got {} and {}",
                r.len(),
                t.len()
            )));
        }
        Ok(Self::new(
            Matrix3::from_row_slice(r),
            Vector3::new(t[0], t[1], t[2]),
        ))
    }

    /// Map a model point into the camera frame. Renderers apply this to
    /// every vertex before projecting.
    pub fn transform(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.r * p + self.t
    }
}
