//! Owned boolean per-pixel mask in row-major layout.
//!
//! Object masks, visibility masks and scene-validity masks are all `Mask`s of
//! the same resolution as the range images they were derived from.
use super::{ImageF32, ImageView};
use crate::error::StatsError;

/// Inclusive `[min_x, min_y, max_x, max_y]` box in pixel coordinates.
pub type BBox = [i32; 4];

/// Box reported for a mask without any set pixel.
pub const EMPTY_BBOX: BBox = [-1, -1, -1, -1];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<bool>,
}

impl Mask {
    /// All-false mask of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![false; w * h],
        }
    }

    /// Pixels of `image` that hold a positive value.
    pub fn positive(image: &ImageF32) -> Self {
        Self {
            w: image.w,
            h: image.h,
            data: image.rows().flatten().map(|&v| v > 0.0).collect(),
        }
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        self.data[y * self.w + x] = v;
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Number of pixels set in both `self` and `other`.
    pub fn count_and(&self, other: &Mask) -> Result<usize, StatsError> {
        self.ensure_same_dims(other)?;
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .filter(|(&a, &b)| a && b)
            .count())
    }

    /// Tightest inclusive box around the set pixels, or [`EMPTY_BBOX`].
    pub fn bbox(&self) -> BBox {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (y, row) in self.rows().enumerate() {
            let first = row.iter().position(|&v| v);
            let Some(x_min) = first else {
                continue;
            };
            // `first` found a set pixel, so a last one exists too.
            let x_max = row.iter().rposition(|&v| v).unwrap_or(x_min);
            bounds = Some(match bounds {
                None => (x_min, y, x_max, y),
                Some((bx0, by0, bx1, _)) => (bx0.min(x_min), by0, bx1.max(x_max), y),
            });
        }
        match bounds {
            Some((x0, y0, x1, y1)) => [x0 as i32, y0 as i32, x1 as i32, y1 as i32],
            None => EMPTY_BBOX,
        }
    }

    pub(crate) fn ensure_same_dims(&self, other: &Mask) -> Result<(), StatsError> {
        if self.dims() != other.dims() {
            return Err(StatsError::ShapeMismatch {
                expected: self.dims(),
                found: other.dims(),
            });
        }
        Ok(())
    }
}

impl ImageView for Mask {
    type Pixel = bool;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.w
    }
    #[inline]
    fn row(&self, y: usize) -> &[bool] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_of_empty_mask_is_sentinel() {
        assert_eq!(Mask::new(5, 4).bbox(), EMPTY_BBOX);
    }

    #[test]
    fn bbox_is_inclusive_and_tight() {
        let mut mask = Mask::new(8, 6);
        mask.set(2, 1, true);
        mask.set(5, 4, true);
        mask.set(1, 3, true);
        assert_eq!(mask.bbox(), [1, 1, 5, 4]);
        assert_eq!(mask.count(), 3);
    }

    #[test]
    fn count_and_requires_matching_shapes() {
        let a = Mask::new(4, 4);
        let b = Mask::new(4, 5);
        assert!(matches!(
            a.count_and(&b),
            Err(StatsError::ShapeMismatch { .. })
        ));
    }
}
