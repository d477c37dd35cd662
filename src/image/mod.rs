pub mod f32;
pub mod io;
pub mod mask;
pub mod traits;

pub use self::f32::ImageF32;
pub use self::mask::{BBox, Mask, EMPTY_BBOX};
pub use self::traits::{ImageView, ImageViewMut, Rows};
