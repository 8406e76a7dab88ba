//! Strip images: fixed-size runs of consecutive frames concatenated
//! horizontally, used as the unit of annotation.

pub mod compose;
pub mod window;

pub use compose::{compose_frames, compose_strip, encode_jpeg, StripImage};
pub use window::{middle_label, window_indices};
