//! Software rendering into mapped framebuffers
//!
//! The only operation provided is [`blit`]: nearest-neighbor scaling of a
//! [`DecodedImage`](crate::decode::DecodedImage) into a
//! [`PixelView`](crate::backend::allocator::PixelView), centered and with
//! its aspect ratio preserved.

mod blit;

pub use self::blit::{blit, pack_xrgb, placement, Placement};
