//! Buffer allocation and access helpers
//!
//! Buffers are allocated through [`DrmPipeline::allocate`](crate::backend::drm::DrmPipeline::allocate),
//! which hands out a [`PixelView`] over the mapped memory.

mod view;

pub use self::view::{PixelView, BYTES_PER_PIXEL};

pub use drm_fourcc::DrmFourcc as Fourcc;

/// Pixel format of every framebuffer allocated by this crate
pub const FORMAT: Fourcc = Fourcc::Xrgb8888;
