//! Drm/Kms types and backend implementations
//!
//! This module drives a single display through the legacy modesetting api of
//! a drm device, using a cpu-mapped dumb buffer as the only framebuffer.
//!
//! ## How to use it
//!
//! A [`DrmPipeline`] owns the device and everything acquired from it. The
//! steps have to be run in order:
//!
//! 1. [`DrmPipeline::acquire_display`] opens the device and selects the first
//!    connected connector, its largest mode and the encoder feeding it.
//! 2. [`DrmPipeline::allocate`] creates a dumb buffer of the mode's size,
//!    registers it as framebuffer and maps it, handing out a cleared
//!    [`PixelView`](crate::backend::allocator::PixelView).
//! 3. [`DrmPipeline::present`] commits the framebuffer to the crtc currently
//!    bound to the encoder.
//! 4. [`DrmPipeline::teardown`] (or dropping the pipeline) releases everything
//!    in reverse order and closes the device.
//!
//! ```rust,no_run
//! use kmsview::backend::drm::{DrmCard, DrmPipeline};
//!
//! # fn main() -> Result<(), kmsview::backend::drm::Error> {
//! let mut pipeline = DrmPipeline::new(true);
//! let target = pipeline.acquire_display(|| DrmCard::open("/dev/dri/card0"))?;
//! let mut view = pipeline.allocate(&target.mode)?;
//! view.set_pixel(0, 0, 0xFFFF_FFFF);
//! pipeline.present(&target)?;
//! pipeline.teardown();
//! # Ok(())
//! # }
//! ```
//!
//! Every step can fail with an [`Error`]. Resources acquired before the
//! failure stay owned by the pipeline until it is torn down.

pub(crate) mod device;
pub mod dumb;
mod error;
mod lifecycle;
pub mod output;
mod present;

pub use device::{
    BufferLayout, ConnectorInfo, CrtcInfo, DisplayMode, DrmCard, DumbMapping, EncoderInfo, KmsDevice,
    Resources,
};
pub use error::Error;
pub use lifecycle::{Acquired, DrmPipeline, Phase, ResourceKind};
pub use output::DisplayTarget;
