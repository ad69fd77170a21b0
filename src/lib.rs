#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # kmsview: still images on bare kms outputs
//!
//! This crate displays a single image on the first connected output of a
//! linux drm device, without any display server involved. The image is
//! scaled to the largest mode of the output, centered, and drawn into a
//! cpu-mapped dumb buffer that is then scanned out through a legacy mode-set.
//!
//! ## Structure of the crate
//!
//! - [`backend`] contains the interaction with the kernel: device access,
//!   output selection, framebuffer allocation and presentation in
//!   [`backend::drm`], the pixel buffer view in [`backend::allocator`] and
//!   the software blit in [`backend::renderer`].
//! - [`decode`] turns image files into rgb samples.
//! - [`config`] and [`viewer`] make up the command line program.
//!
//! ### Logging
//!
//! kmsview uses [`tracing`] for all of its logging. Every step of the display
//! pipeline runs inside a span named after it. The binary honors `RUST_LOG`
//! and logs at `info` level otherwise.

pub mod backend;
pub mod config;
pub mod decode;
pub mod utils;
pub mod viewer;

pub use backend::drm::Error;
