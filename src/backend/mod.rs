//! Backend helpers
//!
//! - [`drm`] acquires a display, allocates a framebuffer and presents it
//! - [`allocator`] gives access to the pixels of an allocated framebuffer
//! - [`renderer`] draws decoded images into such a framebuffer

pub mod allocator;
pub mod drm;
pub mod renderer;
