use std::{io, path::PathBuf};

use crate::utils::{Buffer, Physical, Size};

/// Errors thrown while driving a display through the kernel modesetting api
///
/// Every variant is terminal for the current run. Variants originating from a
/// system call carry the device they were issued on and the underlying error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The device node could not be opened
    #[error("Failed to open drm device `{path:?}` ({source})")]
    DeviceOpen {
        /// Path of the device node
        path: PathBuf,
        /// Underlying system error
        #[source]
        source: io::Error,
    },
    /// The resource handles of the device could not be queried
    #[error("Failed to query resources on device `{dev:?}` ({source})")]
    ResourceQuery {
        /// Device on which the error was generated
        dev: Option<PathBuf>,
        /// Underlying system error
        #[source]
        source: io::Error,
    },
    /// No connector is connected with at least one mode
    #[error("No connected connector with a usable mode found on device `{dev:?}`")]
    NoActiveOutput {
        /// Device that was scanned
        dev: Option<PathBuf>,
    },
    /// No encoder could be resolved for the selected connector
    #[error("No encoder found for connector `{connector}` on device `{dev:?}`")]
    NoEncoder {
        /// Name of the connector
        connector: String,
        /// Device that was scanned
        dev: Option<PathBuf>,
    },
    /// Allocation of the dumb buffer failed
    #[error("Failed to create dumb buffer of size {size} on device `{dev:?}` ({source})")]
    BufferCreate {
        /// Requested size
        size: Size<u32, Physical>,
        /// Device on which the error was generated
        dev: Option<PathBuf>,
        /// Underlying system error
        #[source]
        source: io::Error,
    },
    /// The dumb buffer could not be registered as a framebuffer
    #[error("Failed to add framebuffer on device `{dev:?}` ({source})")]
    FramebufferRegister {
        /// Device on which the error was generated
        dev: Option<PathBuf>,
        /// Underlying system error
        #[source]
        source: io::Error,
    },
    /// The dumb buffer could not be mapped into memory
    #[error("Failed to map dumb buffer on device `{dev:?}` ({source})")]
    Map {
        /// Device on which the error was generated
        dev: Option<PathBuf>,
        /// Underlying system error
        #[source]
        source: io::Error,
    },
    /// The image could not be decoded
    #[error("Failed to load image `{path:?}` ({source})")]
    ImageLoad {
        /// Path of the image
        path: PathBuf,
        /// Underlying decoder error
        #[source]
        source: image::ImageError,
    },
    /// Committing the framebuffer to the crtc failed
    #[error("Failed to set crtc on device `{dev:?}`: {errmsg} ({source})")]
    ModeSet {
        /// Error message associated to the failure
        errmsg: &'static str,
        /// Device on which the error was generated
        dev: Option<PathBuf>,
        /// Underlying system error
        #[source]
        source: io::Error,
    },
    /// Source or destination geometry cannot be blitted
    #[error("Invalid image dimensions: source {src} ({len} bytes), destination {dst}")]
    InvalidImageDimensions {
        /// Size of the source image
        src: Size<u32, Buffer>,
        /// Length of the source sample buffer
        len: usize,
        /// Size of the destination
        dst: Size<u32, Physical>,
    },
}
