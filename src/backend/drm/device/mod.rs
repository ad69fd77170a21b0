//! Access to the modesetting interface of a drm device
//!
//! [`KmsDevice`] is the small slice of the kernel api the display pipeline
//! needs: resource enumeration, connector / encoder / crtc queries, dumb buffer
//! handling and a legacy mode-set. [`DrmCard`] implements it on top of an open
//! `/dev/dri/cardN` node.
//!
//! Queries return owned snapshots ([`ConnectorInfo`], [`EncoderInfo`],
//! [`CrtcInfo`]). They describe the state at the time of the query and are not
//! updated afterwards.

use std::{fmt, io, ops::DerefMut, path::PathBuf};

use drm::control::{connector, crtc, encoder, framebuffer, Mode};

use crate::utils::{Physical, Point, Size};

mod card;

pub use self::card::{DrmCard, DumbMapping};

/// A display timing advertised by a connector
pub trait DisplayMode: Copy + fmt::Debug {
    /// Active area in pixels
    fn size(&self) -> Size<u32, Physical>;
    /// Vertical refresh rate in Hz
    fn vrefresh(&self) -> u32;
}

impl DisplayMode for Mode {
    fn size(&self) -> Size<u32, Physical> {
        let (w, h) = Mode::size(self);
        Size::new(w as u32, h as u32)
    }

    fn vrefresh(&self) -> u32 {
        Mode::vrefresh(self)
    }
}

/// Handles of the modesetting objects exposed by a device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources {
    /// Connectors in the order reported by the kernel
    pub connectors: Vec<connector::Handle>,
    /// Encoders in the order reported by the kernel
    pub encoders: Vec<encoder::Handle>,
    /// Crtcs in the order reported by the kernel
    pub crtcs: Vec<crtc::Handle>,
}

/// Snapshot of a connector
#[derive(Debug, Clone)]
pub struct ConnectorInfo<M> {
    /// Handle of the connector
    pub handle: connector::Handle,
    /// Interface name and index, e.g. `HDMI-A-1`
    pub name: String,
    /// Connection state
    pub state: connector::State,
    /// Advertised modes, in the order reported by the kernel
    pub modes: Vec<M>,
    /// Encoder currently driving this connector
    pub current_encoder: Option<encoder::Handle>,
}

/// Snapshot of an encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderInfo {
    /// Handle of the encoder
    pub handle: encoder::Handle,
    /// Crtc currently bound to this encoder
    pub crtc: Option<crtc::Handle>,
    /// Crtcs this encoder can be driven by
    pub possible_crtcs: Vec<crtc::Handle>,
}

/// Snapshot of a crtc configuration
#[derive(Debug, Clone, Copy)]
pub struct CrtcInfo<M> {
    /// Handle of the crtc
    pub handle: crtc::Handle,
    /// Framebuffer being scanned out
    pub framebuffer: Option<framebuffer::Handle>,
    /// Offset into the framebuffer
    pub position: Point<u32, Physical>,
    /// Active mode, `None` if the crtc is disabled
    pub mode: Option<M>,
}

/// Memory layout of a dumb buffer as reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    /// Size in pixels
    pub size: Size<u32, Physical>,
    /// Length of a row in bytes, may exceed `width * 4`
    pub pitch: u32,
    /// Length of the whole buffer in bytes
    pub len: usize,
}

/// Modesetting operations used by the display pipeline
///
/// Closing the device is expressed by dropping the implementor.
pub trait KmsDevice {
    /// Mode type reported by this device
    type Mode: DisplayMode;
    /// Kernel dumb buffer handle
    type Buffer: fmt::Debug;
    /// CPU mapping of a dumb buffer, unmapped on drop
    type Mapping: DerefMut<Target = [u8]>;

    /// Path of the open device node, if it can be determined
    fn dev_path(&self) -> Option<PathBuf>;

    /// Enumerate the modesetting resources
    fn resources(&self) -> io::Result<Resources>;
    /// Query (and probe) a connector
    fn connector(&self, handle: connector::Handle) -> io::Result<ConnectorInfo<Self::Mode>>;
    /// Query an encoder
    fn encoder(&self, handle: encoder::Handle) -> io::Result<EncoderInfo>;
    /// Query the configuration of a crtc
    fn crtc(&self, handle: crtc::Handle) -> io::Result<CrtcInfo<Self::Mode>>;

    /// Allocate a linear dumb buffer
    fn create_dumb_buffer(
        &self,
        size: Size<u32, Physical>,
        bpp: u32,
    ) -> io::Result<(Self::Buffer, BufferLayout)>;
    /// Register a dumb buffer as a framebuffer
    fn add_framebuffer(&self, buffer: &Self::Buffer, depth: u32, bpp: u32)
        -> io::Result<framebuffer::Handle>;
    /// Map a dumb buffer read/write into the address space of this process
    fn map_dumb_buffer(&self, buffer: &Self::Buffer, layout: &BufferLayout) -> io::Result<Self::Mapping>;

    /// Program a crtc to scan out `framebuffer` to `connectors` using `mode`
    fn set_crtc(
        &self,
        crtc: crtc::Handle,
        framebuffer: Option<framebuffer::Handle>,
        position: Point<u32, Physical>,
        connectors: &[connector::Handle],
        mode: Option<Self::Mode>,
    ) -> io::Result<()>;

    /// Remove a framebuffer
    fn destroy_framebuffer(&self, framebuffer: framebuffer::Handle) -> io::Result<()>;
    /// Free a dumb buffer
    fn destroy_dumb_buffer(&self, buffer: Self::Buffer) -> io::Result<()>;
}
