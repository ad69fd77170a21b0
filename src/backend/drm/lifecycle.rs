//! Ownership of everything acquired from a drm device
//!
//! A [`DrmPipeline`] owns the open device and a stack of [`Acquired`]
//! resources. Every acquisition step pushes its resource as soon as the kernel
//! handed it out, so a failure halfway through a step still leaves everything
//! acquired so far on the stack. [`DrmPipeline::teardown`] pops the stack and
//! releases each entry, then closes the device. Teardown also runs on drop.

use std::fmt;

use drm::control::{connector, crtc, framebuffer};
use tracing::{debug, info, info_span, trace, warn};

use super::device::{BufferLayout, ConnectorInfo, CrtcInfo, EncoderInfo, KmsDevice, Resources};
use super::output::DisplayTarget;
use super::{dumb, output, present, Error};
use crate::backend::allocator::PixelView;

/// Progress of a [`DrmPipeline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// No device has been opened yet
    Unopened,
    /// The device node is open
    DeviceOpen,
    /// The resource handles of the device are known
    ResourcesQueried,
    /// A connector, mode and encoder have been selected
    OutputSelected,
    /// A framebuffer is allocated, registered and mapped
    FramebufferMapped,
    /// The framebuffer is being scanned out
    Presented,
    /// Everything has been released
    Released,
}

/// Kind of an [`Acquired`] resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Resource handle list
    Resources,
    /// Selected connector
    Connector,
    /// Selected encoder
    Encoder,
    /// Crtc bound to the encoder at selection time
    Crtc,
    /// Dumb buffer handle
    DumbBuffer,
    /// Framebuffer registration
    Framebuffer,
    /// CPU mapping of the dumb buffer
    Mapping,
}

/// A resource acquired from a [`KmsDevice`]
pub enum Acquired<D: KmsDevice> {
    /// Resource handle list of the device
    Resources(Resources),
    /// The connector driving the display
    Connector(ConnectorInfo<D::Mode>),
    /// The encoder feeding the connector
    Encoder(EncoderInfo),
    /// State of the crtc bound to the encoder when it was selected
    Crtc {
        /// Recorded crtc configuration
        saved: CrtcInfo<D::Mode>,
        /// Connector to restore the configuration on
        connector: connector::Handle,
    },
    /// Dumb buffer backing the framebuffer
    DumbBuffer(D::Buffer),
    /// Framebuffer registration of the dumb buffer
    Framebuffer(framebuffer::Handle),
    /// Mapping of the dumb buffer
    Mapping {
        /// The mapping itself
        mapping: D::Mapping,
        /// Layout of the mapped buffer
        layout: BufferLayout,
    },
}

impl<D: KmsDevice> Acquired<D> {
    /// Kind of this resource
    pub fn kind(&self) -> ResourceKind {
        match self {
            Acquired::Resources(_) => ResourceKind::Resources,
            Acquired::Connector(_) => ResourceKind::Connector,
            Acquired::Encoder(_) => ResourceKind::Encoder,
            Acquired::Crtc { .. } => ResourceKind::Crtc,
            Acquired::DumbBuffer(_) => ResourceKind::DumbBuffer,
            Acquired::Framebuffer(_) => ResourceKind::Framebuffer,
            Acquired::Mapping { .. } => ResourceKind::Mapping,
        }
    }

    /// Give this resource back to `device`
    ///
    /// `presented_on` is the crtc the pipeline committed to, if any. The
    /// recorded crtc state is only written back when it is that crtc and
    /// `restore_crtc` is set.
    fn release(self, device: &D, presented_on: Option<crtc::Handle>, restore_crtc: bool) {
        match self {
            Acquired::Mapping { mapping, .. } => {
                trace!("unmapping framebuffer memory");
                drop(mapping);
            }
            Acquired::Framebuffer(fb) => {
                trace!(?fb, "destroying framebuffer");
                if let Err(err) = device.destroy_framebuffer(fb) {
                    warn!(?fb, ?err, "failed to destroy framebuffer");
                }
            }
            Acquired::DumbBuffer(buffer) => {
                trace!(?buffer, "destroying dumb buffer");
                if let Err(err) = device.destroy_dumb_buffer(buffer) {
                    warn!(?err, "failed to destroy dumb buffer");
                }
            }
            Acquired::Crtc { saved, connector } => {
                let restore = restore_crtc
                    && presented_on == Some(saved.handle)
                    && saved.mode.is_some()
                    && saved.framebuffer.is_some();
                if restore {
                    debug!(crtc = ?saved.handle, "restoring previous crtc state");
                    if let Err(err) = device.set_crtc(
                        saved.handle,
                        saved.framebuffer,
                        saved.position,
                        &[connector],
                        saved.mode,
                    ) {
                        warn!(crtc = ?saved.handle, ?err, "failed to restore crtc state");
                    }
                } else {
                    trace!(crtc = ?saved.handle, "dropping crtc reference");
                }
            }
            Acquired::Encoder(encoder) => trace!(encoder = ?encoder.handle, "dropping encoder reference"),
            Acquired::Connector(connector) => {
                trace!(connector = %connector.name, "dropping connector reference")
            }
            Acquired::Resources(_) => trace!("dropping resource handles"),
        }
    }
}

impl<D: KmsDevice> fmt::Debug for Acquired<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Acquired").field(&self.kind()).finish()
    }
}

/// Owner of a drm device and every resource acquired from it
pub struct DrmPipeline<D: KmsDevice> {
    device: Option<D>,
    acquired: Vec<Acquired<D>>,
    phase: Phase,
    presented_on: Option<crtc::Handle>,
    restore_crtc: bool,
}

impl<D: KmsDevice> fmt::Debug for DrmPipeline<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrmPipeline")
            .field("device", &self.device.as_ref().and_then(|dev| dev.dev_path()))
            .field("acquired", &self.acquired)
            .field("phase", &self.phase)
            .field("presented_on", &self.presented_on)
            .field("restore_crtc", &self.restore_crtc)
            .finish()
    }
}

impl<D: KmsDevice> DrmPipeline<D> {
    /// Create a pipeline that has not opened a device yet
    ///
    /// If `restore_crtc` is set, teardown writes the crtc configuration found
    /// at selection time back after the image was presented.
    pub fn new(restore_crtc: bool) -> Self {
        DrmPipeline {
            device: None,
            acquired: Vec::new(),
            phase: Phase::Unopened,
            presented_on: None,
            restore_crtc,
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Kinds of the currently held resources, in acquisition order
    pub fn acquired(&self) -> Vec<ResourceKind> {
        self.acquired.iter().map(Acquired::kind).collect()
    }

    /// The open device, if any
    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    /// Open a device through `open` and select a connector, mode and encoder on it
    ///
    /// Opening is skipped if the pipeline already holds a device.
    pub fn acquire_display<F>(&mut self, open: F) -> Result<DisplayTarget<D::Mode>, Error>
    where
        F: FnOnce() -> Result<D, Error>,
    {
        let _span = info_span!("acquire_display").entered();

        let device = match self.device.take() {
            Some(device) => device,
            None => {
                let device = open()?;
                self.phase = Phase::DeviceOpen;
                device
            }
        };
        let device = &*self.device.insert(device);

        let target = output::acquire(device, &mut self.acquired, &mut self.phase)?;
        self.phase = Phase::OutputSelected;
        Ok(target)
    }

    /// Allocate, register and map a framebuffer matching `mode`
    ///
    /// Returns a cleared view of the mapped framebuffer.
    pub fn allocate(&mut self, mode: &D::Mode) -> Result<PixelView<'_>, Error> {
        let _span = info_span!("allocate").entered();

        let device = self.device.as_ref().ok_or_else(dumb::no_device)?;
        dumb::allocate(device, mode, &mut self.acquired)?;
        self.phase = Phase::FramebufferMapped;

        let dev = self.device.as_ref().and_then(|device| device.dev_path());
        let mut view = self.view().ok_or_else(|| dumb::uncovered_mapping(dev))?;
        view.clear();
        Ok(view)
    }

    /// View of the mapped framebuffer, if one is allocated
    pub fn view(&mut self) -> Option<PixelView<'_>> {
        self.acquired.iter_mut().rev().find_map(|entry| match entry {
            Acquired::Mapping { mapping, layout } => {
                let len = layout.len.min(mapping.len());
                PixelView::new(&mut mapping[..len], layout.size, layout.pitch)
            }
            _ => None,
        })
    }

    /// The registered framebuffer, if one is allocated
    pub fn framebuffer(&self) -> Option<framebuffer::Handle> {
        self.acquired.iter().rev().find_map(|entry| match entry {
            Acquired::Framebuffer(fb) => Some(*fb),
            _ => None,
        })
    }

    /// Commit the framebuffer to the crtc driving `target`
    ///
    /// Returns the crtc that now scans out the framebuffer.
    pub fn present(&mut self, target: &DisplayTarget<D::Mode>) -> Result<crtc::Handle, Error> {
        let _span = info_span!("present").entered();

        let framebuffer = self.framebuffer();
        let device = self.device.as_ref().ok_or_else(present::no_device)?;
        let crtc = present::commit(device, framebuffer, target)?;
        self.presented_on = Some(crtc);
        self.phase = Phase::Presented;
        Ok(crtc)
    }

    /// Release everything in reverse acquisition order and close the device
    ///
    /// Calling this more than once is a no-op.
    pub fn teardown(&mut self) {
        if self.phase == Phase::Released {
            return;
        }
        let _span = info_span!("teardown").entered();

        if let Some(device) = self.device.take() {
            while let Some(entry) = self.acquired.pop() {
                entry.release(&device, self.presented_on, self.restore_crtc);
            }
            debug!("closing drm device");
            drop(device);
        }

        self.presented_on = None;
        self.phase = Phase::Released;
        info!("released all drm resources");
    }
}

impl<D: KmsDevice> Drop for DrmPipeline<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
