use std::{
    fs::File,
    io,
    ops::{Deref, DerefMut},
    os::unix::io::{AsFd, BorrowedFd},
    path::{Path, PathBuf},
    ptr::{self, NonNull},
    slice,
};

use drm::{
    buffer::Buffer as DrmBuffer,
    control::{
        connector, crtc, dumbbuffer::DumbBuffer, encoder, framebuffer, Device as ControlDevice, Mode,
    },
    Device as BasicDevice,
};
use rustix::mm::{self, MapFlags, ProtFlags};
use tracing::{error, info, trace, warn};

use super::{BufferLayout, ConnectorInfo, CrtcInfo, EncoderInfo, KmsDevice, Resources};
use crate::backend::{allocator::FORMAT, drm::Error};
use crate::utils::{Physical, Point, Size};

#[derive(Debug)]
struct Card(File);

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl BasicDevice for Card {}
impl ControlDevice for Card {}

/// An open drm device node
///
/// Opening tries to acquire the drm master lock, which is released again
/// when the device is dropped. Dropping closes the file descriptor.
#[derive(Debug)]
pub struct DrmCard {
    card: Card,
    path: PathBuf,
    privileged: bool,
}

impl DrmCard {
    /// Open the drm device node at `path` read/write
    pub fn open(path: impl AsRef<Path>) -> Result<DrmCard, Error> {
        let path = path.as_ref();
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| Error::DeviceOpen {
                path: path.to_owned(),
                source,
            })?;

        let mut dev = DrmCard {
            card: Card(file),
            path: path.to_owned(),
            privileged: false,
        };

        // We want to modeset, so we better be the master, if we run via a tty session.
        // Newer kernels grant this permission to the first opener anyway.
        if let Err(err) = dev.card.acquire_master_lock() {
            warn!(?err, "Unable to become drm master, assuming unprivileged mode");
        } else {
            dev.privileged = true;
        }

        info!(path = ?dev.path, privileged = dev.privileged, "Opened drm device");
        Ok(dev)
    }
}

impl Drop for DrmCard {
    fn drop(&mut self) {
        info!("Dropping device: {:?}", self.path);
        if self.privileged {
            if let Err(err) = self.card.release_master_lock() {
                error!("Failed to drop drm master state. Error: {}", err);
            }
        }
    }
}

impl KmsDevice for DrmCard {
    type Mode = Mode;
    type Buffer = DumbBuffer;
    type Mapping = DumbMapping;

    fn dev_path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    fn resources(&self) -> io::Result<Resources> {
        let handles = self.card.resource_handles()?;
        Ok(Resources {
            connectors: handles.connectors().to_vec(),
            encoders: handles.encoders().to_vec(),
            crtcs: handles.crtcs().to_vec(),
        })
    }

    fn connector(&self, handle: connector::Handle) -> io::Result<ConnectorInfo<Mode>> {
        let info = self.card.get_connector(handle, true)?;
        Ok(ConnectorInfo {
            handle: info.handle(),
            name: format!("{}-{}", info.interface().as_str(), info.interface_id()),
            state: info.state(),
            modes: info.modes().to_vec(),
            current_encoder: info.current_encoder(),
        })
    }

    fn encoder(&self, handle: encoder::Handle) -> io::Result<EncoderInfo> {
        let info = self.card.get_encoder(handle)?;
        let possible_crtcs = self.card.resource_handles()?.filter_crtcs(info.possible_crtcs());
        Ok(EncoderInfo {
            handle: info.handle(),
            crtc: info.crtc(),
            possible_crtcs,
        })
    }

    fn crtc(&self, handle: crtc::Handle) -> io::Result<CrtcInfo<Mode>> {
        let info = self.card.get_crtc(handle)?;
        Ok(CrtcInfo {
            handle: info.handle(),
            framebuffer: info.framebuffer(),
            position: info.position().into(),
            mode: info.mode(),
        })
    }

    fn create_dumb_buffer(
        &self,
        size: Size<u32, Physical>,
        bpp: u32,
    ) -> io::Result<(DumbBuffer, BufferLayout)> {
        let buffer = self
            .card
            .create_dumb_buffer(size.into(), FORMAT, bpp)?;
        let (w, h) = DrmBuffer::size(&buffer);
        let pitch = buffer.pitch();
        let layout = BufferLayout {
            size: Size::new(w, h),
            pitch,
            len: pitch as usize * h as usize,
        };
        trace!(?layout, "created dumb buffer");
        Ok((buffer, layout))
    }

    fn add_framebuffer(
        &self,
        buffer: &DumbBuffer,
        depth: u32,
        bpp: u32,
    ) -> io::Result<framebuffer::Handle> {
        self.card.add_framebuffer(buffer, depth, bpp)
    }

    fn map_dumb_buffer(&self, buffer: &DumbBuffer, layout: &BufferLayout) -> io::Result<DumbMapping> {
        let info = drm_ffi::mode::dumbbuffer::map(self.card.as_fd(), buffer.handle().into(), 0, 0)?;
        // SAFETY: the offset was handed out by the kernel for this buffer and
        // `layout.len` does not exceed the size of the buffer.
        let addr = unsafe {
            mm::mmap(
                ptr::null_mut(),
                layout.len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                self.card.as_fd(),
                info.offset,
            )?
        };
        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned a null mapping"))?;
        Ok(DumbMapping { ptr, len: layout.len })
    }

    fn set_crtc(
        &self,
        crtc: crtc::Handle,
        framebuffer: Option<framebuffer::Handle>,
        position: Point<u32, Physical>,
        connectors: &[connector::Handle],
        mode: Option<Mode>,
    ) -> io::Result<()> {
        self.card
            .set_crtc(crtc, framebuffer, position.into(), connectors, mode)
    }

    fn destroy_framebuffer(&self, framebuffer: framebuffer::Handle) -> io::Result<()> {
        self.card.destroy_framebuffer(framebuffer)
    }

    fn destroy_dumb_buffer(&self, buffer: DumbBuffer) -> io::Result<()> {
        self.card.destroy_dumb_buffer(buffer)
    }
}

/// Shared read/write mapping of a dumb buffer
///
/// The mapping is removed when this value is dropped.
#[derive(Debug)]
pub struct DumbMapping {
    ptr: NonNull<u8>,
    len: usize,
}

impl Deref for DumbMapping {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: `ptr` points to `len` bytes mapped readable until drop.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for DumbMapping {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: the mapping is writable and exclusively owned by `self`.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for DumbMapping {
    fn drop(&mut self) {
        trace!(len = self.len, "unmapping dumb buffer");
        // SAFETY: `ptr` and `len` describe a mapping created by `mmap` that is not referenced anymore.
        if let Err(err) = unsafe { mm::munmap(self.ptr.as_ptr().cast(), self.len) } {
            warn!(?err, "failed to unmap dumb buffer");
        }
    }
}
