//! Allocation of a cpu-mapped dumb framebuffer

use std::{io, path::PathBuf};

use tracing::{debug, trace};

use super::device::{DisplayMode, KmsDevice};
use super::lifecycle::Acquired;
use super::Error;

/// Bits per pixel of the allocated buffer
pub const BPP: u32 = 32;
/// Color depth the framebuffer is registered with, the fourth byte is padding
pub const DEPTH: u32 = 24;

/// Create a dumb buffer sized to `mode`, register it as a framebuffer and map it
///
/// Every resource is pushed onto `acquired` as soon as it exists.
pub(super) fn allocate<D: KmsDevice>(
    device: &D,
    mode: &D::Mode,
    acquired: &mut Vec<Acquired<D>>,
) -> Result<(), Error> {
    let size = mode.size();

    let (buffer, layout) = device
        .create_dumb_buffer(size, BPP)
        .map_err(|source| Error::BufferCreate {
            size,
            dev: device.dev_path(),
            source,
        })?;
    debug!(?layout, "allocated dumb buffer");

    let framebuffer = match device.add_framebuffer(&buffer, DEPTH, BPP) {
        Ok(framebuffer) => framebuffer,
        Err(source) => {
            acquired.push(Acquired::DumbBuffer(buffer));
            return Err(Error::FramebufferRegister {
                dev: device.dev_path(),
                source,
            });
        }
    };
    trace!(fb = ?framebuffer, "registered framebuffer");

    let mapping = device.map_dumb_buffer(&buffer, &layout);
    acquired.push(Acquired::DumbBuffer(buffer));
    acquired.push(Acquired::Framebuffer(framebuffer));

    let mapping = mapping.map_err(|source| Error::Map {
        dev: device.dev_path(),
        source,
    })?;
    let covered = mapping.len() >= layout.len
        && layout.size.h as usize * layout.pitch as usize <= layout.len
        && layout.pitch as u64 >= layout.size.w as u64 * 4;
    acquired.push(Acquired::Mapping { mapping, layout });
    if !covered {
        return Err(uncovered_mapping(device.dev_path()));
    }

    Ok(())
}

/// Error for allocating on a pipeline without an open device
pub(super) fn no_device() -> Error {
    Error::BufferCreate {
        size: Default::default(),
        dev: None,
        source: io::Error::new(io::ErrorKind::NotConnected, "no drm device open"),
    }
}

/// Error for a mapping too small for the buffer layout it belongs to
pub(super) fn uncovered_mapping(dev: Option<PathBuf>) -> Error {
    Error::Map {
        dev,
        source: io::Error::new(
            io::ErrorKind::InvalidData,
            "mapping does not cover the framebuffer",
        ),
    }
}
