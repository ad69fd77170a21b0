//! Committing a framebuffer to the display

use std::io;

use drm::control::{crtc, framebuffer};
use tracing::{debug, info};

use super::device::KmsDevice;
use super::output::DisplayTarget;
use super::Error;
use crate::utils::Point;

/// Bind the crtc feeding `target` to scan out `framebuffer` at `target.mode`
///
/// The crtc is read from the encoder at this point rather than reused from
/// selection time. If the encoder is not bound to any crtc, the first crtc it
/// can drive is used. The call is not retried on failure.
pub(super) fn commit<D: KmsDevice>(
    device: &D,
    framebuffer: Option<framebuffer::Handle>,
    target: &DisplayTarget<D::Mode>,
) -> Result<crtc::Handle, Error> {
    let framebuffer = framebuffer.ok_or_else(|| Error::ModeSet {
        errmsg: "no framebuffer allocated",
        dev: device.dev_path(),
        source: io::Error::new(io::ErrorKind::NotFound, "framebuffer missing"),
    })?;

    let encoder = device.encoder(target.encoder).map_err(|source| Error::ModeSet {
        errmsg: "failed to query encoder",
        dev: device.dev_path(),
        source,
    })?;

    let crtc = match encoder.crtc {
        Some(crtc) => crtc,
        None => {
            let crtc = encoder
                .possible_crtcs
                .first()
                .copied()
                .ok_or_else(|| Error::ModeSet {
                    errmsg: "encoder cannot be driven by any crtc",
                    dev: device.dev_path(),
                    source: io::Error::new(io::ErrorKind::NotFound, "no crtc available"),
                })?;
            debug!(?crtc, encoder = ?encoder.handle, "encoder unbound, using first possible crtc");
            crtc
        }
    };

    device
        .set_crtc(
            crtc,
            Some(framebuffer),
            Point::new(0, 0),
            &[target.connector],
            Some(target.mode),
        )
        .map_err(|source| Error::ModeSet {
            errmsg: "failed to commit framebuffer",
            dev: device.dev_path(),
            source,
        })?;

    info!(?crtc, fb = ?framebuffer, connector = %target.connector_name, "framebuffer presented");
    Ok(crtc)
}

/// Error for presenting on a pipeline without an open device
pub(super) fn no_device() -> Error {
    Error::ModeSet {
        errmsg: "no drm device open",
        dev: None,
        source: io::Error::new(io::ErrorKind::NotConnected, "no drm device open"),
    }
}
