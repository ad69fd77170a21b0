//! Selection of the connector, mode and encoder to drive

use drm::control::{connector, encoder};
use tracing::{debug, info, warn};

use super::device::{ConnectorInfo, DisplayMode, EncoderInfo, KmsDevice, Resources};
use super::lifecycle::{Acquired, Phase};
use super::Error;

/// The display chain selected by [`DrmPipeline::acquire_display`](super::DrmPipeline::acquire_display)
///
/// The crtc is not part of the target, it is read from the encoder again when
/// presenting.
#[derive(Debug, Clone)]
pub struct DisplayTarget<M> {
    /// Connector to light up
    pub connector: connector::Handle,
    /// Interface name of the connector
    pub connector_name: String,
    /// Encoder feeding the connector
    pub encoder: encoder::Handle,
    /// Mode to drive the connector with
    pub mode: M,
}

/// Pick the mode with the largest area
///
/// Ties keep the mode seen first. Returns `None` for an empty list.
pub fn select_mode<M: DisplayMode>(modes: &[M]) -> Option<M> {
    let mut best: Option<M> = None;
    for mode in modes {
        match best {
            Some(current) if current.size().area() >= mode.size().area() => {}
            _ => best = Some(*mode),
        }
    }
    best
}

/// Find the first connected connector advertising at least one mode
///
/// Connectors are visited in the order of `resources`. Connectors that fail to
/// load are skipped.
pub fn select_connector<D: KmsDevice>(
    device: &D,
    resources: &Resources,
) -> Option<ConnectorInfo<D::Mode>> {
    resources
        .connectors
        .iter()
        .filter_map(|&handle| match device.connector(handle) {
            Ok(info) => Some(info),
            Err(err) => {
                warn!(?handle, ?err, "failed to query connector");
                None
            }
        })
        .find(|info| {
            debug!(connector = %info.name, state = ?info.state, modes = info.modes.len(), "probed connector");
            info.state == connector::State::Connected && !info.modes.is_empty()
        })
}

/// Resolve the encoder feeding `connector`
///
/// The currently bound encoder is queried directly first. Failing that, the
/// encoders of `resources` are scanned for the one the connector refers to.
pub fn resolve_encoder<D: KmsDevice>(
    device: &D,
    resources: &Resources,
    connector: &ConnectorInfo<D::Mode>,
) -> Option<EncoderInfo> {
    let reference = connector.current_encoder?;

    match device.encoder(reference) {
        Ok(info) => return Some(info),
        Err(err) => debug!(encoder = ?reference, ?err, "bound encoder not available, scanning"),
    }

    resources
        .encoders
        .iter()
        .filter_map(|&handle| device.encoder(handle).ok())
        .find(|info| info.handle == reference)
}

/// Run the selection steps, pushing every acquired resource onto `acquired`
pub(super) fn acquire<D: KmsDevice>(
    device: &D,
    acquired: &mut Vec<Acquired<D>>,
    phase: &mut Phase,
) -> Result<DisplayTarget<D::Mode>, Error> {
    let resources = device.resources().map_err(|source| Error::ResourceQuery {
        dev: device.dev_path(),
        source,
    })?;
    acquired.push(Acquired::Resources(resources.clone()));
    *phase = Phase::ResourcesQueried;

    let connector = select_connector(device, &resources).ok_or_else(|| Error::NoActiveOutput {
        dev: device.dev_path(),
    })?;
    let connector_handle = connector.handle;
    let connector_name = connector.name.clone();
    let Some(mode) = select_mode(&connector.modes) else {
        return Err(Error::NoActiveOutput {
            dev: device.dev_path(),
        });
    };
    let encoder = resolve_encoder(device, &resources, &connector);
    acquired.push(Acquired::Connector(connector));

    let encoder = encoder.ok_or_else(|| Error::NoEncoder {
        connector: connector_name.clone(),
        dev: device.dev_path(),
    })?;
    let encoder_handle = encoder.handle;
    let bound_crtc = encoder.crtc;
    acquired.push(Acquired::Encoder(encoder));

    if let Some(crtc) = bound_crtc {
        match device.crtc(crtc) {
            Ok(saved) => acquired.push(Acquired::Crtc {
                saved,
                connector: connector_handle,
            }),
            Err(err) => warn!(?crtc, ?err, "failed to read crtc state"),
        }
    }

    let size = mode.size();
    info!(
        connector = %connector_name,
        "Selected mode: {}x{}@{}Hz",
        size.w,
        size.h,
        mode.vrefresh()
    );

    Ok(DisplayTarget {
        connector: connector_handle,
        connector_name,
        encoder: encoder_handle,
        mode,
    })
}
