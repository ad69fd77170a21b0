//! The image viewer flow: select an output, draw the image, wait, clean up

use std::io::BufRead;
use std::path::Path;

use tracing::{debug, info, info_span, warn};

use crate::backend::drm::{DrmPipeline, Error, KmsDevice};
use crate::backend::renderer::blit;
use crate::config::Config;
use crate::decode::DecodedImage;

/// Block until one line or end of file can be read from `input`
///
/// Read errors are logged and treated like end of file.
pub fn await_dismissal(mut input: impl BufRead) {
    let _span = info_span!("await_dismissal").entered();

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => debug!("input closed"),
        Ok(_) => debug!("dismissed"),
        Err(err) => warn!(?err, "failed to read input"),
    }
}

/// Display the image named by `config` until `input` yields a line
///
/// `open` is handed the configured device node. Everything acquired is
/// released before returning, whether the run succeeded or not.
pub fn run<D, F, R>(config: &Config, open: F, input: R) -> Result<(), Error>
where
    D: KmsDevice,
    F: FnOnce(&Path) -> Result<D, Error>,
    R: BufRead,
{
    let mut pipeline = DrmPipeline::new(config.restore_crtc);
    let result = show(&mut pipeline, config, open, input);

    pipeline.teardown();
    info!("Cleanup completed");
    result
}

fn show<D, F, R>(pipeline: &mut DrmPipeline<D>, config: &Config, open: F, input: R) -> Result<(), Error>
where
    D: KmsDevice,
    F: FnOnce(&Path) -> Result<D, Error>,
    R: BufRead,
{
    let target = pipeline.acquire_display(|| open(&config.device))?;
    let mut view = pipeline.allocate(&target.mode)?;

    let image = DecodedImage::open(&config.image)?;
    blit(&image, &mut view)?;
    drop(image);

    pipeline.present(&target)?;
    info!("Image displayed. Press Enter to exit...");
    await_dismissal(input);
    Ok(())
}
