//! Command line and environment configuration of the viewer

use std::{env, path::PathBuf};

use clap::Parser;

/// Environment variable selecting the drm card index
pub const CARD_ENV: &str = "DRM_CARD";

/// Display a still image on the first connected output of a drm device
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Image file to display
    pub image: PathBuf,
    /// Leave the display as it is on exit instead of restoring the previous crtc state
    #[arg(long)]
    pub no_restore: bool,
}

/// Errors thrown while building a [`Config`]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The card index is not an unsigned integer
    #[error("Invalid DRM_CARD value `{value}`, expected an unsigned integer")]
    InvalidCard {
        /// The rejected value
        value: String,
    },
}

/// Resolved settings of a viewer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Image file to display
    pub image: PathBuf,
    /// Device node to open
    pub device: PathBuf,
    /// Whether teardown writes the previous crtc state back
    pub restore_crtc: bool,
}

impl Config {
    /// Build a config from parsed arguments and an optional card index
    ///
    /// `card` defaults to `0` and selects `/dev/dri/card{card}`.
    pub fn new(cli: Cli, card: Option<&str>) -> Result<Config, ConfigError> {
        let card = match card {
            None => 0,
            Some(value) => value.trim().parse::<u32>().map_err(|_| ConfigError::InvalidCard {
                value: value.to_owned(),
            })?,
        };

        Ok(Config {
            image: cli.image,
            device: PathBuf::from(format!("/dev/dri/card{}", card)),
            restore_crtc: !cli.no_restore,
        })
    }

    /// Build a config from parsed arguments and the process environment
    pub fn from_env(cli: Cli) -> Result<Config, ConfigError> {
        let card = env::var(CARD_ENV).ok();
        Config::new(cli, card.as_deref())
    }
}
