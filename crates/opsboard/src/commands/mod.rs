//! Command handlers and the helpers they share.

pub mod cameras;
pub mod config_cmd;
pub mod grid;
pub mod markers;
pub mod replay;

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use opsboard_config::Config;
use opsboard_core::{CameraId, CameraLayout, CameraList, StreamCoordinator, StreamTransport};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// `--config` or the platform config path.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(opsboard_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_file(global);
    opsboard_config::load_config_from(&path).map_err(|e| CliError::config(e, &path))
}

pub fn camera_list(config: &Config, global: &GlobalOpts) -> Result<CameraList, CliError> {
    config
        .camera_list()
        .map_err(|e| CliError::config(e, &config_file(global)))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn http_client() -> Result<reqwest::Client, CliError> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| CliError::Internal(format!("HTTP client setup failed: {e}")))
}

/// A coordinator in the configured (or overridden) layout and selection.
/// Nothing is mounted yet.
pub fn build_coordinator<T: StreamTransport>(
    config: &Config,
    global: &GlobalOpts,
    transport: T,
    layout: Option<CameraLayout>,
    selected: Option<CameraId>,
) -> Result<StreamCoordinator<T>, CliError> {
    let cameras = camera_list(config, global)?;
    let selected = match selected {
        Some(id) => id,
        None => config
            .initial_selection(&cameras)
            .map_err(|e| CliError::config(e, &config_file(global)))?,
    };

    let coordinator_config = config
        .coordinator_config()
        .map_err(|e| CliError::config(e, &config_file(global)))?;
    let mut coordinator = StreamCoordinator::new(coordinator_config, cameras, transport)?;
    coordinator.set_layout(layout.unwrap_or(config.default_layout));
    coordinator.select_camera(selected)?;
    Ok(coordinator)
}
