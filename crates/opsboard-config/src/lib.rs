//! Configuration for the opsboard console.
//!
//! TOML settings layered over built-in defaults and `OPSBOARD_` environment
//! variables, and translation to the plain `opsboard_core` config values.
//! Core never reads files; it receives a pre-built [`CoordinatorConfig`],
//! [`MapConfig`], and [`CameraList`].

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use opsboard_core::{
    CameraFeed, CameraId, CameraLayout, CameraList, CameraStatus, Coordinates, CoordinatorConfig,
    DEFAULT_STREAM_PATH, DEFAULT_STREAM_PORT, EndpointConfig, FALLBACK_POSITION, GRID_PLACEHOLDER,
    MODAL_PLACEHOLDER, MapConfig,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamSettings,

    #[serde(default)]
    pub map: MapSettings,

    /// Camera registry in list order.
    #[serde(default = "default_cameras")]
    pub cameras: Vec<CameraFeed>,

    #[serde(default)]
    pub default_layout: CameraLayout,

    /// Primary grid camera at startup. First camera when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_camera: Option<CameraId>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stream: StreamSettings::default(),
            map: MapSettings::default(),
            cameras: default_cameras(),
            default_layout: CameraLayout::default(),
            selected_camera: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StreamSettings {
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_resume_delay_ms")]
    pub resume_delay_ms: u64,

    #[serde(default = "default_true")]
    pub pause_grid_while_modal: bool,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_path")]
    pub path: String,

    /// Checked by [`Config::validate`].
    #[serde(default = "default_grid_placeholder")]
    pub grid_placeholder: String,

    #[serde(default = "default_modal_placeholder")]
    pub modal_placeholder: String,

    /// Upper bound for `cameras probe`.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            resume_delay_ms: default_resume_delay_ms(),
            pause_grid_while_modal: true,
            port: default_port(),
            path: default_path(),
            grid_placeholder: default_grid_placeholder(),
            modal_placeholder: default_modal_placeholder(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MapSettings {
    #[serde(default = "default_fallback_lat")]
    pub fallback_lat: f64,

    #[serde(default = "default_fallback_lng")]
    pub fallback_lng: f64,

    #[serde(default = "default_zoom_level")]
    pub zoom_level: u8,

    #[serde(default = "default_geolocation_timeout_ms")]
    pub geolocation_timeout_ms: u64,

    #[serde(default = "default_init_poll_interval_ms")]
    pub init_poll_interval_ms: u64,

    #[serde(default = "default_init_max_attempts")]
    pub init_max_attempts: u32,

    #[serde(default = "default_current_location_title")]
    pub current_location_title: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            fallback_lat: default_fallback_lat(),
            fallback_lng: default_fallback_lng(),
            zoom_level: default_zoom_level(),
            geolocation_timeout_ms: default_geolocation_timeout_ms(),
            init_poll_interval_ms: default_init_poll_interval_ms(),
            init_max_attempts: default_init_max_attempts(),
            current_location_title: default_current_location_title(),
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    300
}
fn default_resume_delay_ms() -> u64 {
    300
}
fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_STREAM_PORT
}
fn default_path() -> String {
    DEFAULT_STREAM_PATH.into()
}
fn default_grid_placeholder() -> String {
    GRID_PLACEHOLDER.into()
}
fn default_modal_placeholder() -> String {
    MODAL_PLACEHOLDER.into()
}
fn default_probe_timeout_ms() -> u64 {
    2000
}
fn default_fallback_lat() -> f64 {
    FALLBACK_POSITION.lat
}
fn default_fallback_lng() -> f64 {
    FALLBACK_POSITION.lng
}
fn default_zoom_level() -> u8 {
    5
}
fn default_geolocation_timeout_ms() -> u64 {
    5000
}
fn default_init_poll_interval_ms() -> u64 {
    100
}
fn default_init_max_attempts() -> u32 {
    50
}
fn default_current_location_title() -> String {
    "현재 위치".into()
}

/// The six cameras of the district wall.
fn default_cameras() -> Vec<CameraFeed> {
    [
        (1, "역삼동 교차로", CameraStatus::Monitoring),
        (2, "서초동 대로", CameraStatus::Detected),
        (3, "삼성동 주택가", CameraStatus::Monitoring),
        (4, "강남대로 입구", CameraStatus::Monitoring),
        (5, "테헤란로 사거리", CameraStatus::Detected),
        (6, "학동로 골목", CameraStatus::Monitoring),
    ]
    .into_iter()
    .map(|(id, name, status)| CameraFeed {
        id: CameraId(u32::from(id)),
        name: name.into(),
        status,
        ip: IpAddr::V4(Ipv4Addr::new(172, 31, 0, 100 + id)),
    })
    .collect()
}

// ── Translation to core config ──────────────────────────────────────

impl Config {
    /// Fails when a placeholder image is not an absolute URL.
    pub fn coordinator_config(&self) -> Result<CoordinatorConfig, ConfigError> {
        let s = &self.stream;
        Ok(CoordinatorConfig {
            endpoint: EndpointConfig {
                port: s.port,
                path: s.path.clone(),
                grid_placeholder: parse_placeholder("stream.grid_placeholder", &s.grid_placeholder)?,
                modal_placeholder: parse_placeholder(
                    "stream.modal_placeholder",
                    &s.modal_placeholder,
                )?,
            },
            settle_delay: Duration::from_millis(s.settle_delay_ms),
            resume_delay: Duration::from_millis(s.resume_delay_ms),
            pause_grid_while_modal: s.pause_grid_while_modal,
        })
    }

    pub fn map_config(&self) -> MapConfig {
        let m = &self.map;
        MapConfig {
            fallback_position: Coordinates::new(m.fallback_lat, m.fallback_lng),
            zoom_level: m.zoom_level,
            geolocation_timeout: Duration::from_millis(m.geolocation_timeout_ms),
            init_poll_interval: Duration::from_millis(m.init_poll_interval_ms),
            init_max_attempts: m.init_max_attempts,
            current_location_title: m.current_location_title.clone(),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.stream.probe_timeout_ms)
    }

    /// Camera registry in list order. Rejects an empty or duplicated list.
    pub fn camera_list(&self) -> Result<CameraList, ConfigError> {
        if self.cameras.is_empty() {
            return Err(ConfigError::Validation {
                field: "cameras".into(),
                reason: "at least one camera is required".into(),
            });
        }
        CameraList::new(self.cameras.iter().cloned()).map_err(|e| ConfigError::Validation {
            field: "cameras".into(),
            reason: e.to_string(),
        })
    }

    /// The configured primary camera, or the first in the list.
    pub fn initial_selection(&self, cameras: &CameraList) -> Result<CameraId, ConfigError> {
        match self.selected_camera {
            Some(id) if cameras.contains(id) => Ok(id),
            Some(id) => Err(ConfigError::Validation {
                field: "selected_camera".into(),
                reason: format!("camera {id} is not configured"),
            }),
            None => cameras.first_id().ok_or_else(|| ConfigError::Validation {
                field: "cameras".into(),
                reason: "at least one camera is required".into(),
            }),
        }
    }

    /// Check everything the console needs before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cameras = self.camera_list()?;
        self.initial_selection(&cameras)?;
        if !self.map_config().fallback_position.is_valid() {
            return Err(ConfigError::Validation {
                field: "map.fallback_lat/fallback_lng".into(),
                reason: "coordinates out of range".into(),
            });
        }
        if self.map.init_max_attempts == 0 {
            return Err(ConfigError::Validation {
                field: "map.init_max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }
        if !self.stream.path.starts_with('/') {
            return Err(ConfigError::Validation {
                field: "stream.path".into(),
                reason: format!("must start with '/', got '{}'", self.stream.path),
            });
        }
        self.coordinator_config()?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn parse_placeholder(field: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("'{raw}' is not a URL: {e}"),
    })
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "opsboard", "opsboard").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("opsboard");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the platform config path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment. A missing file yields the
/// defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("OPSBOARD_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}
