// ── Runtime configuration ──
//
// These types describe *how* the coordinator and the map surface behave.
// They never touch disk: opsboard-config builds them from TOML/env and
// hands them in.

use std::time::Duration;

use url::Url;

use crate::error::CoreError;
use crate::model::Coordinates;

/// Ulsan City Hall, used when device geolocation is unavailable.
pub const FALLBACK_POSITION: Coordinates = Coordinates::new(35.5384, 129.3114);

pub const DEFAULT_STREAM_PORT: u16 = 81;
pub const DEFAULT_STREAM_PATH: &str = "/stream";
pub const GRID_PLACEHOLDER: &str =
    "https://placehold.co/400x225/1f2937/cccccc?text=Connection+failed";
pub const MODAL_PLACEHOLDER: &str = "https://placehold.co/800x450/1f2937/cccccc?text=연결+실패";

/// Camera endpoint shape and placeholder images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Port of the camera's stream server.
    pub port: u16,
    /// Path of the continuous stream resource.
    pub path: String,
    /// Image shown by a grid cell whose connection failed.
    pub grid_placeholder: Url,
    /// Image shown by the modal when its connection failed.
    pub modal_placeholder: Url,
}

impl EndpointConfig {
    /// Port 81, `/stream`, and the stock placeholder images.
    pub fn standard() -> Result<Self, CoreError> {
        Ok(Self {
            port: DEFAULT_STREAM_PORT,
            path: DEFAULT_STREAM_PATH.into(),
            grid_placeholder: Url::parse(GRID_PLACEHOLDER)?,
            modal_placeholder: Url::parse(MODAL_PLACEHOLDER)?,
        })
    }
}

/// Stream surface coordinator tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub endpoint: EndpointConfig,
    /// Wait between suppressing a grid stream and opening a fresh modal
    /// connection on the same camera.
    pub settle_delay: Duration,
    /// Wait after modal close before paused grid streams reconnect.
    pub resume_delay: Duration,
    /// Pause grid connections of other cameras while the modal is open.
    pub pause_grid_while_modal: bool,
}

impl CoordinatorConfig {
    /// Default timing around a given endpoint shape.
    pub fn new(endpoint: EndpointConfig) -> Self {
        Self {
            endpoint,
            settle_delay: Duration::from_millis(300),
            resume_delay: Duration::from_millis(300),
            pause_grid_while_modal: true,
        }
    }

    pub fn standard() -> Result<Self, CoreError> {
        EndpointConfig::standard().map(Self::new)
    }
}

/// Map surface tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub fallback_position: Coordinates,
    /// Map zoom level at construction.
    pub zoom_level: u8,
    /// Upper bound on the geolocation query.
    pub geolocation_timeout: Duration,
    /// Interval between SDK readiness checks.
    pub init_poll_interval: Duration,
    /// Readiness checks before the map surface gives up.
    pub init_max_attempts: u32,
    pub current_location_title: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            fallback_position: FALLBACK_POSITION,
            zoom_level: 5,
            geolocation_timeout: Duration::from_secs(5),
            init_poll_interval: Duration::from_millis(100),
            init_max_attempts: 50,
            current_location_title: "현재 위치".into(),
        }
    }
}
