// ── Core error types ──
//
// User-facing errors from opsboard-core. Connection failures and malformed
// entities are degraded locally (placeholder, skipped marker) and only show
// up here when a caller asks for something the core cannot do at all.

use thiserror::Error;

use crate::model::CameraId;
use crate::stream::ConnectionId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Camera / stream errors ───────────────────────────────────────
    #[error("Camera not found: {id}")]
    CameraNotFound { id: CameraId },

    #[error("Camera {camera} already has an active connection ({existing})")]
    DuplicateConnection {
        camera: CameraId,
        existing: ConnectionId,
    },

    #[error("Unknown connection handle: {id}")]
    UnknownConnection { id: ConnectionId },

    #[error("Stream transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Invalid stream endpoint for camera {camera}: {reason}")]
    InvalidEndpoint { camera: CameraId, reason: String },

    // ── Map errors ───────────────────────────────────────────────────
    #[error("Map SDK not available after {attempts} attempts")]
    MapUnavailable { attempts: u32 },

    #[error("Map initialization failed: {message}")]
    MapInit { message: String },

    #[error("Map initialization cancelled")]
    InitCancelled,

    #[error("Map SDK call failed: {operation}: {message}")]
    Sdk { operation: String, message: String },

    #[error("Invalid entity {key}: {reason}")]
    InvalidEntity { key: String, reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Transport {
            url: err
                .url()
                .map_or_else(|| "<unknown>".into(), ToString::to_string),
            reason: err.to_string(),
        }
    }
}

impl From<url::ParseError> for CoreError {
    fn from(err: url::ParseError) -> Self {
        CoreError::Config {
            message: format!("Invalid URL: {err}"),
        }
    }
}
