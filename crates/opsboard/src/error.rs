//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use opsboard_config::ConfigError;
use opsboard_core::{CameraId, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Cameras ──────────────────────────────────────────────────────
    #[error("Camera '{id}' not found")]
    #[diagnostic(
        code(opsboard::camera_not_found),
        help("Run: opsboard cameras list to see configured cameras")
    )]
    CameraNotFound { id: CameraId },

    #[error("{unreachable} of {total} camera endpoints did not answer")]
    #[diagnostic(
        code(opsboard::unreachable),
        help("Check the camera's network and that its stream server listens on the configured port.")
    )]
    Unreachable { unreachable: usize, total: usize },

    // ── Map ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(opsboard::map_failed))]
    MapFailed { message: String },

    // ── Input files ──────────────────────────────────────────────────
    #[error("Could not read {}", .path.display())]
    #[diagnostic(code(opsboard::read_input))]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}", .path.display())]
    #[diagnostic(code(opsboard::json), help("Check the JSON file contents and try again."))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(opsboard::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(opsboard::config),
        help(
            "Expected at: {path}\n\
             Show the effective settings with: opsboard config show"
        )
    )]
    Config { message: String, path: String },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(opsboard::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(opsboard::render))]
    Render(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CameraNotFound { .. } => exit_code::NOT_FOUND,
            Self::Unreachable { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::Config { .. } | Self::Json { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    pub fn config(err: ConfigError, path: &std::path::Path) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config {
                message: other.to_string(),
                path: path.display().to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CameraNotFound { id } => CliError::CameraNotFound { id },

            CoreError::MapUnavailable { .. }
            | CoreError::MapInit { .. }
            | CoreError::Sdk { .. }
            | CoreError::InitCancelled => CliError::MapFailed {
                message: format!("맵 로딩 실패: {err}"),
            },

            CoreError::InvalidEndpoint { camera, reason } => CliError::Validation {
                field: format!("camera {camera} endpoint"),
                reason,
            },

            CoreError::InvalidEntity { key, reason } => CliError::Validation {
                field: key,
                reason,
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::DuplicateConnection { .. }
            | CoreError::UnknownConnection { .. }
            | CoreError::Transport { .. }
            | CoreError::Internal(_) => CliError::Internal(err.to_string()),
        }
    }
}
