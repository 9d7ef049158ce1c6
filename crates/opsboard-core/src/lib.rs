//! Live feed coordination for the emergency operations board.
//!
//! Two independent surfaces share nothing but this crate's error type:
//!
//! - **[`StreamCoordinator`]**: grid cells and a modal viewer over the same
//!   set of camera endpoints, with at most one live connection per camera.
//!   Opening the modal adopts the grid's connection by reference
//!   ([`ConnectionRegistry`](stream::registry)); when there is nothing to
//!   adopt, a fresh connection opens after a cancellable settle delay.
//!   [`run_stream_service`] drives a coordinator from a UI command channel
//!   on a tokio runtime.
//!
//! - **[`MarkerReconciler`]**: keeps map overlays in step with entity
//!   snapshots (emergencies, response vehicles) while the current-location
//!   marker and zoom control are set up exactly once per map instance.
//!   The map provider is reached through the [`MapSdk`] trait;
//!   [`HeadlessMap`] records everything for the console and tests.
//!
//! - **Domain model** ([`model`]): cameras, layouts, and map entities as
//!   they arrive from the feed.
//!
//! Configuration types ([`CoordinatorConfig`], [`MapConfig`]) are plain
//! values; loading them from disk is `opsboard-config`'s job.

pub mod config;
pub mod error;
pub mod map;
pub mod model;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    CoordinatorConfig, DEFAULT_STREAM_PATH, DEFAULT_STREAM_PORT, EndpointConfig,
    FALLBACK_POSITION, GRID_PLACEHOLDER, MODAL_PLACEHOLDER, MapConfig,
};
pub use error::CoreError;
pub use map::{HeadlessMap, MapSdk, MapStatus, MarkerReconciler, PositionSource};
pub use stream::{
    CameraPhase, ConnectionOutcome, HttpTransport, RecordingTransport, StreamCoordinator,
    StreamTransport, Surface, SurfaceEvent, UiCommand, run_stream_service,
};

pub use model::{
    CameraFeed, CameraId, CameraLayout, CameraList, CameraStatus, Coordinates, Emergency,
    EntityKey, EntitySnapshot, Vehicle,
};
