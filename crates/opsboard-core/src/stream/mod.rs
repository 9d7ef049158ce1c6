// ── Stream surface coordination ──
//
// One live connection per camera, shared by reference between the grid
// cell and the modal viewer. The coordinator owns the registry, the
// scheduled settle/resume tasks, and the per-camera state machine.

pub mod coordinator;
pub mod endpoint;
pub mod http;
pub mod registry;
pub mod schedule;
pub mod service;
pub mod transport;

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{CameraId, CameraStatus};

pub use coordinator::{CellView, ModalView, StreamCoordinator, SurfaceDisplay};
pub use http::{HttpTransport, ProbeReport, probe_endpoint};
pub use registry::{ConnectionId, HandleStatus, StreamHandle};
pub use schedule::TaskId;
pub use service::{UiCommand, run_stream_service};
pub use transport::{RecordingTransport, StreamTransport, TransportOp};

/// A renderable slot that can display a camera's live resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "surface", content = "camera", rename_all = "lowercase")]
pub enum Surface {
    Grid(CameraId),
    Modal(CameraId),
}

impl Surface {
    pub fn camera(self) -> CameraId {
        match self {
            Self::Grid(id) | Self::Modal(id) => id,
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(id) => write!(f, "grid({id})"),
            Self::Modal(id) => write!(f, "modal({id})"),
        }
    }
}

/// Per-camera display state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CameraPhase {
    #[default]
    Idle,
    GridActive,
    Handoff,
    ModalActive,
}

/// Asynchronous result of a connection request, reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionOutcome {
    Established(ConnectionId),
    Failed { id: ConnectionId, reason: String },
}

/// Observable coordinator activity, published on a broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SurfaceEvent {
    Transition {
        camera: CameraId,
        from: CameraPhase,
        to: CameraPhase,
    },
    Suppressed {
        camera: CameraId,
        suppressed: bool,
    },
    ConnectionOpened {
        camera: CameraId,
        id: ConnectionId,
        surface: Surface,
        url: Url,
    },
    ConnectionAdopted {
        camera: CameraId,
        id: ConnectionId,
        surface: Surface,
    },
    ConnectionClosed {
        camera: CameraId,
        id: ConnectionId,
    },
    ConnectionFailed {
        camera: CameraId,
        id: ConnectionId,
        reason: String,
    },
    StatusChanged {
        camera: CameraId,
        status: CameraStatus,
    },
    GridPaused {
        paused: bool,
    },
}
