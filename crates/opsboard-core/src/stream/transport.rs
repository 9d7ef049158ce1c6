// ── Stream transport seam ──
//
// The coordinator decides *when* a connection exists; a transport makes
// it exist. Outcomes that arrive later (established / failed) are fed
// back through `StreamCoordinator::apply_outcome`.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use url::Url;

use super::registry::{ConnectionId, StreamHandle};
use crate::error::CoreError;
use crate::model::CameraId;

pub trait StreamTransport {
    /// Start pulling from the handle's endpoint. An `Err` means the request
    /// could not even be issued; the surface falls back to its placeholder.
    fn connect(&mut self, handle: &StreamHandle) -> Result<(), CoreError>;

    /// Stop pulling. Must tolerate ids whose connection already ended.
    fn disconnect(&mut self, handle: &StreamHandle);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransportOp {
    Connect {
        id: ConnectionId,
        camera: CameraId,
        url: Url,
    },
    Disconnect {
        id: ConnectionId,
        camera: CameraId,
    },
    /// A connect request that failed before any connection existed.
    /// No `Disconnect` follows it.
    Refused {
        id: ConnectionId,
        camera: CameraId,
        url: Url,
    },
}

/// In-memory transport that records every request.
///
/// Used by the headless console and by tests to assert connection counts.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    log: Vec<TransportOp>,
    open: HashMap<ConnectionId, CameraId>,
    unreachable: HashSet<CameraId>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `connect` fail immediately for a camera.
    pub fn with_unreachable(mut self, camera: CameraId) -> Self {
        self.unreachable.insert(camera);
        self
    }

    pub fn log(&self) -> &[TransportOp] {
        &self.log
    }

    /// Connections currently open towards a camera's endpoint.
    pub fn open_count(&self, camera: CameraId) -> usize {
        self.open.values().filter(|c| **c == camera).count()
    }

    pub fn total_open(&self) -> usize {
        self.open.len()
    }

    /// Connect requests ever issued for a camera, refused ones included.
    pub fn connect_count(&self, camera: CameraId) -> usize {
        self.log
            .iter()
            .filter(|op| match op {
                TransportOp::Connect { camera: c, .. } | TransportOp::Refused { camera: c, .. } => {
                    *c == camera
                }
                TransportOp::Disconnect { .. } => false,
            })
            .count()
    }
}

impl StreamTransport for RecordingTransport {
    fn connect(&mut self, handle: &StreamHandle) -> Result<(), CoreError> {
        if self.unreachable.contains(&handle.camera) {
            self.log.push(TransportOp::Refused {
                id: handle.id,
                camera: handle.camera,
                url: handle.url.clone(),
            });
            return Err(CoreError::Transport {
                url: handle.url.to_string(),
                reason: "endpoint unreachable".into(),
            });
        }
        self.log.push(TransportOp::Connect {
            id: handle.id,
            camera: handle.camera,
            url: handle.url.clone(),
        });
        self.open.insert(handle.id, handle.camera);
        Ok(())
    }

    fn disconnect(&mut self, handle: &StreamHandle) {
        if self.open.remove(&handle.id).is_some() {
            self.log.push(TransportOp::Disconnect {
                id: handle.id,
                camera: handle.camera,
            });
        }
    }
}
