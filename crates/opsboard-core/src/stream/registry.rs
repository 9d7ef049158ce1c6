// ── Connection handle registry ──
//
// The single source of truth for live camera connections. Surfaces hold
// a `ConnectionId` and hand it to each other; nothing rediscovers a
// connection by inspecting rendered output.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use super::Surface;
use crate::error::CoreError;
use crate::model::CameraId;

/// Identity of one connection to a camera endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleStatus {
    Connecting,
    Live,
}

/// A live (or in-flight) connection and the surface currently rendering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamHandle {
    pub id: ConnectionId,
    pub camera: CameraId,
    pub url: Url,
    pub status: HandleStatus,
    pub holder: Surface,
}

#[derive(Debug, Default)]
pub(crate) struct ConnectionRegistry {
    next_id: u64,
    handles: HashMap<ConnectionId, StreamHandle>,
    by_camera: HashMap<CameraId, ConnectionId>,
}

impl ConnectionRegistry {
    /// Register a new connection. Fails if the camera already has one.
    pub(crate) fn open(
        &mut self,
        camera: CameraId,
        url: Url,
        holder: Surface,
    ) -> Result<&StreamHandle, CoreError> {
        if let Some(existing) = self.by_camera.get(&camera) {
            return Err(CoreError::DuplicateConnection {
                camera,
                existing: *existing,
            });
        }
        self.next_id += 1;
        let id = ConnectionId(self.next_id);
        self.by_camera.insert(camera, id);
        let handle = self.handles.entry(id).or_insert(StreamHandle {
            id,
            camera,
            url,
            status: HandleStatus::Connecting,
            holder,
        });
        Ok(handle)
    }

    /// Forget a connection. Returns the handle if it existed.
    pub(crate) fn close(&mut self, id: ConnectionId) -> Option<StreamHandle> {
        let handle = self.handles.remove(&id)?;
        self.by_camera.remove(&handle.camera);
        Some(handle)
    }

    pub(crate) fn get(&self, id: ConnectionId) -> Option<&StreamHandle> {
        self.handles.get(&id)
    }

    pub(crate) fn for_camera(&self, camera: CameraId) -> Option<&StreamHandle> {
        self.by_camera
            .get(&camera)
            .and_then(|id| self.handles.get(id))
    }

    /// Move display responsibility to another surface of the same camera.
    pub(crate) fn transfer(&mut self, id: ConnectionId, holder: Surface) -> Result<(), CoreError> {
        let handle = self
            .handles
            .get_mut(&id)
            .ok_or(CoreError::UnknownConnection { id })?;
        if handle.camera != holder.camera() {
            return Err(CoreError::Internal(format!(
                "cannot hand {id} of camera {} to {holder}",
                handle.camera
            )));
        }
        handle.holder = holder;
        Ok(())
    }

    pub(crate) fn mark_live(&mut self, id: ConnectionId) -> Option<&StreamHandle> {
        let handle = self.handles.get_mut(&id)?;
        handle.status = HandleStatus::Live;
        Some(handle)
    }

    pub(crate) fn ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.handles.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &StreamHandle> {
        self.handles.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("http://172.31.0.101:81/stream").unwrap()
    }

    #[test]
    fn second_connection_for_same_camera_is_rejected() {
        let mut reg = ConnectionRegistry::default();
        let first = reg
            .open(CameraId(1), url(), Surface::Grid(CameraId(1)))
            .unwrap()
            .id;
        let err = reg
            .open(CameraId(1), url(), Surface::Modal(CameraId(1)))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::DuplicateConnection { existing, .. } if existing == first
        ));
    }

    #[test]
    fn close_frees_the_camera_slot() {
        let mut reg = ConnectionRegistry::default();
        let id = reg
            .open(CameraId(1), url(), Surface::Grid(CameraId(1)))
            .unwrap()
            .id;
        assert!(reg.close(id).is_some());
        assert!(reg.for_camera(CameraId(1)).is_none());
        assert!(
            reg.open(CameraId(1), url(), Surface::Modal(CameraId(1)))
                .is_ok()
        );
    }

    #[test]
    fn transfer_keeps_connection_identity() {
        let mut reg = ConnectionRegistry::default();
        let id = reg
            .open(CameraId(2), url(), Surface::Grid(CameraId(2)))
            .unwrap()
            .id;
        reg.transfer(id, Surface::Modal(CameraId(2))).unwrap();
        let handle = reg.for_camera(CameraId(2)).unwrap();
        assert_eq!(handle.id, id);
        assert_eq!(handle.holder, Surface::Modal(CameraId(2)));
    }

    #[test]
    fn transfer_across_cameras_is_refused() {
        let mut reg = ConnectionRegistry::default();
        let id = reg
            .open(CameraId(2), url(), Surface::Grid(CameraId(2)))
            .unwrap()
            .id;
        assert!(reg.transfer(id, Surface::Modal(CameraId(3))).is_err());
    }
}
