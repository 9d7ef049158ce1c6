// ── Overlay collection ──

use serde::Serialize;

use super::sdk::{MarkerHandle, OverlayHandle, PopupHandle};
use crate::model::EntityKey;

/// The three SDK objects drawn for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayTriple {
    pub key: EntityKey,
    pub marker: MarkerHandle,
    pub label: OverlayHandle,
    pub popup: PopupHandle,
}

/// Persistent current-location marker plus the transient entity triples.
///
/// The persistent marker is kept apart from the transient list so a
/// clear-and-rebuild pass cannot touch it; [`tracked_markers`] always
/// reports it first.
///
/// [`tracked_markers`]: MarkerSet::tracked_markers
#[derive(Debug, Default)]
pub struct MarkerSet {
    persistent: Option<MarkerHandle>,
    transient: Vec<OverlayTriple>,
}

impl MarkerSet {
    pub fn persistent(&self) -> Option<MarkerHandle> {
        self.persistent
    }

    pub(crate) fn set_persistent(&mut self, marker: MarkerHandle) {
        self.persistent = Some(marker);
    }

    pub(crate) fn take_persistent(&mut self) -> Option<MarkerHandle> {
        self.persistent.take()
    }

    pub fn triples(&self) -> &[OverlayTriple] {
        &self.transient
    }

    pub(crate) fn push(&mut self, triple: OverlayTriple) {
        self.transient.push(triple);
    }

    pub(crate) fn take_transient(&mut self) -> Vec<OverlayTriple> {
        std::mem::take(&mut self.transient)
    }

    /// Every marker handle, persistent first.
    pub fn tracked_markers(&self) -> Vec<MarkerHandle> {
        self.persistent
            .into_iter()
            .chain(self.transient.iter().map(|t| t.marker))
            .collect()
    }

    pub fn keys(&self) -> Vec<&EntityKey> {
        self.transient.iter().map(|t| &t.key).collect()
    }

    pub fn len(&self) -> usize {
        self.transient.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transient.is_empty()
    }
}
