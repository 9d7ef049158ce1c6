// ── Headless map SDK ──
//
// Records every object the reconciler builds. Used by the console's
// `markers` command and by tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::IndexMap;
use serde::Serialize;

use super::sdk::{
    ControlPosition, LabelSpec, MapHandle, MapOptions, MapSdk, MarkerHandle, MarkerSpec,
    OverlayHandle, PopupHandle, PopupSpec,
};
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadlessPopup {
    pub marker: MarkerHandle,
    pub spec: PopupSpec,
}

#[derive(Debug, Default)]
pub struct HeadlessMap {
    /// Readiness checks still answered with `false`. `None` never readies.
    not_ready_for: Option<AtomicU32>,
    next_id: u64,
    maps: IndexMap<MapHandle, MapOptions>,
    markers: IndexMap<MarkerHandle, MarkerSpec>,
    labels: IndexMap<OverlayHandle, LabelSpec>,
    popups: IndexMap<PopupHandle, HeadlessPopup>,
    zoom_controls: Vec<(MapHandle, ControlPosition)>,
    fail_create_map: bool,
    failing_labels: HashSet<String>,
}

impl HeadlessMap {
    /// A map SDK that is ready immediately.
    pub fn new() -> Self {
        Self {
            not_ready_for: Some(AtomicU32::new(0)),
            ..Self::default()
        }
    }

    /// Report not-ready for the first `checks` readiness polls.
    pub fn ready_after(checks: u32) -> Self {
        Self {
            not_ready_for: Some(AtomicU32::new(checks)),
            ..Self::default()
        }
    }

    /// An SDK that never finishes loading.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Make map construction fail.
    pub fn with_failing_map(mut self) -> Self {
        self.fail_create_map = true;
        self
    }

    /// Make label creation fail for labels with this exact text.
    pub fn with_failing_label(mut self, text: impl Into<String>) -> Self {
        self.failing_labels.insert(text.into());
        self
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_map(&self, map: MapHandle, operation: &str) -> Result<(), CoreError> {
        if self.maps.contains_key(&map) {
            Ok(())
        } else {
            Err(CoreError::Sdk {
                operation: operation.into(),
                message: format!("unknown map {map}"),
            })
        }
    }

    // ── Inspection ───────────────────────────────────────────────

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn map_options(&self, map: MapHandle) -> Option<&MapOptions> {
        self.maps.get(&map)
    }

    pub fn markers(&self) -> impl Iterator<Item = (&MarkerHandle, &MarkerSpec)> {
        self.markers.iter()
    }

    pub fn marker(&self, marker: MarkerHandle) -> Option<&MarkerSpec> {
        self.markers.get(&marker)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn label(&self, overlay: OverlayHandle) -> Option<&LabelSpec> {
        self.labels.get(&overlay)
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn popup_count(&self) -> usize {
        self.popups.len()
    }

    pub fn zoom_controls(&self) -> &[(MapHandle, ControlPosition)] {
        &self.zoom_controls
    }

    /// The popup a click on `marker` would open.
    pub fn click(&self, marker: MarkerHandle) -> Option<&PopupSpec> {
        self.popups
            .values()
            .find(|p| p.marker == marker)
            .map(|p| &p.spec)
    }
}

impl MapSdk for HeadlessMap {
    fn is_ready(&self) -> bool {
        let Some(remaining) = &self.not_ready_for else {
            return false;
        };
        match remaining.load(Ordering::Relaxed) {
            0 => true,
            n => {
                remaining.store(n - 1, Ordering::Relaxed);
                false
            }
        }
    }

    fn create_map(&mut self, options: &MapOptions) -> Result<MapHandle, CoreError> {
        if self.fail_create_map {
            return Err(CoreError::Sdk {
                operation: "create_map".into(),
                message: "container has no size".into(),
            });
        }
        let handle = MapHandle(self.next());
        self.maps.insert(handle, options.clone());
        Ok(handle)
    }

    fn add_marker(&mut self, map: MapHandle, spec: &MarkerSpec) -> Result<MarkerHandle, CoreError> {
        self.require_map(map, "add_marker")?;
        let handle = MarkerHandle(self.next());
        self.markers.insert(handle, spec.clone());
        Ok(handle)
    }

    fn remove_marker(&mut self, marker: MarkerHandle) {
        self.markers.shift_remove(&marker);
    }

    fn add_label(&mut self, map: MapHandle, spec: &LabelSpec) -> Result<OverlayHandle, CoreError> {
        self.require_map(map, "add_label")?;
        if self.failing_labels.contains(&spec.text) {
            return Err(CoreError::Sdk {
                operation: "add_label".into(),
                message: format!("overlay rejected: {}", spec.text),
            });
        }
        let handle = OverlayHandle(self.next());
        self.labels.insert(handle, spec.clone());
        Ok(handle)
    }

    fn remove_label(&mut self, overlay: OverlayHandle) {
        self.labels.shift_remove(&overlay);
    }

    fn bind_popup(
        &mut self,
        map: MapHandle,
        marker: MarkerHandle,
        spec: &PopupSpec,
    ) -> Result<PopupHandle, CoreError> {
        self.require_map(map, "bind_popup")?;
        if !self.markers.contains_key(&marker) {
            return Err(CoreError::Sdk {
                operation: "bind_popup".into(),
                message: format!("unknown marker {marker}"),
            });
        }
        let handle = PopupHandle(self.next());
        self.popups.insert(
            handle,
            HeadlessPopup {
                marker,
                spec: spec.clone(),
            },
        );
        Ok(handle)
    }

    fn remove_popup(&mut self, popup: PopupHandle) {
        self.popups.shift_remove(&popup);
    }

    fn add_zoom_control(
        &mut self,
        map: MapHandle,
        position: ControlPosition,
    ) -> Result<(), CoreError> {
        self.require_map(map, "add_zoom_control")?;
        self.zoom_controls.push((map, position));
        Ok(())
    }
}
