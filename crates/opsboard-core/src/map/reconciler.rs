// ── Marker reconciler ──
//
// Owns one map instance: its one-time setup (center, persistent marker,
// zoom control) and the transient overlays drawn from entity snapshots.
// Every snapshot triggers a full clear-and-rebuild of the transient set;
// the persistent marker is never part of that set.

use std::collections::HashSet;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::markers::{MarkerSet, OverlayTriple};
use super::overlay::{OverlayPlan, plan_emergency, plan_vehicle};
use super::sdk::{ControlPosition, MapHandle, MapOptions, MapSdk, MarkerSpec, PositionSource};
use crate::config::MapConfig;
use crate::error::CoreError;
use crate::model::{Coordinates, EntitySnapshot};

/// Observable state of the map surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum MapStatus {
    Loading,
    Ready,
    /// Terminal. Carries the banner text.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntity {
    pub key: String,
    pub reason: String,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub drawn: usize,
    pub skipped: Vec<SkippedEntity>,
}

impl ReconcileReport {
    fn skip(&mut self, key: String, reason: String) {
        warn!(%key, %reason, "entity skipped");
        self.skipped.push(SkippedEntity { key, reason });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InitOutcome {
    Initialized {
        center: Coordinates,
        used_fallback: bool,
        report: ReconcileReport,
    },
    /// The guard was already set; nothing ran.
    AlreadyInitialized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "report", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// No map yet; the snapshot is kept for the first pass.
    Deferred,
    Reconciled(ReconcileReport),
}

pub struct MarkerReconciler<S: MapSdk> {
    sdk: S,
    config: MapConfig,
    map: Option<MapHandle>,
    markers: MarkerSet,
    /// Set once per instance, never reset except by a cancelled init that
    /// built nothing.
    initialized: bool,
    latest: EntitySnapshot,
    status: watch::Sender<MapStatus>,
}

impl<S: MapSdk> MarkerReconciler<S> {
    pub fn new(sdk: S, config: MapConfig) -> Self {
        let (status, _) = watch::channel(MapStatus::Loading);
        Self {
            sdk,
            config,
            map: None,
            markers: MarkerSet::default(),
            initialized: false,
            latest: EntitySnapshot::default(),
            status,
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn map(&self) -> Option<MapHandle> {
        self.map
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn status(&self) -> MapStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<MapStatus> {
        self.status.subscribe()
    }

    // ── Initialization ───────────────────────────────────────────

    /// Run the one-time setup. A second call is a no-op.
    ///
    /// Waits for SDK readiness (bounded polling), resolves the center
    /// (bounded geolocation wait, fallback on any failure), builds the map,
    /// the persistent marker, and the zoom control, then draws the latest
    /// snapshot. Any failure other than cancellation is terminal.
    pub async fn initialize<P: PositionSource>(
        &mut self,
        position: &P,
        cancel: &CancellationToken,
    ) -> Result<InitOutcome, CoreError> {
        if self.initialized {
            debug!("map already initialized, skipping");
            return Ok(InitOutcome::AlreadyInitialized);
        }
        self.initialized = true;

        if let Err(e) = self.wait_until_ready(cancel).await {
            return self.abort_init(e);
        }
        let (center, used_fallback) = match self.resolve_center(position, cancel).await {
            Ok(resolved) => resolved,
            Err(e) => return self.abort_init(e),
        };
        if let Err(e) = self.build_map(center) {
            return self.abort_init(e);
        }

        let report = self.reconcile_pass();
        self.status.send_replace(MapStatus::Ready);
        info!(%center, used_fallback, drawn = report.drawn, "map ready");
        Ok(InitOutcome::Initialized {
            center,
            used_fallback,
            report,
        })
    }

    async fn wait_until_ready(&self, cancel: &CancellationToken) -> Result<(), CoreError> {
        let mut attempts: u32 = 0;
        loop {
            if self.sdk.is_ready() {
                debug!(attempts, "map SDK ready");
                return Ok(());
            }
            attempts += 1;
            if attempts >= self.config.init_max_attempts {
                return Err(CoreError::MapUnavailable { attempts });
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CoreError::InitCancelled),
                () = tokio::time::sleep(self.config.init_poll_interval) => {}
            }
        }
    }

    async fn resolve_center<P: PositionSource>(
        &self,
        position: &P,
        cancel: &CancellationToken,
    ) -> Result<(Coordinates, bool), CoreError> {
        let fallback = self.config.fallback_position;
        let query = tokio::time::timeout(
            self.config.geolocation_timeout,
            position.current_position(),
        );
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::InitCancelled),
            result = query => result,
        };

        match result {
            Ok(Ok(center)) if center.is_valid() => Ok((center, false)),
            Ok(Ok(center)) => {
                warn!(%center, "geolocation returned an invalid position, using fallback");
                Ok((fallback, true))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "geolocation failed, using fallback");
                Ok((fallback, true))
            }
            Err(_) => {
                warn!(
                    timeout = ?self.config.geolocation_timeout,
                    "geolocation timed out, using fallback"
                );
                Ok((fallback, true))
            }
        }
    }

    fn build_map(&mut self, center: Coordinates) -> Result<(), CoreError> {
        let map = self.sdk.create_map(&MapOptions {
            center,
            level: self.config.zoom_level,
        })?;
        let persistent = self.sdk.add_marker(
            map,
            &MarkerSpec {
                position: center,
                title: self.config.current_location_title.clone(),
            },
        )?;
        if let Err(e) = self.sdk.add_zoom_control(map, ControlPosition::Right) {
            self.sdk.remove_marker(persistent);
            return Err(e);
        }
        self.markers.set_persistent(persistent);
        self.map = Some(map);
        Ok(())
    }

    fn abort_init(&mut self, error: CoreError) -> Result<InitOutcome, CoreError> {
        if matches!(error, CoreError::InitCancelled) {
            // Nothing was built; a later mount may try again.
            self.initialized = false;
            debug!("map initialization cancelled");
        } else {
            warn!(error = %error, "map initialization failed");
            self.status
                .send_replace(MapStatus::Failed(format!("맵 로딩 실패: {error}")));
        }
        Err(error)
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// Replace the entity set. Drawn immediately when the map exists,
    /// otherwise kept for the first pass.
    pub fn update(&mut self, snapshot: EntitySnapshot) -> UpdateOutcome {
        self.latest = snapshot;
        if self.map.is_none() {
            debug!(entities = self.latest.len(), "map not ready, snapshot retained");
            return UpdateOutcome::Deferred;
        }
        UpdateOutcome::Reconciled(self.reconcile_pass())
    }

    fn reconcile_pass(&mut self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let Some(map) = self.map else {
            return report;
        };
        let persistent = self.markers.persistent();

        for triple in self.markers.take_transient() {
            self.destroy_triple(&triple);
        }

        let plans: Vec<Result<OverlayPlan, CoreError>> = self
            .latest
            .emergencies
            .iter()
            .map(plan_emergency)
            .chain(self.latest.vehicles.iter().map(plan_vehicle))
            .collect();

        let mut seen = HashSet::new();
        for plan in plans {
            let plan = match plan {
                Ok(plan) => plan,
                Err(CoreError::InvalidEntity { key, reason }) => {
                    report.skip(key, reason);
                    continue;
                }
                Err(e) => {
                    report.skip("<unknown>".into(), e.to_string());
                    continue;
                }
            };
            if !seen.insert(plan.key.clone()) {
                report.skip(plan.key.to_string(), "duplicate key in snapshot".into());
                continue;
            }
            match self.build_triple(map, &plan) {
                Ok(triple) => self.markers.push(triple),
                Err(e) => report.skip(plan.key.to_string(), e.to_string()),
            }
        }

        debug_assert_eq!(self.markers.persistent(), persistent);
        report.drawn = self.markers.len();
        debug!(
            drawn = report.drawn,
            skipped = report.skipped.len(),
            "markers reconciled"
        );
        report
    }

    /// Build marker, label, and popup. A failure removes whatever part of
    /// the triple already exists.
    fn build_triple(
        &mut self,
        map: MapHandle,
        plan: &OverlayPlan,
    ) -> Result<OverlayTriple, CoreError> {
        let marker = self.sdk.add_marker(map, &plan.marker)?;
        let label = match self.sdk.add_label(map, &plan.label) {
            Ok(label) => label,
            Err(e) => {
                self.sdk.remove_marker(marker);
                return Err(e);
            }
        };
        let popup = match self.sdk.bind_popup(map, marker, &plan.popup) {
            Ok(popup) => popup,
            Err(e) => {
                self.sdk.remove_label(label);
                self.sdk.remove_marker(marker);
                return Err(e);
            }
        };
        Ok(OverlayTriple {
            key: plan.key.clone(),
            marker,
            label,
            popup,
        })
    }

    fn destroy_triple(&mut self, triple: &OverlayTriple) {
        self.sdk.remove_popup(triple.popup);
        self.sdk.remove_label(triple.label);
        self.sdk.remove_marker(triple.marker);
    }

    /// Detach every overlay, the persistent marker included. The instance
    /// is dead afterwards; the init guard stays set.
    pub fn teardown(&mut self) {
        for triple in self.markers.take_transient() {
            self.destroy_triple(&triple);
        }
        if let Some(marker) = self.markers.take_persistent() {
            self.sdk.remove_marker(marker);
        }
        if let Some(map) = self.map.take() {
            info!(%map, "map torn down");
        }
    }
}
