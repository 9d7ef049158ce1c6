// ── Stream surface coordinator ──
//
// Owns the connection registry, the grid cells, the modal, and the
// settle/resume tasks. UI code only calls the operations below; it never
// touches a connection directly.
//
// Per-camera phases:
//
//   IDLE ──mount──▶ GRID_ACTIVE ──open_modal──▶ HANDOFF ──adopt / settle──▶ MODAL_ACTIVE
//     ▲                 ▲                                                      │
//     └──unmount──┘     └───────────────────close_modal────────────────────────┘

use std::collections::HashMap;

use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use url::Url;

use super::endpoint::{fresh_stream_url, stream_url};
use super::registry::{ConnectionId, ConnectionRegistry, HandleStatus, StreamHandle};
use super::schedule::{Scheduler, TaskId, TaskKind, TaskOwner};
use super::transport::StreamTransport;
use super::{CameraPhase, ConnectionOutcome, Surface, SurfaceEvent};
use crate::config::CoordinatorConfig;
use crate::error::CoreError;
use crate::model::{CameraId, CameraLayout, CameraList, CameraStatus};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── Surfaces ─────────────────────────────────────────────────────

#[derive(Debug)]
struct GridCell {
    connection: Option<ConnectionId>,
    /// Hidden while the modal shows this camera. The cell stays mounted.
    suppressed: bool,
    /// Waiting for the grid resume after a modal closed.
    paused: bool,
    /// Connection failed; shows the placeholder until unmounted.
    failed: bool,
}

impl GridCell {
    fn new() -> Self {
        Self {
            connection: None,
            suppressed: false,
            paused: false,
            failed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModalSource {
    /// Displays the grid's connection, transferred by reference.
    Adopted,
    /// Opened its own connection after the settle delay.
    Independent,
    /// Settle delay still running.
    Pending(TaskId),
}

#[derive(Debug)]
struct ModalSurface {
    camera: CameraId,
    connection: Option<ConnectionId>,
    source: ModalSource,
    failed: bool,
}

// ── Views ────────────────────────────────────────────────────────

/// What a surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "display", content = "url", rename_all = "snake_case")]
pub enum SurfaceDisplay {
    /// Suppressed while the modal renders this camera.
    Hidden,
    /// Grid connection paused while a modal is open.
    Paused,
    /// Waiting for the modal's settle delay.
    Settling,
    Connecting(Url),
    Live(Url),
    Placeholder(Url),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub camera: CameraId,
    pub name: String,
    pub status: CameraStatus,
    /// Highlighted as the primary camera.
    pub selected: bool,
    /// "Parking detected" recording badge.
    pub detected: bool,
    pub phase: CameraPhase,
    pub display: SurfaceDisplay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub camera: CameraId,
    pub name: String,
    pub status: CameraStatus,
    pub address: String,
    pub phase: CameraPhase,
    pub display: SurfaceDisplay,
    /// Dispatch actions are offered for detected cameras only.
    pub actions_enabled: bool,
}

// ── StreamCoordinator ────────────────────────────────────────────

/// Guarantees at most one connection per camera across grid and modal.
pub struct StreamCoordinator<T: StreamTransport> {
    config: CoordinatorConfig,
    cameras: CameraList,
    transport: T,
    registry: ConnectionRegistry,
    scheduler: Scheduler,
    fired_rx: Option<mpsc::UnboundedReceiver<TaskId>>,
    selected: CameraId,
    layout: CameraLayout,
    mounted: bool,
    /// Mounted grid cells in display order.
    cells: IndexMap<CameraId, GridCell>,
    modal: Option<ModalSurface>,
    phases: HashMap<CameraId, CameraPhase>,
    grid_paused: bool,
    stream_key: u64,
    events: broadcast::Sender<SurfaceEvent>,
}

impl<T: StreamTransport> StreamCoordinator<T> {
    /// Create a coordinator. Nothing is mounted until [`mount`](Self::mount).
    pub fn new(
        config: CoordinatorConfig,
        cameras: CameraList,
        transport: T,
    ) -> Result<Self, CoreError> {
        let selected = cameras.first_id().ok_or_else(|| CoreError::Config {
            message: "camera list is empty".into(),
        })?;
        let (scheduler, fired_rx) = Scheduler::new();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Ok(Self {
            config,
            cameras,
            transport,
            registry: ConnectionRegistry::default(),
            scheduler,
            fired_rx: Some(fired_rx),
            selected,
            layout: CameraLayout::default(),
            mounted: false,
            cells: IndexMap::new(),
            modal: None,
            phases: HashMap::new(),
            grid_paused: false,
            stream_key: 0,
            events,
        })
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn cameras(&self) -> &CameraList {
        &self.cameras
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn selected(&self) -> CameraId {
        self.selected
    }

    pub fn layout(&self) -> CameraLayout {
        self.layout
    }

    pub fn is_grid_paused(&self) -> bool {
        self.grid_paused
    }

    pub fn modal_camera(&self) -> Option<CameraId> {
        self.modal.as_ref().map(|m| m.camera)
    }

    pub fn phase(&self, camera: CameraId) -> CameraPhase {
        self.phases.get(&camera).copied().unwrap_or_default()
    }

    /// Camera ids of the mounted grid cells, in display order.
    pub fn grid_cameras(&self) -> Vec<CameraId> {
        self.cells.keys().copied().collect()
    }

    /// Whether the grid cell of a camera is currently suppressed.
    pub fn is_suppressed(&self, camera: CameraId) -> bool {
        self.cells.get(&camera).is_some_and(|c| c.suppressed)
    }

    /// The connection of a camera, whichever surface holds it.
    pub fn connection_for(&self, camera: CameraId) -> Option<&StreamHandle> {
        self.registry.for_camera(camera)
    }

    pub fn connections(&self) -> impl Iterator<Item = &StreamHandle> {
        self.registry.iter()
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Subscribe to transitions and connection activity.
    pub fn subscribe(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.events.subscribe()
    }

    /// Hand the fired-task receiver to an external event loop.
    pub fn take_fired(&mut self) -> Option<mpsc::UnboundedReceiver<TaskId>> {
        self.fired_rx.take()
    }

    // ── Operations ───────────────────────────────────────────────

    /// Mount the grid with the current selection and layout.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        info!(layout = %self.layout, selected = %self.selected, "mounting camera grid");
        self.reconcile_grid();
    }

    /// Make a camera the primary grid camera. Cameras that stay mounted
    /// keep their connections; only cells entering or leaving the grid
    /// connect or disconnect.
    pub fn select_camera(&mut self, camera: CameraId) -> Result<(), CoreError> {
        self.cameras.require(camera)?;
        if self.selected == camera {
            return Ok(());
        }
        debug!(%camera, "selecting camera");
        self.selected = camera;
        self.reconcile_grid();
        Ok(())
    }

    pub fn set_layout(&mut self, layout: CameraLayout) {
        if self.layout == layout {
            return;
        }
        debug!(%layout, "changing grid layout");
        self.layout = layout;
        self.reconcile_grid();
    }

    /// Show a camera in the modal. Any other open modal is fully closed
    /// first.
    ///
    /// Must be called inside a tokio runtime: the settle delay runs as a
    /// spawned timer task.
    pub fn open_modal(&mut self, camera: CameraId) -> Result<(), CoreError> {
        self.cameras.require(camera)?;
        if let Some(current) = self.modal.as_ref().map(|m| m.camera) {
            if current == camera {
                return Ok(());
            }
            self.close_modal_inner(true);
        }

        self.stream_key += 1;
        self.scheduler.cancel_owner(TaskOwner::GridResume);
        if self.config.pause_grid_while_modal {
            self.pause_grid_except(camera);
        }

        self.set_phase(camera, CameraPhase::Handoff);

        let adopted = match self.cells.get_mut(&camera) {
            Some(cell) => {
                cell.suppressed = true;
                cell.paused = false;
                let _ = self.events.send(SurfaceEvent::Suppressed {
                    camera,
                    suppressed: true,
                });
                cell.connection.take()
            }
            None => None,
        };

        let adopted = match adopted {
            Some(id) => match self.registry.transfer(id, Surface::Modal(camera)) {
                Ok(()) => Some(id),
                Err(e) => {
                    warn!(%camera, error = %e, "grid connection not adoptable, opening fresh");
                    self.disconnect(id);
                    None
                }
            },
            None => None,
        };

        match adopted {
            Some(id) => {
                info!(%camera, connection = %id, "modal adopted grid connection");
                let _ = self.events.send(SurfaceEvent::ConnectionAdopted {
                    camera,
                    id,
                    surface: Surface::Modal(camera),
                });
                self.modal = Some(ModalSurface {
                    camera,
                    connection: Some(id),
                    source: ModalSource::Adopted,
                    failed: false,
                });
                self.set_phase(camera, CameraPhase::ModalActive);
            }
            None => {
                let task = self.scheduler.schedule(
                    TaskOwner::Modal(camera),
                    TaskKind::ModalConnect {
                        camera,
                        stream_key: self.stream_key,
                    },
                    self.config.settle_delay,
                );
                debug!(%camera, %task, "no grid connection to adopt, settling");
                self.modal = Some(ModalSurface {
                    camera,
                    connection: None,
                    source: ModalSource::Pending(task),
                    failed: false,
                });
            }
        }
        Ok(())
    }

    /// Close the modal and restore the grid. No-op when nothing is open.
    ///
    /// Must be called inside a tokio runtime: resuming a paused grid runs
    /// as a spawned timer task.
    pub fn close_modal(&mut self) {
        self.close_modal_inner(false);
    }

    /// Reflect an external status change. Connections are untouched.
    pub fn update_status(&mut self, camera: CameraId, status: CameraStatus) -> Result<(), CoreError> {
        let previous = self.cameras.set_status(camera, status)?;
        if previous != status {
            debug!(%camera, %status, "camera status changed");
            let _ = self.events.send(SurfaceEvent::StatusChanged { camera, status });
        }
        Ok(())
    }

    /// Apply a transport outcome. Outcomes for connections that were
    /// already closed are ignored.
    pub fn apply_outcome(&mut self, outcome: ConnectionOutcome) {
        match outcome {
            ConnectionOutcome::Established(id) => {
                if let Some(handle) = self.registry.mark_live(id) {
                    debug!(camera = %handle.camera, connection = %id, "stream live");
                } else {
                    debug!(connection = %id, "outcome for closed connection ignored");
                }
            }
            ConnectionOutcome::Failed { id, reason } => self.fail_connection(id, &reason),
        }
    }

    /// Run a fired scheduled task. Tasks cancelled in the meantime are
    /// discarded.
    pub fn apply_scheduled(&mut self, task: TaskId) {
        let Some(kind) = self.scheduler.claim(task) else {
            debug!(%task, "stale scheduled task discarded");
            return;
        };
        match kind {
            TaskKind::ModalConnect { camera, stream_key } => {
                self.connect_modal(task, camera, stream_key);
            }
            TaskKind::ResumeGrid => self.resume_grid(),
        }
    }

    /// Wait for the next scheduled task and run it. Returns `None` when
    /// the receiver was handed out through [`take_fired`](Self::take_fired).
    pub async fn run_next_scheduled(&mut self) -> Option<TaskId> {
        let task = self.fired_rx.as_mut()?.recv().await?;
        self.apply_scheduled(task);
        Some(task)
    }

    /// Unmount everything: cancel pending tasks and disconnect every
    /// handle.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel_all();
        if let Some(modal) = self.modal.take() {
            if let Some(id) = modal.connection {
                self.disconnect(id);
            }
        }
        let cameras: Vec<CameraId> = self.cells.keys().copied().collect();
        for camera in cameras {
            self.unmount_cell(camera);
        }
        for id in self.registry.ids() {
            self.disconnect(id);
        }
        let phases: Vec<CameraId> = self.phases.keys().copied().collect();
        for camera in phases {
            self.set_phase(camera, CameraPhase::Idle);
        }
        self.set_grid_paused(false);
        self.mounted = false;
        info!("stream surfaces shut down");
    }

    // ── Views ────────────────────────────────────────────────────

    pub fn grid_view(&self) -> Vec<CellView> {
        self.cells
            .iter()
            .filter_map(|(camera, cell)| {
                let feed = self.cameras.get(*camera)?;
                Some(CellView {
                    camera: *camera,
                    name: feed.name.clone(),
                    status: feed.status,
                    selected: *camera == self.selected,
                    detected: feed.status.is_detected(),
                    phase: self.phase(*camera),
                    display: self.cell_display(cell),
                })
            })
            .collect()
    }

    pub fn modal_view(&self) -> Option<ModalView> {
        let modal = self.modal.as_ref()?;
        let feed = self.cameras.get(modal.camera)?;
        let display = if modal.failed {
            SurfaceDisplay::Placeholder(self.config.endpoint.modal_placeholder.clone())
        } else if let Some(handle) = modal.connection.and_then(|id| self.registry.get(id)) {
            handle_display(handle)
        } else {
            SurfaceDisplay::Settling
        };
        Some(ModalView {
            camera: modal.camera,
            name: feed.name.clone(),
            status: feed.status,
            address: feed.ip.to_string(),
            phase: self.phase(modal.camera),
            display,
            actions_enabled: feed.status.is_detected(),
        })
    }

    fn cell_display(&self, cell: &GridCell) -> SurfaceDisplay {
        if cell.suppressed {
            return SurfaceDisplay::Hidden;
        }
        if cell.failed {
            return SurfaceDisplay::Placeholder(self.config.endpoint.grid_placeholder.clone());
        }
        match cell.connection.and_then(|id| self.registry.get(id)) {
            Some(handle) => handle_display(handle),
            None => SurfaceDisplay::Paused,
        }
    }

    // ── Grid internals ───────────────────────────────────────────

    /// Bring the mounted cells in line with selection and layout.
    fn reconcile_grid(&mut self) {
        let planned = if self.mounted {
            self.cameras.plan_grid(self.selected, self.layout)
        } else {
            Vec::new()
        };

        let leaving: Vec<CameraId> = self
            .cells
            .keys()
            .filter(|camera| !planned.contains(camera))
            .copied()
            .collect();
        for camera in leaving {
            self.unmount_cell(camera);
        }

        for camera in &planned {
            if !self.cells.contains_key(camera) {
                self.mount_cell(*camera);
            }
        }

        // Display order follows the plan; existing cells keep their state.
        let mut ordered = IndexMap::with_capacity(planned.len());
        for camera in planned {
            if let Some(cell) = self.cells.shift_remove(&camera) {
                ordered.insert(camera, cell);
            }
        }
        self.cells = ordered;
    }

    fn mount_cell(&mut self, camera: CameraId) {
        let mut cell = GridCell::new();
        let modal_subject = self.modal_camera() == Some(camera);

        if modal_subject {
            // The modal holds (or is about to open) this camera's connection.
            cell.suppressed = true;
        } else if self.grid_paused {
            cell.paused = true;
        }
        let connect = !modal_subject && !self.grid_paused;
        self.cells.insert(camera, cell);

        if !modal_subject {
            self.set_phase(camera, CameraPhase::GridActive);
        }
        if connect {
            self.connect_grid(camera);
        }
    }

    fn unmount_cell(&mut self, camera: CameraId) {
        let Some(cell) = self.cells.shift_remove(&camera) else {
            return;
        };
        if let Some(id) = cell.connection {
            self.disconnect(id);
        }
        if self.modal_camera() != Some(camera) {
            self.set_phase(camera, CameraPhase::Idle);
        }
    }

    fn connect_grid(&mut self, camera: CameraId) {
        let url = match self
            .cameras
            .require(camera)
            .and_then(|feed| stream_url(&self.config.endpoint, feed))
        {
            Ok(url) => url,
            Err(e) => {
                warn!(%camera, error = %e, "cannot build grid stream URL");
                if let Some(cell) = self.cells.get_mut(&camera) {
                    cell.failed = true;
                }
                return;
            }
        };
        let id = self.connect(camera, url, Surface::Grid(camera));
        if let Some(cell) = self.cells.get_mut(&camera) {
            match id {
                Some(id) => cell.connection = Some(id),
                None => cell.failed = true,
            }
        }
    }

    fn pause_grid_except(&mut self, subject: CameraId) {
        let to_pause: Vec<(CameraId, Option<ConnectionId>)> = self
            .cells
            .iter_mut()
            .filter(|(camera, cell)| **camera != subject && !cell.paused && !cell.failed)
            .map(|(camera, cell)| {
                cell.paused = true;
                (*camera, cell.connection.take())
            })
            .collect();
        for (camera, connection) in to_pause {
            if let Some(id) = connection {
                debug!(%camera, connection = %id, "pausing grid stream");
                self.disconnect(id);
            }
        }
        self.set_grid_paused(true);
    }

    fn resume_grid(&mut self) {
        if self.modal.is_some() {
            return;
        }
        self.set_grid_paused(false);
        let paused: Vec<CameraId> = self
            .cells
            .iter_mut()
            .filter(|(_, cell)| cell.paused)
            .map(|(camera, cell)| {
                cell.paused = false;
                *camera
            })
            .collect();
        debug!(count = paused.len(), "resuming grid streams");
        for camera in paused {
            self.connect_grid(camera);
        }
    }

    fn set_grid_paused(&mut self, paused: bool) {
        if self.grid_paused != paused {
            self.grid_paused = paused;
            let _ = self.events.send(SurfaceEvent::GridPaused { paused });
        }
    }

    // ── Modal internals ──────────────────────────────────────────

    fn close_modal_inner(&mut self, switching: bool) {
        let Some(modal) = self.modal.take() else {
            return;
        };
        let camera = modal.camera;
        self.scheduler.cancel_owner(TaskOwner::Modal(camera));

        let grid_paused = self.grid_paused;
        let cell_present = self.cells.contains_key(&camera);

        match (modal.source, modal.connection, cell_present) {
            (ModalSource::Adopted, Some(id), true) => {
                // Hand the very same connection back to the grid cell.
                match self.registry.transfer(id, Surface::Grid(camera)) {
                    Ok(()) => {
                        if let Some(cell) = self.cells.get_mut(&camera) {
                            cell.connection = Some(id);
                        }
                        let _ = self.events.send(SurfaceEvent::ConnectionAdopted {
                            camera,
                            id,
                            surface: Surface::Grid(camera),
                        });
                    }
                    Err(e) => {
                        warn!(%camera, error = %e, "could not return connection to grid");
                        self.disconnect(id);
                    }
                }
            }
            (source, connection, _) => {
                if let Some(id) = connection {
                    self.disconnect(id);
                }
                if let Some(cell) = self.cells.get_mut(&camera) {
                    // An adopted connection that failed was the grid's own.
                    if source == ModalSource::Adopted && modal.failed {
                        cell.failed = true;
                    }
                    let needs_stream = cell.connection.is_none() && !cell.failed;
                    if needs_stream && grid_paused {
                        cell.paused = true;
                    } else if needs_stream {
                        self.connect_grid(camera);
                    }
                }
            }
        }

        if let Some(cell) = self.cells.get_mut(&camera) {
            cell.suppressed = false;
            let _ = self.events.send(SurfaceEvent::Suppressed {
                camera,
                suppressed: false,
            });
            self.set_phase(camera, CameraPhase::GridActive);
        } else {
            self.set_phase(camera, CameraPhase::Idle);
        }
        info!(%camera, switching, "modal closed");

        if grid_paused && !switching {
            self.scheduler.schedule(
                TaskOwner::GridResume,
                TaskKind::ResumeGrid,
                self.config.resume_delay,
            );
        }
    }

    fn connect_modal(&mut self, task: TaskId, camera: CameraId, stream_key: u64) {
        let expected = self
            .modal
            .as_ref()
            .is_some_and(|m| m.camera == camera && m.source == ModalSource::Pending(task));
        if !expected {
            debug!(%camera, %task, "modal changed before settle, dropping connect");
            return;
        }

        let url = self.cameras.require(camera).and_then(|feed| {
            fresh_stream_url(
                &self.config.endpoint,
                feed,
                stream_key,
                Utc::now().timestamp_millis(),
            )
        });
        let id = match url {
            Ok(url) => self.connect(camera, url, Surface::Modal(camera)),
            Err(e) => {
                warn!(%camera, error = %e, "cannot build modal stream URL");
                None
            }
        };

        if let Some(modal) = self.modal.as_mut() {
            modal.source = ModalSource::Independent;
            modal.connection = id;
            modal.failed = id.is_none();
        }
        self.set_phase(camera, CameraPhase::ModalActive);
    }

    // ── Connection internals ─────────────────────────────────────

    /// Register and start a connection. `None` means it failed to
    /// establish; the caller shows its placeholder.
    fn connect(&mut self, camera: CameraId, url: Url, holder: Surface) -> Option<ConnectionId> {
        let handle = match self.registry.open(camera, url, holder) {
            Ok(handle) => handle.clone(),
            Err(e) => {
                warn!(%camera, %holder, error = %e, "connection refused by registry");
                return None;
            }
        };

        if let Err(e) = self.transport.connect(&handle) {
            warn!(%camera, %holder, error = %e, "stream connection failed");
            self.registry.close(handle.id);
            let _ = self.events.send(SurfaceEvent::ConnectionFailed {
                camera,
                id: handle.id,
                reason: e.to_string(),
            });
            return None;
        }

        debug!(%camera, %holder, connection = %handle.id, url = %handle.url, "stream requested");
        let _ = self.events.send(SurfaceEvent::ConnectionOpened {
            camera,
            id: handle.id,
            surface: holder,
            url: handle.url,
        });
        Some(handle.id)
    }

    fn disconnect(&mut self, id: ConnectionId) {
        if let Some(handle) = self.registry.close(id) {
            self.transport.disconnect(&handle);
            debug!(camera = %handle.camera, connection = %id, "stream closed");
            let _ = self.events.send(SurfaceEvent::ConnectionClosed {
                camera: handle.camera,
                id,
            });
        }
    }

    fn fail_connection(&mut self, id: ConnectionId, reason: &str) {
        let Some(handle) = self.registry.get(id).cloned() else {
            debug!(connection = %id, "failure for closed connection ignored");
            return;
        };
        warn!(camera = %handle.camera, connection = %id, reason, "stream failed, showing placeholder");

        match handle.holder {
            Surface::Grid(camera) => {
                if let Some(cell) = self.cells.get_mut(&camera) {
                    cell.connection = None;
                    cell.failed = true;
                }
            }
            Surface::Modal(camera) => {
                if let Some(modal) = self.modal.as_mut().filter(|m| m.camera == camera) {
                    modal.connection = None;
                    modal.failed = true;
                }
            }
        }

        if let Some(handle) = self.registry.close(id) {
            self.transport.disconnect(&handle);
        }
        let _ = self.events.send(SurfaceEvent::ConnectionFailed {
            camera: handle.camera,
            id,
            reason: reason.to_owned(),
        });
    }

    fn set_phase(&mut self, camera: CameraId, to: CameraPhase) {
        let from = self.phases.insert(camera, to).unwrap_or_default();
        if from != to {
            debug!(%camera, ?from, ?to, "phase transition");
            let _ = self.events.send(SurfaceEvent::Transition { camera, from, to });
        }
    }
}

fn handle_display(handle: &StreamHandle) -> SurfaceDisplay {
    match handle.status {
        HandleStatus::Connecting => SurfaceDisplay::Connecting(handle.url.clone()),
        HandleStatus::Live => SurfaceDisplay::Live(handle.url.clone()),
    }
}
