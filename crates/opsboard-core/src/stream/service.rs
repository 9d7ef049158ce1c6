// ── Stream service loop ──
//
// Single cooperative loop multiplexing UI commands, transport outcomes,
// and fired settle/resume tasks. All coordinator mutation happens here,
// one event at a time.

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::coordinator::StreamCoordinator;
use super::transport::StreamTransport;
use super::ConnectionOutcome;
use crate::error::CoreError;
use crate::model::{CameraId, CameraLayout, CameraStatus};

/// A request from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UiCommand {
    Mount,
    Unmount,
    Select { camera: CameraId },
    SetLayout { layout: CameraLayout },
    OpenModal { camera: CameraId },
    CloseModal,
    UpdateStatus { camera: CameraId, status: CameraStatus },
    /// Transport report keyed by camera, for drivers that do not track
    /// connection ids.
    StreamLive { camera: CameraId },
    StreamFailed { camera: CameraId, reason: String },
}

impl<T: StreamTransport> StreamCoordinator<T> {
    /// Must be called inside a tokio runtime; modal commands arm timers.
    pub fn apply_command(&mut self, command: UiCommand) -> Result<(), CoreError> {
        match command {
            UiCommand::Mount => self.mount(),
            UiCommand::Unmount => self.shutdown(),
            UiCommand::Select { camera } => self.select_camera(camera)?,
            UiCommand::SetLayout { layout } => self.set_layout(layout),
            UiCommand::OpenModal { camera } => self.open_modal(camera)?,
            UiCommand::CloseModal => self.close_modal(),
            UiCommand::UpdateStatus { camera, status } => self.update_status(camera, status)?,
            UiCommand::StreamLive { camera } => {
                if let Some(id) = self.connection_for(camera).map(|h| h.id) {
                    self.apply_outcome(ConnectionOutcome::Established(id));
                }
            }
            UiCommand::StreamFailed { camera, reason } => {
                if let Some(id) = self.connection_for(camera).map(|h| h.id) {
                    self.apply_outcome(ConnectionOutcome::Failed { id, reason });
                }
            }
        }
        Ok(())
    }
}

/// Drive a coordinator until the command channel closes or `cancel` fires.
///
/// Rejected commands are logged and do not stop the loop. The coordinator
/// is shut down and handed back on exit.
pub async fn run_stream_service<T: StreamTransport>(
    mut coordinator: StreamCoordinator<T>,
    mut commands: mpsc::Receiver<UiCommand>,
    mut outcomes: mpsc::UnboundedReceiver<ConnectionOutcome>,
    cancel: CancellationToken,
) -> StreamCoordinator<T> {
    let Some(mut fired) = coordinator.take_fired() else {
        warn!("scheduled-task receiver already taken, service not started");
        return coordinator;
    };

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Some(task) = fired.recv() => coordinator.apply_scheduled(task),

            Some(outcome) = outcomes.recv() => coordinator.apply_outcome(outcome),

            command = commands.recv() => {
                let Some(command) = command else { break };
                debug!(?command, "ui command");
                if let Err(e) = coordinator.apply_command(command) {
                    warn!(error = %e, "ui command rejected");
                }
            }
        }
    }

    coordinator.shutdown();
    debug!("stream service stopped");
    coordinator
}
