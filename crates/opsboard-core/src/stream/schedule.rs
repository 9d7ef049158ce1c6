// ── Cancellable scheduled tasks ──
//
// Each task is a tokio timer with its own CancellationToken. Firing only
// delivers the task id; the pending table here decides whether the task
// is still wanted, so a delivery that raced a cancellation is dropped.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::model::CameraId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Surface a task belongs to; superseding transitions cancel by owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TaskOwner {
    Modal(CameraId),
    GridResume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskKind {
    /// Open the modal's own connection after the settle delay.
    ModalConnect { camera: CameraId, stream_key: u64 },
    /// Reconnect paused grid cells after the modal closed.
    ResumeGrid,
}

struct PendingTask {
    owner: TaskOwner,
    kind: TaskKind,
    token: CancellationToken,
}

pub(crate) struct Scheduler {
    next_id: u64,
    pending: HashMap<TaskId, PendingTask>,
    fired_tx: mpsc::UnboundedSender<TaskId>,
}

impl Scheduler {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<TaskId>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                next_id: 0,
                pending: HashMap::new(),
                fired_tx,
            },
            fired_rx,
        )
    }

    /// Arm a task. Must be called inside a tokio runtime.
    pub(crate) fn schedule(&mut self, owner: TaskOwner, kind: TaskKind, delay: Duration) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        let token = CancellationToken::new();
        let cancel = token.clone();
        let tx = self.fired_tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = tx.send(id);
                }
            }
        });

        debug!(task = %id, ?owner, ?kind, delay_ms = delay.as_millis(), "scheduled");
        self.pending.insert(id, PendingTask { owner, kind, token });
        id
    }

    pub(crate) fn cancel(&mut self, id: TaskId) -> bool {
        match self.pending.remove(&id) {
            Some(task) => {
                task.token.cancel();
                debug!(task = %id, "cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every task of one owner. Returns how many were pending.
    pub(crate) fn cancel_owner(&mut self, owner: TaskOwner) -> usize {
        let ids: Vec<TaskId> = self
            .pending
            .iter()
            .filter(|(_, task)| task.owner == owner)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.cancel(*id);
        }
        ids.len()
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, task) in self.pending.drain() {
            task.token.cancel();
        }
    }

    /// Take a fired task out of the pending table. `None` means it was
    /// cancelled after the timer already delivered.
    pub(crate) fn claim(&mut self, id: TaskId) -> Option<TaskKind> {
        self.pending.remove(&id).map(|task| task.kind)
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
