//! Replay a UI command script through the stream service.
//!
//! Steps run in real time: `{"wait_ms": N}` sleeps, anything else is a
//! [`UiCommand`]. By default connections go to a [`RecordingTransport`] so
//! the replay reports every connect/disconnect it would have issued.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use opsboard_config::Config;
use opsboard_core::stream::TransportOp;
use opsboard_core::{
    CameraId, CameraPhase, ConnectionOutcome, HttpTransport, RecordingTransport,
    StreamCoordinator, StreamTransport, SurfaceEvent, UiCommand, run_stream_service,
};

use crate::cli::{GlobalOpts, ReplayArgs};
use crate::error::CliError;
use crate::output;

const COMMAND_BUFFER: usize = 32;

// ── Script format ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ReplayScript {
    steps: Vec<ReplayStep>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayStep {
    Wait { wait_ms: u64 },
    Command(UiCommand),
}

// ── Report ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ReplayReport {
    live: bool,
    events: Vec<SurfaceEvent>,
    /// Recording mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    transport: Option<Vec<TransportOp>>,
    /// Highest number of simultaneously open connections per camera.
    #[serde(skip_serializing_if = "Option::is_none")]
    peak_open: Option<BTreeMap<CameraId, usize>>,
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "#")]
    seq: usize,
    #[tabled(rename = "Event")]
    kind: &'static str,
    #[tabled(rename = "Camera")]
    camera: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

fn phase_label(phase: CameraPhase) -> &'static str {
    match phase {
        CameraPhase::Idle => "IDLE",
        CameraPhase::GridActive => "GRID_ACTIVE",
        CameraPhase::Handoff => "HANDOFF",
        CameraPhase::ModalActive => "MODAL_ACTIVE",
    }
}

fn event_row(seq: usize, event: &SurfaceEvent) -> EventRow {
    let (kind, camera, detail) = match event {
        SurfaceEvent::Transition { camera, from, to } => (
            "transition",
            camera.to_string(),
            format!("{} -> {}", phase_label(*from), phase_label(*to)),
        ),
        SurfaceEvent::Suppressed { camera, suppressed } => (
            if *suppressed { "suppressed" } else { "unsuppressed" },
            camera.to_string(),
            String::new(),
        ),
        SurfaceEvent::ConnectionOpened {
            camera,
            id,
            surface,
            url,
        } => ("opened", camera.to_string(), format!("{id} {surface} {url}")),
        SurfaceEvent::ConnectionAdopted {
            camera,
            id,
            surface,
        } => ("adopted", camera.to_string(), format!("{id} -> {surface}")),
        SurfaceEvent::ConnectionClosed { camera, id } => {
            ("closed", camera.to_string(), id.to_string())
        }
        SurfaceEvent::ConnectionFailed { camera, id, reason } => {
            ("failed", camera.to_string(), format!("{id}: {reason}"))
        }
        SurfaceEvent::StatusChanged { camera, status } => {
            ("status", camera.to_string(), status.to_string())
        }
        SurfaceEvent::GridPaused { paused } => (
            "grid",
            "-".into(),
            if *paused { "paused" } else { "resumed" }.into(),
        ),
    };
    EventRow {
        seq,
        kind,
        camera,
        detail,
    }
}

/// Replays the transport log, tracking how many connections each camera
/// had open at once.
fn peak_open(log: &[TransportOp]) -> BTreeMap<CameraId, usize> {
    let mut open: BTreeMap<CameraId, usize> = BTreeMap::new();
    let mut peak: BTreeMap<CameraId, usize> = BTreeMap::new();
    for op in log {
        match op {
            TransportOp::Connect { camera, .. } => {
                let count = open.entry(*camera).or_default();
                *count += 1;
                let max = peak.entry(*camera).or_default();
                *max = (*max).max(*count);
            }
            TransportOp::Disconnect { camera, .. } => {
                let count = open.entry(*camera).or_default();
                *count = count.saturating_sub(1);
            }
            TransportOp::Refused { .. } => {}
        }
    }
    peak
}

// ── Driver ──────────────────────────────────────────────────────────

fn drain(events: &mut broadcast::Receiver<SurfaceEvent>, into: &mut Vec<SurfaceEvent>) {
    use broadcast::error::TryRecvError;
    loop {
        match events.try_recv() {
            Ok(event) => into.push(event),
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "event log lagged"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

/// Run the service and the script side by side on the current task.
/// The service stops once the last step has been sent.
async fn run_script<T: StreamTransport>(
    coordinator: StreamCoordinator<T>,
    steps: Vec<ReplayStep>,
    outcomes: mpsc::UnboundedReceiver<ConnectionOutcome>,
) -> (StreamCoordinator<T>, Vec<SurfaceEvent>) {
    let mut events = coordinator.subscribe();
    let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let cancel = CancellationToken::new();

    let driver = async move {
        let mut log = Vec::new();
        for step in steps {
            match step {
                ReplayStep::Wait { wait_ms } => {
                    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                }
                ReplayStep::Command(command) => {
                    debug!(?command, "replaying");
                    if commands.send(command).await.is_err() {
                        break;
                    }
                }
            }
            drain(&mut events, &mut log);
        }
        drop(commands);
        (events, log)
    };

    let (coordinator, (mut events, mut log)) = tokio::join!(
        run_stream_service(coordinator, command_rx, outcomes, cancel),
        driver
    );
    drain(&mut events, &mut log);
    (coordinator, log)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: &ReplayArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let script: ReplayScript = super::read_json(&args.script)?;
    debug!(steps = script.steps.len(), live = args.live, "replay script loaded");

    let report = if args.live {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let transport = HttpTransport::new(super::http_client()?, outcome_tx);
        let coordinator = super::build_coordinator(config, global, transport, None, None)?;
        let (_, events) = run_script(coordinator, script.steps, outcome_rx).await;
        ReplayReport {
            live: true,
            events,
            transport: None,
            peak_open: None,
        }
    } else {
        // Nothing reports outcomes in recording mode; scripts use
        // `stream_live` / `stream_failed` steps instead.
        let (_outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let coordinator =
            super::build_coordinator(config, global, RecordingTransport::new(), None, None)?;
        let (coordinator, events) = run_script(coordinator, script.steps, outcome_rx).await;
        let log = coordinator.transport().log().to_vec();
        ReplayReport {
            live: false,
            events,
            peak_open: Some(peak_open(&log)),
            transport: Some(log),
        }
    };

    let out = output::render_single(&global.output, &report, |r| {
        let rows: Vec<EventRow> = r
            .events
            .iter()
            .enumerate()
            .map(|(i, e)| event_row(i + 1, e))
            .collect();
        let mut text = output::render_table(&rows);
        if let (Some(log), Some(peak)) = (&r.transport, &r.peak_open) {
            let connects = log
                .iter()
                .filter(|op| {
                    matches!(op, TransportOp::Connect { .. } | TransportOp::Refused { .. })
                })
                .count();
            let worst = peak.values().copied().max().unwrap_or(0);
            let _ = write!(
                text,
                "\n{connects} connect requests, at most {worst} open per camera"
            );
        }
        Ok(text)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use opsboard_core::stream::ConnectionId;
    use url::Url;

    #[test]
    fn script_mixes_waits_and_commands() {
        let script: ReplayScript = serde_json::from_str(
            r#"{"steps": [
                {"op": "mount"},
                {"wait_ms": 250},
                {"op": "open_modal", "camera": 3}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(script.steps[0], ReplayStep::Command(UiCommand::Mount)));
        assert!(matches!(script.steps[1], ReplayStep::Wait { wait_ms: 250 }));
        assert!(matches!(
            script.steps[2],
            ReplayStep::Command(UiCommand::OpenModal { camera: CameraId(3) })
        ));
    }

    #[test]
    fn peak_counts_overlapping_connections() {
        let url = Url::parse("http://172.31.0.101:81/stream").unwrap();
        let connect = |id, camera| TransportOp::Connect {
            id: ConnectionId(id),
            camera: CameraId(camera),
            url: url.clone(),
        };
        let disconnect = |id, camera| TransportOp::Disconnect {
            id: ConnectionId(id),
            camera: CameraId(camera),
        };
        let log = vec![
            connect(1, 1),
            connect(2, 2),
            disconnect(1, 1),
            connect(3, 1),
            connect(4, 2),
        ];
        let peak = peak_open(&log);
        assert_eq!(peak[&CameraId(1)], 1);
        assert_eq!(peak[&CameraId(2)], 2);
    }

    #[tokio::test]
    async fn refused_connects_do_not_count_as_open() {
        let cameras = Config::default().camera_list().unwrap();
        let transport = RecordingTransport::new().with_unreachable(CameraId(3));
        let coordinator = StreamCoordinator::new(
            opsboard_core::CoordinatorConfig::standard().unwrap(),
            cameras,
            transport,
        )
        .unwrap();
        let steps = vec![
            ReplayStep::Command(UiCommand::Mount),
            ReplayStep::Command(UiCommand::Unmount),
            ReplayStep::Command(UiCommand::Mount),
        ];
        let (_outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let (coordinator, _) = run_script(coordinator, steps, outcome_rx).await;

        let log = coordinator.transport().log();
        assert!(
            log.iter()
                .any(|op| matches!(op, TransportOp::Refused { camera: CameraId(3), .. }))
        );
        let peak = peak_open(log);
        assert_eq!(coordinator.transport().connect_count(CameraId(3)), 2);
        assert_eq!(peak.get(&CameraId(3)), None);
        assert_eq!(peak[&CameraId(1)], 1);
        assert!(peak.values().all(|n| *n == 1));
    }
}
