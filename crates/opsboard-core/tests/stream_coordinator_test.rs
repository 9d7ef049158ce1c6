#![allow(clippy::unwrap_used)]
// Scenario tests for `StreamCoordinator` over the recording transport.
// Timers run on tokio's paused clock.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use pretty_assertions::assert_eq;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use opsboard_core::stream::{SurfaceDisplay, TransportOp};
use opsboard_core::{
    CameraFeed, CameraId, CameraLayout, CameraList, CameraPhase, CameraStatus, ConnectionOutcome,
    CoordinatorConfig, CoreError, RecordingTransport, StreamCoordinator, Surface, SurfaceEvent,
    UiCommand, run_stream_service,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn cam(id: u32) -> CameraId {
    CameraId(id)
}

fn cameras() -> CameraList {
    CameraList::new((1..=6u8).map(|i| CameraFeed {
        id: CameraId(u32::from(i)),
        name: format!("Camera {i}"),
        status: if i == 2 || i == 5 {
            CameraStatus::Detected
        } else {
            CameraStatus::Monitoring
        },
        ip: IpAddr::V4(Ipv4Addr::new(172, 31, 0, 100 + i)),
    }))
    .unwrap()
}

fn coordinator_with(transport: RecordingTransport) -> StreamCoordinator<RecordingTransport> {
    StreamCoordinator::new(CoordinatorConfig::standard().unwrap(), cameras(), transport).unwrap()
}

/// 3x3 wall with camera 2 selected: cells [2, 1, 3, 4, 5, 6].
fn nine_grid() -> StreamCoordinator<RecordingTransport> {
    let mut coordinator = coordinator_with(RecordingTransport::new());
    coordinator.select_camera(cam(2)).unwrap();
    coordinator.set_layout(CameraLayout::Nine);
    coordinator.mount();
    coordinator
}

/// 1x1 wall showing camera 1 only.
fn single_grid() -> StreamCoordinator<RecordingTransport> {
    let mut coordinator = coordinator_with(RecordingTransport::new());
    coordinator.set_layout(CameraLayout::Single);
    coordinator.mount();
    coordinator
}

fn drain(rx: &mut broadcast::Receiver<SurfaceEvent>) -> Vec<SurfaceEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn assert_one_connection_per_camera(coordinator: &StreamCoordinator<RecordingTransport>) {
    for feed in coordinator.cameras().iter() {
        assert!(
            coordinator.transport().open_count(feed.id) <= 1,
            "camera {} has more than one open connection",
            feed.id
        );
    }
    assert_eq!(
        coordinator.connection_count(),
        coordinator.transport().total_open()
    );
}

fn display_of(coordinator: &StreamCoordinator<RecordingTransport>, camera: CameraId) -> SurfaceDisplay {
    coordinator
        .grid_view()
        .into_iter()
        .find(|c| c.camera == camera)
        .unwrap()
        .display
}

// ── Grid ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn nine_grid_puts_selected_first_and_connects_each_once() {
    let coordinator = nine_grid();

    assert_eq!(
        coordinator.grid_cameras(),
        vec![cam(2), cam(1), cam(3), cam(4), cam(5), cam(6)]
    );
    for id in 1..=6 {
        assert_eq!(coordinator.transport().connect_count(cam(id)), 1);
        assert_eq!(coordinator.phase(cam(id)), CameraPhase::GridActive);
    }
    assert_one_connection_per_camera(&coordinator);

    let view = coordinator.grid_view();
    assert!(view[0].selected);
    assert!(view[0].detected);
    assert!(!view[1].detected);
}

#[tokio::test(start_paused = true)]
async fn layout_change_keeps_connections_of_cameras_that_stay() {
    let mut coordinator = coordinator_with(RecordingTransport::new());
    coordinator.mount();
    let before: Vec<_> = (1..=4)
        .map(|i| coordinator.connection_for(cam(i)).unwrap().id)
        .collect();

    coordinator.set_layout(CameraLayout::Nine);
    let after: Vec<_> = (1..=4)
        .map(|i| coordinator.connection_for(cam(i)).unwrap().id)
        .collect();
    assert_eq!(before, after);
    assert_eq!(coordinator.transport().connect_count(cam(1)), 1);
    assert_eq!(coordinator.transport().connect_count(cam(5)), 1);

    coordinator.set_layout(CameraLayout::Single);
    assert_eq!(coordinator.grid_cameras(), vec![cam(1)]);
    assert_eq!(coordinator.connection_for(cam(1)).unwrap().id, before[0]);
    assert!(coordinator.connection_for(cam(2)).is_none());
    assert_eq!(coordinator.phase(cam(2)), CameraPhase::Idle);
    assert_one_connection_per_camera(&coordinator);
}

#[tokio::test(start_paused = true)]
async fn unknown_cameras_are_rejected() {
    let mut coordinator = nine_grid();
    assert!(matches!(
        coordinator.select_camera(cam(42)),
        Err(CoreError::CameraNotFound { .. })
    ));
    assert!(coordinator.open_modal(cam(42)).is_err());
    assert!(coordinator.modal_camera().is_none());
}

#[tokio::test(start_paused = true)]
async fn status_update_does_not_touch_connections() {
    let mut coordinator = nine_grid();
    let mut events = coordinator.subscribe();
    let id = coordinator.connection_for(cam(1)).unwrap().id;

    coordinator
        .update_status(cam(1), CameraStatus::Detected)
        .unwrap();

    assert_eq!(coordinator.connection_for(cam(1)).unwrap().id, id);
    assert_eq!(coordinator.transport().connect_count(cam(1)), 1);
    let cell = coordinator
        .grid_view()
        .into_iter()
        .find(|c| c.camera == cam(1))
        .unwrap();
    assert!(cell.detected);
    assert_eq!(
        drain(&mut events),
        vec![SurfaceEvent::StatusChanged {
            camera: cam(1),
            status: CameraStatus::Detected
        }]
    );
}

// ── Modal handoff ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn modal_adopts_live_grid_connection_without_reconnecting() {
    let mut coordinator = nine_grid();
    let grid_id = coordinator.connection_for(cam(2)).unwrap().id;

    coordinator.open_modal(cam(2)).unwrap();

    let handle = coordinator.connection_for(cam(2)).unwrap();
    assert_eq!(handle.id, grid_id);
    assert_eq!(handle.holder, Surface::Modal(cam(2)));
    assert_eq!(coordinator.transport().connect_count(cam(2)), 1);
    assert_eq!(coordinator.phase(cam(2)), CameraPhase::ModalActive);
    assert!(coordinator.is_suppressed(cam(2)));
    assert!(!coordinator.is_suppressed(cam(1)));
    assert_eq!(display_of(&coordinator, cam(2)), SurfaceDisplay::Hidden);

    // Other grid streams pause while the modal is open.
    assert!(coordinator.is_grid_paused());
    assert_eq!(coordinator.transport().total_open(), 1);
    assert_eq!(display_of(&coordinator, cam(3)), SurfaceDisplay::Paused);

    let modal = coordinator.modal_view().unwrap();
    assert!(matches!(modal.display, SurfaceDisplay::Connecting(_)));
    assert!(modal.actions_enabled);
    assert_eq!(modal.address, "172.31.0.102");

    coordinator.apply_outcome(ConnectionOutcome::Established(grid_id));
    let modal = coordinator.modal_view().unwrap();
    assert!(matches!(modal.display, SurfaceDisplay::Live(_)));
    assert_one_connection_per_camera(&coordinator);
}

#[tokio::test(start_paused = true)]
async fn closing_returns_connection_and_resumes_grid_after_delay() {
    let mut coordinator = nine_grid();
    let grid_id = coordinator.connection_for(cam(2)).unwrap().id;
    coordinator.open_modal(cam(2)).unwrap();

    coordinator.close_modal();

    let handle = coordinator.connection_for(cam(2)).unwrap();
    assert_eq!(handle.id, grid_id);
    assert_eq!(handle.holder, Surface::Grid(cam(2)));
    assert!(!coordinator.is_suppressed(cam(2)));
    assert_eq!(coordinator.phase(cam(2)), CameraPhase::GridActive);
    assert!(matches!(
        display_of(&coordinator, cam(2)),
        SurfaceDisplay::Connecting(_)
    ));
    assert!(coordinator.modal_view().is_none());

    // Paused cells wait for the resume delay.
    assert_eq!(coordinator.transport().total_open(), 1);
    let started = tokio::time::Instant::now();
    coordinator.run_next_scheduled().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));

    assert!(!coordinator.is_grid_paused());
    assert_eq!(coordinator.transport().total_open(), 6);
    assert_eq!(coordinator.transport().connect_count(cam(2)), 1);
    assert_eq!(coordinator.transport().connect_count(cam(3)), 2);
    assert_one_connection_per_camera(&coordinator);
}

#[tokio::test(start_paused = true)]
async fn unmounted_camera_opens_fresh_connection_after_settle() {
    let mut coordinator = single_grid();
    coordinator.open_modal(cam(4)).unwrap();

    assert_eq!(coordinator.phase(cam(4)), CameraPhase::Handoff);
    assert_eq!(
        coordinator.modal_view().unwrap().display,
        SurfaceDisplay::Settling
    );
    assert_eq!(coordinator.transport().connect_count(cam(4)), 0);

    let started = tokio::time::Instant::now();
    coordinator.run_next_scheduled().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));

    assert_eq!(coordinator.phase(cam(4)), CameraPhase::ModalActive);
    let handle = coordinator.connection_for(cam(4)).unwrap();
    assert_eq!(handle.holder, Surface::Modal(cam(4)));
    assert_eq!(handle.url.host_str(), Some("172.31.0.104"));
    assert_eq!(handle.url.port(), Some(81));
    assert_eq!(handle.url.path(), "/stream");
    let query: Vec<_> = handle.url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    assert_eq!(query, vec!["key".to_owned(), "t".to_owned()]);

    // No grid cell for camera 4: closing leaves it idle.
    coordinator.close_modal();
    assert_eq!(coordinator.phase(cam(4)), CameraPhase::Idle);
    assert!(coordinator.connection_for(cam(4)).is_none());
    assert_eq!(coordinator.pending_tasks(), 1);
    coordinator.run_next_scheduled().await.unwrap();
    assert_eq!(coordinator.transport().open_count(cam(1)), 1);
}

#[tokio::test(start_paused = true)]
async fn grid_stays_connected_when_pausing_is_disabled() {
    let config = CoordinatorConfig {
        pause_grid_while_modal: false,
        ..CoordinatorConfig::standard().unwrap()
    };
    let mut coordinator =
        StreamCoordinator::new(config, cameras(), RecordingTransport::new()).unwrap();
    coordinator.mount();
    assert_eq!(coordinator.grid_cameras(), vec![cam(1), cam(2), cam(3), cam(4)]);

    coordinator.open_modal(cam(1)).unwrap();
    assert!(!coordinator.is_grid_paused());
    assert_eq!(coordinator.transport().total_open(), 4);
    assert!(matches!(
        display_of(&coordinator, cam(3)),
        SurfaceDisplay::Connecting(_)
    ));
    coordinator.close_modal();
    assert_eq!(coordinator.pending_tasks(), 0);

    // Camera 5 has no cell: a fresh connection after the settle delay.
    coordinator.open_modal(cam(5)).unwrap();
    coordinator.run_next_scheduled().await.unwrap();
    assert_eq!(coordinator.phase(cam(5)), CameraPhase::ModalActive);
    assert_eq!(coordinator.transport().total_open(), 5);

    coordinator.close_modal();
    assert_eq!(coordinator.pending_tasks(), 0);
    assert_eq!(coordinator.phase(cam(5)), CameraPhase::Idle);
    assert_eq!(coordinator.transport().open_count(cam(5)), 0);
    assert_eq!(coordinator.transport().connect_count(cam(5)), 1);
    assert_eq!(coordinator.transport().total_open(), 4);
    for id in 1..=4 {
        assert_eq!(coordinator.phase(cam(id)), CameraPhase::GridActive);
        assert_eq!(coordinator.transport().connect_count(cam(id)), 1);
    }
    assert_one_connection_per_camera(&coordinator);
}

#[tokio::test]
async fn modal_timers_run_on_the_ambient_runtime() {
    let mut coordinator = single_grid();
    coordinator.open_modal(cam(6)).unwrap();
    assert_eq!(coordinator.pending_tasks(), 1);

    let task = tokio::time::timeout(Duration::from_secs(5), coordinator.run_next_scheduled())
        .await
        .unwrap();
    assert!(task.is_some());
    assert_eq!(coordinator.phase(cam(6)), CameraPhase::ModalActive);
}

#[tokio::test(start_paused = true)]
async fn switching_modal_closes_previous_camera_before_next_handoff() {
    let mut coordinator = nine_grid();
    let mut events = coordinator.subscribe();

    coordinator.open_modal(cam(5)).unwrap();
    coordinator.open_modal(cam(2)).unwrap();
    let events = drain(&mut events);

    let five_back = events
        .iter()
        .position(|e| {
            *e == SurfaceEvent::Transition {
                camera: cam(5),
                from: CameraPhase::ModalActive,
                to: CameraPhase::GridActive,
            }
        })
        .unwrap();
    let two_handoff = events
        .iter()
        .position(|e| {
            matches!(e, SurfaceEvent::Transition { camera, to: CameraPhase::Handoff, .. } if *camera == cam(2))
        })
        .unwrap();
    assert!(five_back < two_handoff);

    // Never two cameras in MODAL_ACTIVE at once.
    let mut active = 0i32;
    for event in &events {
        if let SurfaceEvent::Transition { from, to, .. } = event {
            if *to == CameraPhase::ModalActive {
                active += 1;
            }
            if *from == CameraPhase::ModalActive {
                active -= 1;
            }
            assert!(active <= 1);
        }
    }

    // A switch schedules no grid resume; only the settle is pending.
    assert_eq!(coordinator.modal_camera(), Some(cam(2)));
    assert_eq!(coordinator.pending_tasks(), 1);
    assert!(coordinator.is_grid_paused());

    coordinator.run_next_scheduled().await.unwrap();
    assert_eq!(coordinator.phase(cam(2)), CameraPhase::ModalActive);
    let url = &coordinator.connection_for(cam(2)).unwrap().url;
    assert!(url.query().unwrap().starts_with("key=2&t="));
    assert_eq!(coordinator.phase(cam(5)), CameraPhase::GridActive);
    assert_one_connection_per_camera(&coordinator);
}

#[tokio::test(start_paused = true)]
async fn opening_the_same_camera_twice_is_a_no_op() {
    let mut coordinator = nine_grid();
    coordinator.open_modal(cam(2)).unwrap();
    coordinator.open_modal(cam(2)).unwrap();

    assert_eq!(coordinator.transport().connect_count(cam(2)), 1);
    assert_eq!(coordinator.phase(cam(2)), CameraPhase::ModalActive);
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn closing_during_settle_cancels_the_pending_connect() {
    let mut coordinator = single_grid();
    coordinator.open_modal(cam(3)).unwrap();
    coordinator.close_modal();

    assert_eq!(coordinator.pending_tasks(), 1);
    coordinator.run_next_scheduled().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(coordinator.transport().connect_count(cam(3)), 0);
    assert_eq!(coordinator.pending_tasks(), 0);
    assert_eq!(coordinator.phase(cam(3)), CameraPhase::Idle);
    assert_eq!(coordinator.transport().open_count(cam(1)), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_tasks_and_disconnects_everything() {
    let mut coordinator = nine_grid();
    coordinator.open_modal(cam(5)).unwrap();
    coordinator.close_modal();
    assert_eq!(coordinator.pending_tasks(), 1);

    coordinator.shutdown();

    assert_eq!(coordinator.pending_tasks(), 0);
    assert_eq!(coordinator.connection_count(), 0);
    assert_eq!(coordinator.transport().total_open(), 0);
    assert!(coordinator.grid_cameras().is_empty());
    for id in 1..=6 {
        assert_eq!(coordinator.phase(cam(id)), CameraPhase::Idle);
    }
}

// ── Failure isolation ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn unreachable_camera_shows_placeholder_without_affecting_others() {
    let mut coordinator =
        coordinator_with(RecordingTransport::new().with_unreachable(cam(3)));
    coordinator.mount();

    let placeholder = CoordinatorConfig::standard().unwrap().endpoint.grid_placeholder;
    assert_eq!(
        display_of(&coordinator, cam(3)),
        SurfaceDisplay::Placeholder(placeholder)
    );
    assert!(matches!(
        display_of(&coordinator, cam(4)),
        SurfaceDisplay::Connecting(_)
    ));
    assert!(coordinator.connection_for(cam(3)).is_none());

    // A later failure report is handled the same way.
    let id = coordinator.connection_for(cam(4)).unwrap().id;
    coordinator.apply_outcome(ConnectionOutcome::Failed {
        id,
        reason: "connection reset".into(),
    });
    assert!(matches!(
        display_of(&coordinator, cam(4)),
        SurfaceDisplay::Placeholder(_)
    ));
    assert!(matches!(
        display_of(&coordinator, cam(1)),
        SurfaceDisplay::Connecting(_)
    ));

    // No retry on selection changes of other cameras.
    coordinator.select_camera(cam(2)).unwrap();
    assert_eq!(coordinator.transport().connect_count(cam(3)), 1);
    assert_eq!(coordinator.transport().connect_count(cam(4)), 1);
    assert_one_connection_per_camera(&coordinator);
}

#[tokio::test(start_paused = true)]
async fn failed_modal_connection_shows_modal_placeholder_and_is_not_retried() {
    let mut coordinator =
        coordinator_with(RecordingTransport::new().with_unreachable(cam(3)));
    coordinator.mount();

    coordinator.open_modal(cam(3)).unwrap();
    coordinator.run_next_scheduled().await.unwrap();

    let placeholder = CoordinatorConfig::standard().unwrap().endpoint.modal_placeholder;
    let modal = coordinator.modal_view().unwrap();
    assert_eq!(modal.display, SurfaceDisplay::Placeholder(placeholder));
    assert_eq!(modal.phase, CameraPhase::ModalActive);

    coordinator.close_modal();
    assert!(!coordinator.is_suppressed(cam(3)));
    assert!(matches!(
        display_of(&coordinator, cam(3)),
        SurfaceDisplay::Placeholder(_)
    ));
    assert_eq!(coordinator.transport().connect_count(cam(3)), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_outcomes_are_ignored() {
    let mut coordinator = nine_grid();
    let id = coordinator.connection_for(cam(6)).unwrap().id;
    coordinator.set_layout(CameraLayout::Single);

    coordinator.apply_outcome(ConnectionOutcome::Failed {
        id,
        reason: "late".into(),
    });
    coordinator.apply_outcome(ConnectionOutcome::Established(id));
    assert!(coordinator.connection_for(cam(6)).is_none());
    assert_eq!(coordinator.grid_cameras(), vec![cam(2)]);
}

// ── Service loop ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn service_loop_applies_commands_and_timers_in_order() {
    let coordinator = coordinator_with(RecordingTransport::new());
    let (command_tx, command_rx) = mpsc::channel(16);
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let service = tokio::spawn(run_stream_service(
        coordinator,
        command_rx,
        outcome_rx,
        cancel.clone(),
    ));

    command_tx
        .send(UiCommand::SetLayout {
            layout: CameraLayout::Single,
        })
        .await
        .unwrap();
    command_tx.send(UiCommand::Mount).await.unwrap();
    command_tx
        .send(UiCommand::OpenModal { camera: cam(5) })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    command_tx
        .send(UiCommand::StreamLive { camera: cam(5) })
        .await
        .unwrap();
    // Rejected commands keep the loop alive.
    command_tx
        .send(UiCommand::OpenModal { camera: cam(99) })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    drop(outcome_tx);
    drop(command_tx);

    let coordinator = service.await.unwrap();
    let connects: Vec<_> = coordinator
        .transport()
        .log()
        .iter()
        .filter_map(|op| match op {
            TransportOp::Connect { camera, url, .. } => Some((*camera, url.query().is_some())),
            TransportOp::Disconnect { .. } | TransportOp::Refused { .. } => None,
        })
        .collect();
    assert_eq!(connects, vec![(cam(1), false), (cam(5), true)]);
    assert_eq!(coordinator.transport().total_open(), 0);
    assert_eq!(coordinator.phase(cam(5)), CameraPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn service_loop_stops_on_cancel() {
    let coordinator = coordinator_with(RecordingTransport::new());
    let (command_tx, command_rx) = mpsc::channel(4);
    let (_outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let service = tokio::spawn(run_stream_service(
        coordinator,
        command_rx,
        outcome_rx,
        cancel.clone(),
    ));
    command_tx.send(UiCommand::Mount).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();

    let coordinator = service.await.unwrap();
    assert_eq!(coordinator.connection_count(), 0);
    assert_eq!(coordinator.transport().connect_count(cam(1)), 1);
}
