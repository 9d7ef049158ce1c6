//! Integration tests for the `opsboard` binary.
//!
//! Everything runs against the built-in camera set or a temp config file;
//! the probe test points a camera at a wiremock server.
#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// `opsboard` with env isolation and a config path that does not exist,
/// so the built-in defaults apply.
fn opsboard_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("opsboard");
    cmd.env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir)
        .env("OPSBOARD_CONFIG", dir.join("missing.toml"))
        .env("NO_COLOR", "1")
        .env_remove("OPSBOARD_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = tempfile::tempdir().unwrap();
    let output = opsboard_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    opsboard_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("cameras")
            .and(predicate::str::contains("grid"))
            .and(predicate::str::contains("replay"))
            .and(predicate::str::contains("markers")),
    );
}

#[test]
fn test_completions_bash() {
    let dir = tempfile::tempdir().unwrap();
    opsboard_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    let dir = tempfile::tempdir().unwrap();
    let custom = dir.path().join("board.toml");
    opsboard_cmd(dir.path())
        .args(["config", "path", "--config"])
        .arg(&custom)
        .assert()
        .success()
        .stdout(predicate::str::contains("board.toml"));
}

#[test]
fn test_config_show_json_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let output = opsboard_cmd(dir.path())
        .args(["config", "show", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let config = stdout_json(&output);
    assert_eq!(config["stream"]["settle_delay_ms"], 300);
    assert_eq!(config["cameras"].as_array().unwrap().len(), 6);
    assert_eq!(config["default_layout"], "2x2");
}

#[test]
fn test_invalid_config_exits_with_usage_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "bad.toml", "selected_camera = 42\n");
    opsboard_cmd(dir.path())
        .args(["cameras", "list", "--config"])
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("selected_camera"));
}

// ── Cameras ─────────────────────────────────────────────────────────

#[test]
fn test_cameras_list_shows_stream_urls() {
    let dir = tempfile::tempdir().unwrap();
    opsboard_cmd(dir.path())
        .args(["cameras", "list"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("서초동 대로")
                .and(predicate::str::contains("발견됨"))
                .and(predicate::str::contains("http://172.31.0.101:81/stream")),
        );
}

#[test]
fn test_probe_unknown_camera_exits_not_found() {
    let dir = tempfile::tempdir().unwrap();
    opsboard_cmd(dir.path())
        .args(["cameras", "probe", "99"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Camera '99' not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_probe_reports_reachable_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "multipart/x-mixed-replace; boundary=frame"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = write_file(
        dir.path(),
        "probe.toml",
        &format!(
            "[stream]\nport = {port}\n\n[[cameras]]\nid = 1\nname = \"bench\"\nip = \"127.0.0.1\"\n",
            port = server.address().port()
        ),
    );

    let mut cmd = opsboard_cmd(dir.path());
    cmd.args(["cameras", "probe", "-o", "json", "--config"])
        .arg(&config);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();

    assert!(
        output.status.success(),
        "probe failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report = stdout_json(&output);
    assert_eq!(report[0]["camera"], 1);
    assert_eq!(report[0]["reachable"], true);
    assert_eq!(report[0]["status"], 200);
}

// ── Grid ────────────────────────────────────────────────────────────

#[test]
fn test_grid_puts_selected_camera_first() {
    let dir = tempfile::tempdir().unwrap();
    let output = opsboard_cmd(dir.path())
        .args(["grid", "--layout", "3x3", "--selected", "2", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let preview = stdout_json(&output);
    assert_eq!(preview["layout"], "3x3");
    let order: Vec<u64> = preview["cells"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["camera"].as_u64().unwrap())
        .collect();
    assert_eq!(order, vec![2, 1, 3, 4, 5, 6]);
    assert_eq!(preview["cells"][0]["selected"], true);
    assert_eq!(preview["cells"][0]["display"]["display"], "connecting");
}

#[test]
fn test_grid_unknown_selection_exits_not_found() {
    let dir = tempfile::tempdir().unwrap();
    opsboard_cmd(dir.path())
        .args(["grid", "--selected", "12"])
        .assert()
        .code(4);
}

// ── Replay ──────────────────────────────────────────────────────────

#[test]
fn test_replay_adopts_grid_connection() {
    let dir = tempfile::tempdir().unwrap();
    let script = json!({
        "steps": [
            { "op": "mount" },
            { "op": "stream_live", "camera": 1 },
            { "op": "open_modal", "camera": 1 },
            { "wait_ms": 50 },
            { "op": "close_modal" },
            { "wait_ms": 400 }
        ]
    });
    let script = write_file(dir.path(), "handoff.json", &script.to_string());

    opsboard_cmd(dir.path())
        .arg("replay")
        .arg(&script)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("adopted")
                .and(predicate::str::contains("MODAL_ACTIVE"))
                .and(predicate::str::contains("at most 1 open per camera")),
        );
}

#[test]
fn test_replay_rejects_malformed_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_file(dir.path(), "broken.json", "{\"steps\": [");
    opsboard_cmd(dir.path())
        .arg("replay")
        .arg(&script)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid JSON"));
}

#[test]
fn test_replay_missing_script_is_general_error() {
    let dir = tempfile::tempdir().unwrap();
    opsboard_cmd(dir.path())
        .args(["replay", "nope.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read"));
}

// ── Markers ─────────────────────────────────────────────────────────

#[test]
fn test_markers_draws_snapshot_at_given_position() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = json!({
        "emergencies": [{
            "id": "E1",
            "type": "화재",
            "location": "역삼동 123",
            "coordinates": { "lat": 37.5, "lng": 127.0 },
            "status": "대응중",
            "priority": "긴급",
            "time": "14:02",
            "description": "주택 화재"
        }],
        "vehicles": [{
            "id": "V1",
            "type": "소방차",
            "location": "역삼 119",
            "coordinates": { "lat": 37.51, "lng": 127.01 },
            "status": "출동중",
            "assignedTo": "E1"
        }, {
            "id": "",
            "type": "구급차",
            "location": "?",
            "coordinates": { "lat": 37.52, "lng": 127.02 },
            "status": "대기중"
        }]
    });
    let snapshot = write_file(dir.path(), "snapshot.json", &snapshot.to_string());

    let output = opsboard_cmd(dir.path())
        .args(["markers", "--lat", "37.4", "--lng", "127.1", "-o", "json"])
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "markers failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = stdout_json(&output);
    assert_eq!(report["status"]["state"], "ready");
    assert_eq!(report["used_fallback"], false);
    assert_eq!(report["center"]["lat"], 37.4);
    assert_eq!(report["current_location"]["lng"], 127.1);

    let markers = report["markers"].as_array().unwrap();
    assert_eq!(markers.len(), 2);
    assert_eq!(markers[0]["label"], "🔥 화재");
    assert_eq!(markers[1]["title"], "소방차 - 출동중");
    assert_eq!(report["skipped"].as_array().unwrap().len(), 1);
}

#[test]
fn test_markers_without_position_uses_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = write_file(dir.path(), "empty.json", "{}");
    opsboard_cmd(dir.path())
        .arg("markers")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("(fallback)"));
}
