//! Camera command handlers.

use serde::Serialize;
use tabled::Tabled;
use tokio::task::JoinSet;
use url::Url;

use opsboard_config::Config;
use opsboard_core::stream::endpoint::stream_url;
use opsboard_core::stream::{ProbeReport, probe_endpoint};
use opsboard_core::{CameraFeed, CameraId};

use crate::cli::{CamerasArgs, CamerasCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct CameraEntry {
    #[serde(flatten)]
    feed: CameraFeed,
    stream_url: Url,
}

#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Stream")]
    stream: String,
}

#[derive(Serialize)]
struct ProbeEntry {
    camera: CameraId,
    name: String,
    #[serde(flatten)]
    report: ProbeReport,
}

#[derive(Tabled)]
struct ProbeRow {
    #[tabled(rename = "Camera")]
    camera: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Reachable")]
    reachable: String,
    #[tabled(rename = "HTTP")]
    status: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: &CamerasArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let cameras = super::camera_list(config, global)?;
    let endpoint = config
        .coordinator_config()
        .map_err(|e| CliError::config(e, &super::config_file(global)))?
        .endpoint;
    let color = output::should_color(&global.color);

    match args.command {
        CamerasCommand::List => {
            let entries = cameras
                .iter()
                .map(|feed| {
                    Ok(CameraEntry {
                        feed: feed.clone(),
                        stream_url: stream_url(&endpoint, feed)?,
                    })
                })
                .collect::<Result<Vec<_>, CliError>>()?;
            let out = output::render_list(&global.output, &entries, |e| CameraRow {
                id: e.feed.id.to_string(),
                name: e.feed.name.clone(),
                status: output::paint_status(e.feed.status, color),
                stream: e.stream_url.to_string(),
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        CamerasCommand::Probe { camera, timeout_ms } => {
            let targets: Vec<CameraFeed> = match camera {
                Some(id) => vec![cameras.require(id)?.clone()],
                None => cameras.iter().cloned().collect(),
            };
            let timeout = timeout_ms.map_or_else(
                || config.probe_timeout(),
                std::time::Duration::from_millis,
            );
            let client = super::http_client()?;

            let mut probes = JoinSet::new();
            for feed in targets {
                let url = stream_url(&endpoint, &feed)?;
                let client = client.clone();
                probes.spawn(async move {
                    let report = probe_endpoint(&client, &url, timeout).await;
                    ProbeEntry {
                        camera: feed.id,
                        name: feed.name,
                        report,
                    }
                });
            }

            let mut entries = Vec::with_capacity(probes.len());
            while let Some(joined) = probes.join_next().await {
                entries.push(joined.map_err(|e| CliError::Internal(e.to_string()))?);
            }
            entries.sort_by_key(|e| e.camera);

            let out = output::render_list(&global.output, &entries, |e| ProbeRow {
                camera: e.camera.to_string(),
                name: e.name.clone(),
                reachable: output::yes_no(e.report.reachable, color),
                status: e.report.status.map(|s| s.to_string()).unwrap_or_default(),
                latency: format!("{} ms", e.report.latency_ms),
                detail: e
                    .report
                    .error
                    .clone()
                    .or_else(|| e.report.content_type.clone())
                    .unwrap_or_default(),
            })?;
            output::print_output(&out, global.quiet);

            let unreachable = entries.iter().filter(|e| !e.report.reachable).count();
            if unreachable > 0 {
                return Err(CliError::Unreachable {
                    unreachable,
                    total: entries.len(),
                });
            }
            Ok(())
        }
    }
}
