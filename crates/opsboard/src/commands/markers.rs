//! Reconcile an entity snapshot onto a headless map and report the
//! overlays it produced.

use serde::Serialize;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use opsboard_config::Config;
use opsboard_core::map::{FixedPosition, InitOutcome, NoGeolocation, SkippedEntity};
use opsboard_core::{Coordinates, EntitySnapshot, HeadlessMap, MapStatus, MarkerReconciler};

use crate::cli::{GlobalOpts, MarkersArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct MarkerEntry {
    key: String,
    title: String,
    label: String,
    background: &'static str,
    position: Coordinates,
    popup_title: String,
    popup_rows: Vec<(String, String)>,
}

#[derive(Serialize)]
struct MarkersReport {
    status: MapStatus,
    center: Coordinates,
    used_fallback: bool,
    current_location: Option<Coordinates>,
    markers: Vec<MarkerEntry>,
    skipped: Vec<SkippedEntity>,
}

#[derive(Tabled)]
struct MarkerRow {
    #[tabled(rename = "Entity")]
    key: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Color")]
    background: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Position")]
    position: String,
}

fn format_position(position: Coordinates) -> String {
    format!("{:.4}, {:.4}", position.lat, position.lng)
}

/// Read back what the reconciler drew, in draw order.
fn collect_markers(reconciler: &MarkerReconciler<HeadlessMap>) -> Vec<MarkerEntry> {
    let sdk = reconciler.sdk();
    reconciler
        .markers()
        .triples()
        .iter()
        .filter_map(|triple| {
            let marker = sdk.marker(triple.marker)?;
            let label = sdk.label(triple.label)?;
            let popup = sdk.click(triple.marker)?;
            Some(MarkerEntry {
                key: triple.key.to_string(),
                title: marker.title.clone(),
                label: label.text.clone(),
                background: label.background,
                position: marker.position,
                popup_title: popup.title.clone(),
                popup_rows: popup.rows.clone(),
            })
        })
        .collect()
}

pub async fn handle(
    args: &MarkersArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let snapshot: EntitySnapshot = super::read_json(&args.snapshot)?;

    let mut reconciler = MarkerReconciler::new(HeadlessMap::new(), config.map_config());
    // No map yet: held for the first pass after initialization.
    reconciler.update(snapshot);

    let cancel = CancellationToken::new();
    let outcome = match (args.lat, args.lng) {
        (Some(lat), Some(lng)) => {
            reconciler
                .initialize(&FixedPosition(Coordinates::new(lat, lng)), &cancel)
                .await?
        }
        _ => reconciler.initialize(&NoGeolocation, &cancel).await?,
    };
    let InitOutcome::Initialized {
        center,
        used_fallback,
        report,
    } = outcome
    else {
        return Err(CliError::Internal("map was already initialized".into()));
    };

    let current_location = reconciler
        .markers()
        .persistent()
        .and_then(|m| reconciler.sdk().marker(m))
        .map(|spec| spec.position);

    let summary = MarkersReport {
        status: reconciler.status(),
        center,
        used_fallback,
        current_location,
        markers: collect_markers(&reconciler),
        skipped: report.skipped,
    };
    reconciler.teardown();

    let out = output::render_single(&global.output, &summary, |r| {
        let rows: Vec<MarkerRow> = r
            .markers
            .iter()
            .map(|m| MarkerRow {
                key: m.key.clone(),
                label: m.label.clone(),
                background: m.background.into(),
                title: m.title.clone(),
                position: format_position(m.position),
            })
            .collect();

        let mut lines = vec![format!(
            "Map ready at {}{}",
            format_position(r.center),
            if r.used_fallback { " (fallback)" } else { "" }
        )];
        lines.push(output::render_table(&rows));
        lines.extend(
            r.skipped
                .iter()
                .map(|s| format!("skipped {}: {}", s.key, s.reason)),
        );
        Ok(lines.join("\n"))
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
