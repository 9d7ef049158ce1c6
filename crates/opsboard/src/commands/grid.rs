//! Grid preview: mount the wall for a layout and show what each cell gets.

use std::fmt::Write as _;

use serde::Serialize;
use tabled::Tabled;

use opsboard_config::Config;
use opsboard_core::stream::{CellView, SurfaceDisplay};
use opsboard_core::{CameraLayout, RecordingTransport};

use crate::cli::{GlobalOpts, GridArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct GridPreview {
    layout: CameraLayout,
    columns: usize,
    cells: Vec<CellView>,
}

#[derive(Tabled)]
struct CellRow {
    #[tabled(rename = "Cell")]
    cell: usize,
    #[tabled(rename = "Camera")]
    camera: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Selected")]
    selected: String,
    #[tabled(rename = "Display")]
    display: String,
}

pub fn display_text(display: &SurfaceDisplay) -> String {
    match display {
        SurfaceDisplay::Hidden => "hidden".into(),
        SurfaceDisplay::Paused => "paused".into(),
        SurfaceDisplay::Settling => "settling".into(),
        SurfaceDisplay::Connecting(url) => format!("connecting {url}"),
        SurfaceDisplay::Live(url) => format!("live {url}"),
        SurfaceDisplay::Placeholder(url) => format!("placeholder {url}"),
    }
}

pub fn handle(args: &GridArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let mut coordinator = super::build_coordinator(
        config,
        global,
        RecordingTransport::new(),
        args.layout,
        args.selected,
    )?;
    coordinator.mount();

    let layout = coordinator.layout();
    let preview = GridPreview {
        layout,
        columns: layout.columns(),
        cells: coordinator.grid_view(),
    };
    coordinator.shutdown();

    let color = output::should_color(&global.color);
    let out = output::render_single(&global.output, &preview, |p| {
        let rows: Vec<CellRow> = p
            .cells
            .iter()
            .enumerate()
            .map(|(i, cell)| CellRow {
                cell: i + 1,
                camera: cell.camera.to_string(),
                name: cell.name.clone(),
                status: output::paint_status(cell.status, color),
                selected: if cell.selected { "*".into() } else { String::new() },
                display: display_text(&cell.display),
            })
            .collect();

        let mut text = String::new();
        let _ = writeln!(
            text,
            "Layout {} ({} columns, {} of {} cells filled)",
            p.layout,
            p.columns,
            p.cells.len(),
            p.layout.cell_count()
        );
        text.push_str(&output::render_table(&rows));
        Ok(text)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
