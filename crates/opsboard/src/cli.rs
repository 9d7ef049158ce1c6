//! Clap derive structures for the `opsboard` console.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use opsboard_core::{CameraId, CameraLayout};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// opsboard -- headless console for the emergency operations board
#[derive(Debug, Parser)]
#[command(
    name = "opsboard",
    version,
    about = "Inspect cameras, replay stream handoffs, and render map markers",
    long_about = "Headless console for the emergency operations board.\n\n\
        Drives the stream surface coordinator and the marker reconciler\n\
        without a UI: list and probe camera endpoints, preview the grid,\n\
        replay UI command scripts, and reconcile entity snapshots.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config path)
    #[arg(long, env = "OPSBOARD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "OPSBOARD_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and probe configured cameras
    #[command(alias = "cam")]
    Cameras(CamerasArgs),

    /// Preview the camera grid for a layout and selection
    Grid(GridArgs),

    /// Replay a UI command script against the stream coordinator
    Replay(ReplayArgs),

    /// Reconcile an entity snapshot onto a headless map
    Markers(MarkersArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Cameras ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CamerasArgs {
    #[command(subcommand)]
    pub command: CamerasCommand,
}

#[derive(Debug, Subcommand)]
pub enum CamerasCommand {
    /// List configured cameras and their stream endpoints
    #[command(alias = "ls")]
    List,

    /// Check that camera stream endpoints answer
    Probe {
        /// Probe only this camera
        camera: Option<CameraId>,

        /// Per-camera timeout in milliseconds (overrides config)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

// ── Grid ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GridArgs {
    /// Grid layout: 1x1, 2x2, or 3x3 (overrides config)
    #[arg(long, short = 'l')]
    pub layout: Option<CameraLayout>,

    /// Primary camera (overrides config)
    #[arg(long, short = 's')]
    pub selected: Option<CameraId>,
}

// ── Replay ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON script: {"steps": [{"op": "mount"}, {"wait_ms": 400}, ...]}
    pub script: PathBuf,

    /// Connect to the real camera endpoints instead of recording requests
    #[arg(long)]
    pub live: bool,
}

// ── Markers ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MarkersArgs {
    /// JSON entity snapshot: {"emergencies": [...], "vehicles": [...]}
    pub snapshot: PathBuf,

    /// Current latitude; the configured fallback is used when absent
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Current longitude
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
