mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    init_tracing(cli.global.verbose);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let global = &cli.global;
    tracing::debug!(command = ?cli.command, "dispatching command");

    match cli.command {
        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "opsboard", &mut std::io::stdout());
            Ok(())
        }

        // Config commands load the file themselves; `config path` works
        // even when it does not parse.
        Command::Config(args) => commands::config_cmd::handle(&args, global),

        Command::Cameras(args) => {
            let config = commands::load_config(global)?;
            commands::cameras::handle(&args, &config, global).await
        }
        Command::Grid(args) => {
            let config = commands::load_config(global)?;
            commands::grid::handle(&args, &config, global)
        }
        Command::Replay(args) => {
            let config = commands::load_config(global)?;
            commands::replay::handle(&args, &config, global).await
        }
        Command::Markers(args) => {
            let config = commands::load_config(global)?;
            commands::markers::handle(&args, &config, global).await
        }
    }
}
