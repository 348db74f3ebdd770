mod commands;
mod import_files;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use syntaxforge_core::ForgeError;
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, Context};

#[derive(Parser)]
#[command(
    name = "syntaxforge",
    about = "Manage SyntaxForge workspaces from the command line",
    version
)]
struct Cli {
    /// Directory holding the workspace store; overrides the saved setting.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

/// Installs the fmt subscriber. `SYNTAXFORGE_LOG` takes `EnvFilter` syntax;
/// records from the core's `log` calls are bridged in.
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("SYNTAXFORGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let mut ctx = Context {
        settings: settings::load_settings(),
        settings_path: settings::settings_file_path(),
    };
    if let Some(dir) = cli.data_dir {
        ctx.settings.data_directory = dir.to_string_lossy().to_string();
    }
    log::debug!("using data directory {}", ctx.settings.data_directory);

    let mut stdout = std::io::stdout().lock();
    match commands::run(cli.command, &ctx, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ForgeError>() {
                Some(forge) => eprintln!("error: {} ({forge})", forge.user_message()),
                None => eprintln!("error: {e:#}"),
            }
            log::debug!("{e:?}");
            ExitCode::FAILURE
        }
    }
}
