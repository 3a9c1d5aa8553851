use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use appshelf::commands::{self, Commands};
use appshelf::common::config::Config;
use appshelf::ui::{self, Level, OutputFormat};

/// Search, install and organize Windows applications from winget and Chocolatey
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Use a different config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "appshelf=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    commands::handle_command(cli.command, config, cli.config.as_deref()).await
}

/// Validation errors are the user's to fix, so they read as warnings.
fn report(err: &anyhow::Error) {
    let invalid = err
        .downcast_ref::<appshelf::Error>()
        .is_some_and(appshelf::Error::is_validation);
    let (level, code) = if invalid {
        (Level::Warn, "invalid")
    } else {
        (Level::Error, "error")
    };
    ui::emit(level, code, &format!("Error: {:#}", err), None);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.debug);
    ui::set_debug_mode(cli.debug);
    ui::init(cli.output, cli.output == OutputFormat::Text);

    if let Err(err) = run(cli).await {
        report(&err);
        std::process::exit(1);
    }
}
