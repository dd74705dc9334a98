mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drydock::config::Config;

#[derive(Parser)]
#[command(name = "drydock", version, about = "Maintenance scheduling for Mesos cluster agents")]
struct Cli {
    /// Mesos master URL (overrides config)
    #[arg(long, global = true)]
    master_url: Option<String>,

    /// Path to config file (default: ~/.config/drydock/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides config; RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show tool and master information
    Info,

    /// Manage machine maintenance windows and state
    Maintenance {
        #[command(subcommand)]
        command: commands::maintenance::MaintenanceCommands,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.master_url {
        config.master_url = url;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_tracing(&config.log_level);

    match cli.command {
        Commands::Info => commands::info::run(&config),
        Commands::Maintenance { command } => commands::maintenance::run(&config, &command),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
