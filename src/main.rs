use chartsync_core::CancelFlag;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod file_settings;
mod platforms;
mod progress_bar;

use commands::{
    ApplyCommand, ConfigCommand, ExportCommand, FetchCommand, ListCommand, TokenCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "chartsync")]
#[command(version)]
#[command(
    about = "Move chart themes and drawing templates between charting platforms",
    long_about = None
)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a backup from the source platform
    Fetch(FetchCommand),

    /// Show the contents of backup files
    List(ListCommand),

    /// Write a selected subset of backup files
    Export(ExportCommand),

    /// Replay a backup against the destination platform
    Apply(ApplyCommand),

    /// Check that the access token can be discovered
    Token(TokenCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "chartsync=debug,chartsync_core=debug"
    } else {
        "chartsync=info,chartsync_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::load(cli.config)?;

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping after the current request");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Some(Commands::Fetch(cmd)) => cmd.run(&config, &cancel).await?,
        Some(Commands::List(cmd)) => cmd.run(&config)?,
        Some(Commands::Export(cmd)) => cmd.run(&config)?,
        Some(Commands::Apply(cmd)) => cmd.run(&config, &cancel).await?,
        Some(Commands::Token(cmd)) => cmd.run(&config).await?,
        Some(Commands::Config(cmd)) => cmd.run(&config)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
