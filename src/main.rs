use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use brewlog_core::Journal;
use commands::{BrewCommand, ConfigCommand, HealthCommand};
use config::Config;

#[derive(Parser)]
#[command(name = "brewlog")]
#[command(version)]
#[command(about = "A coffee brewing journal", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log, list, edit and delete brews
    Brew(BrewCommand),

    /// Check local storage and the remote store
    Health(HealthCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brewlog=warn,brewlog_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Brew(cmd)) => {
            let journal = Journal::from_config(&config.journal())?;
            cmd.run(&journal).await?;
        }
        Some(Commands::Health(cmd)) => {
            let journal = Journal::from_config(&config.journal())?;
            cmd.run(&journal).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
