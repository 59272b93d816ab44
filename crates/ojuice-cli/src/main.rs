use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ojuice_core::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ojuice")]
#[command(about = "100% Orange Juice live memory table", version)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the game and print live values (default)
    Watch {
        /// Override the poll interval in milliseconds (50-5000)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Freeze a field at a value while watching (repeatable)
        #[arg(short, long, value_name = "KEY=VALUE")]
        lock: Vec<String>,
    },
    /// Write a value to a field and its mirror locations
    Set {
        /// Field key, e.g. player1_hp or common_star
        key: String,
        value: i32,
    },
    /// Terminate the game process
    Kill,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ojuice=info".parse()?)
                .add_directive("ojuice_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = match AppConfig::load(&args.config) {
        Ok(c) => {
            info!("Loaded config from {:?}", args.config);
            c
        }
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            AppConfig::default()
        }
    };

    match args.command.unwrap_or(Command::Watch {
        interval: None,
        lock: Vec::new(),
    }) {
        Command::Watch { interval, lock } => commands::watch::run(config, interval, &lock),
        Command::Set { key, value } => commands::set::run(config, &key, value),
        Command::Kill => commands::kill::run(config),
    }
}
