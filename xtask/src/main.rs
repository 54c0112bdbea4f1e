// Host tooling crate; unwrap/expect/panic acceptable outside the device crates.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod inspect;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Opus playback development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Demux `.opus` files the way the player does and print what it sees
    Inspect {
        /// File or music directory (defaults to $MUSIC_PATH)
        path: Option<PathBuf>,
        /// Reject pages whose continuation flag disagrees with the lacing
        #[arg(long)]
        strict: bool,
        /// Print one line per packet
        #[arg(long)]
        packets: bool,
    },
    /// Check host and no_std (thumbv7em) builds, clippy and formatting
    Check,
    /// Run unit, integration and doc tests
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Inspect { path, strict, packets } => inspect::run(path.as_deref(), strict, packets),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
    }
}
