//! # Coordinator Binary Entry Point
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin coordinator -- --config config/coordinator.toml
//! ```
//!
//! The coordinator will:
//! 1. Load configuration from the TOML file (defaults if none is given)
//! 2. Bind the worker and client listeners
//! 3. Register workers and serve client requests until killed

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

use cofactor_grid::common::config::CoordinatorConfig;
use cofactor_grid::server::Coordinator;

/// Command-line arguments for the coordinator binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the coordinator configuration file (TOML format)
    ///
    /// Example: config/coordinator.toml
    #[arg(short, long)]
    config: Option<String>,
}

/// Initialize the logging system with timestamp, level, and message formatting.
///
/// Format: `[HH:MM:SS] [LEVEL] message`
fn init_logger() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CoordinatorConfig::from_file(path)?,
        None => CoordinatorConfig::default(),
    };

    log::info!("🚀 Calculation coordinator starting...");
    let coordinator = Coordinator::bind(&config).await?;

    // Runs until one of the listeners fails
    coordinator.run().await;

    Ok(())
}
