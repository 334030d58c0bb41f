//! # Worker Binary Entry Point
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin worker -- --coordinator 127.0.0.1:9000 --name worker-1
//! ```

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

use cofactor_grid::worker::WorkerCore;

/// Command-line arguments for the worker binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Coordinator worker-port address
    #[arg(short, long, default_value = "127.0.0.1:9000")]
    coordinator: String,

    /// Name used in log lines
    #[arg(short, long)]
    name: Option<String>,
}

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
    let name = args
        .name
        .unwrap_or_else(|| format!("worker-{}", std::process::id()));

    let core = WorkerCore::new(name);
    core.run(&args.coordinator).await?;

    Ok(())
}
