//! # Client Binary Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Random 4x4 matrix
//! cargo run --bin client -- --size 4
//!
//! # Matrix from a JSON file of rows
//! cargo run --bin client -- --matrix input.json
//! ```

use anyhow::bail;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

use cofactor_grid::client::{load_matrix, random_matrix, ClientCore};

/// Command-line arguments for the client binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Coordinator client-port address
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    coordinator: String,

    /// JSON file holding the matrix as an array of rows
    #[arg(short, long, conflicts_with = "size")]
    matrix: Option<String>,

    /// Size of a randomly generated matrix
    #[arg(short, long)]
    size: Option<usize>,
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

    let matrix = match (&args.matrix, args.size) {
        (Some(path), _) => load_matrix(path)?,
        (None, Some(size)) => random_matrix(size, &mut rand::thread_rng())?,
        (None, None) => bail!("pass either --matrix <file> or --size <n>"),
    };

    let core = ClientCore::new(format!("client-{}", std::process::id()));
    let response = core.submit(&args.coordinator, matrix).await?;

    println!("Cofactor matrix ({} ms):", response.elapsed_ms);
    for row in response.matrix.rows() {
        println!("  {:?}", row);
    }

    Ok(())
}
