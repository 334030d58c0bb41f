//! # Client Core
//!
//! Submits one matrix to the coordinator's client port and waits for the
//! assembled cofactor matrix.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cofactor_grid::client::ClientCore;
//!
//! let core = ClientCore::new("Client1".to_string());
//! let matrix = random_matrix(4, &mut rand::thread_rng())?;
//! let response = core.submit("127.0.0.1:8000", matrix).await?;
//! ```

use anyhow::{anyhow, Context, Result};
use log::info;
use rand::Rng;
use std::fs;
use tokio::net::TcpStream;

use crate::common::connection::Connection;
use crate::common::messages::{CalculationRequest, CalculationResponse, Matrix};

/// The minimal client: one request, one response.
pub struct ClientCore {
    /// The unique name identifying this client
    client_name: String,
}

impl ClientCore {
    pub fn new(client_name: String) -> Self {
        Self { client_name }
    }

    /// Send `matrix` to the coordinator at `address` and wait for the result.
    ///
    /// # Errors
    ///
    /// * Connection or transmission failure
    /// * The coordinator closed the connection without a response, which is
    ///   how it reports a failed round (e.g. no workers registered)
    pub async fn submit(&self, address: &str, matrix: Matrix) -> Result<CalculationResponse> {
        let size = matrix.size();
        info!(
            "📤 {} Sending {}x{} matrix to coordinator at {}",
            self.client_name, size, size, address
        );

        let stream = TcpStream::connect(address)
            .await
            .with_context(|| format!("failed to connect to {}", address))?;
        let mut conn = Connection::new(stream);

        conn.write_message(&CalculationRequest { matrix }).await?;

        match conn.read_message::<CalculationResponse>().await? {
            Some(response) => {
                info!(
                    "✅ {} Received result in {} ms",
                    self.client_name, response.elapsed_ms
                );
                Ok(response)
            }
            None => Err(anyhow!(
                "coordinator closed the connection without a response"
            )),
        }
    }
}

/// An N×N matrix of small random integers.
pub fn random_matrix<R: Rng>(size: usize, rng: &mut R) -> Result<Matrix> {
    let rows = (0..size)
        .map(|_| (0..size).map(|_| rng.gen_range(-9..=9) as f64).collect())
        .collect();
    Ok(Matrix::from_rows(rows)?)
}

/// Read a matrix stored as a JSON array of rows, e.g. `[[1, 2], [3, 4]]`.
pub fn load_matrix(path: &str) -> Result<Matrix> {
    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;
    let matrix: Matrix = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a square matrix", path))?;
    Ok(matrix)
}
