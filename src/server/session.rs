//! # Client Session Handler
//!
//! One accepted client connection is one session: read a single
//! [`CalculationRequest`], run a distribution round, send back a
//! [`CalculationResponse`], close. Errors end only the session they occur in.

use anyhow::{anyhow, Result};
use log::{debug, error, info};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use crate::common::connection::Connection;
use crate::common::messages::{CalculationRequest, CalculationResponse};
use crate::server::distribution::{DistributionEngine, RoundOutcome};
use crate::server::metrics::CoordinatorMetrics;

/// How a session that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client closed the connection without sending a request.
    NoRequest,
    /// A response was sent; `missing` cells were left unset.
    Responded { elapsed_ms: u64, missing: usize },
}

/// Serve one client connection to completion.
///
/// The connection is shut down on every path. Failures are logged, never
/// propagated, so one bad request cannot affect the listener.
pub async fn run_session<S>(
    engine: DistributionEngine,
    metrics: CoordinatorMetrics,
    stream: S,
    peer: String,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let session_id = short_id();
    info!("👤 Client connected from {} (session {})", peer, session_id);

    let mut conn = Connection::new(stream);

    match handle_request(&engine, &mut conn, &session_id).await {
        Ok(SessionEnd::NoRequest) => {
            debug!("🔌 Session {} closed before sending a request", session_id);
        }
        Ok(SessionEnd::Responded {
            elapsed_ms,
            missing,
        }) => {
            info!(
                "✅ Result sent to client (session {}). Time: {} ms, missing cells: {}",
                session_id, elapsed_ms, missing
            );
        }
        Err(e) => {
            error!("❌ Error handling client (session {}): {:#}", session_id, e);
        }
    }

    if let Err(e) = conn.shutdown().await {
        debug!("🔌 Session {} shutdown: {}", session_id, e);
    }

    info!("📊 {}", metrics.snapshot());
}

/// Read one request, distribute it and write the response.
pub async fn handle_request<S>(
    engine: &DistributionEngine,
    conn: &mut Connection<S>,
    session_id: &str,
) -> Result<SessionEnd>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Some(request) = conn.read_message::<CalculationRequest>().await? else {
        return Ok(SessionEnd::NoRequest);
    };

    let size = request.matrix.size();
    info!(
        "📥 Session {} received matrix {}x{} for calculation",
        session_id, size, size
    );

    let started = Instant::now();
    let outcome = engine.distribute(request.matrix).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let missing = outcome.missing();
    let matrix = match outcome {
        RoundOutcome::NoCapacity => {
            return Err(anyhow!("no workers available to perform the calculation"));
        }
        RoundOutcome::Complete(matrix) | RoundOutcome::Partial { matrix, .. } => matrix,
    };

    let response = CalculationResponse { matrix, elapsed_ms };
    conn.write_message(&response).await?;

    Ok(SessionEnd::Responded {
        elapsed_ms,
        missing,
    })
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::messages::{Matrix, PartialResult, Task};
    use crate::server::registry::WorkerRegistry;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncWriteExt};

    fn engine() -> (DistributionEngine, Arc<WorkerRegistry>) {
        let metrics = CoordinatorMetrics::new();
        let registry = Arc::new(WorkerRegistry::new(metrics.clone()));
        let engine = DistributionEngine::new(registry.clone(), metrics, Duration::from_secs(5));
        (engine, registry)
    }

    #[tokio::test]
    async fn test_immediate_close_is_no_request() {
        let (engine, _registry) = engine();
        let (client, server) = duplex(1024);
        drop(client);

        let mut conn = Connection::new(server);
        let end = handle_request(&engine, &mut conn, "test").await.unwrap();
        assert_eq!(end, SessionEnd::NoRequest);
    }

    #[tokio::test]
    async fn test_no_capacity_closes_without_payload() {
        let (engine, _registry) = engine();
        let (client, server) = duplex(1024);

        let session = tokio::spawn(run_session(
            engine,
            CoordinatorMetrics::new(),
            server,
            "test".to_string(),
        ));

        let mut client = Connection::new(client);
        let request = CalculationRequest {
            matrix: Matrix::from_rows(vec![vec![1.0; 3]; 3]).unwrap(),
        };
        client.write_message(&request).await.unwrap();

        let response: Option<CalculationResponse> = client.read_message().await.unwrap();
        assert!(response.is_none());
        session.await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_request_ends_session() {
        let (engine, _registry) = engine();
        let (mut client, server) = duplex(1024);

        let session = tokio::spawn(run_session(
            engine,
            CoordinatorMetrics::new(),
            server,
            "test".to_string(),
        ));

        let payload = br#"{"matrix":[[1.0,2.0]]}"#;
        client
            .write_all(&(payload.len() as u32).to_le_bytes())
            .await
            .unwrap();
        client.write_all(payload).await.unwrap();

        let mut client = Connection::new(client);
        let response: Option<CalculationResponse> = client.read_message().await.unwrap();
        assert!(response.is_none());
        session.await.unwrap();
    }

    #[tokio::test]
    async fn test_response_carries_worker_results() {
        let (engine, registry) = engine();
        let (ours, theirs) = duplex(4096);
        registry.register(ours, "worker".to_string()).await;
        tokio::spawn(async move {
            let mut conn = Connection::new(theirs);
            while let Ok(Some(task)) = conn.read_message::<Task>().await {
                let result = PartialResult {
                    row: task.row,
                    column: task.column,
                    cofactor: Some(-1.0),
                };
                if conn.write_message(&result).await.is_err() {
                    break;
                }
            }
        });

        let (client, server) = duplex(4096);
        let mut server = Connection::new(server);
        let mut client = Connection::new(client);
        client
            .write_message(&CalculationRequest {
                matrix: Matrix::from_rows(vec![vec![7.0]]).unwrap(),
            })
            .await
            .unwrap();

        let end = handle_request(&engine, &mut server, "test").await.unwrap();
        assert!(matches!(end, SessionEnd::Responded { missing: 0, .. }));

        let response: CalculationResponse = client.read_message().await.unwrap().unwrap();
        assert_eq!(response.matrix.to_rows(), vec![vec![-1.0]]);
    }
}
