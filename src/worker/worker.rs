//! # Worker Core
//!
//! A reference worker process: connects to the coordinator's worker port and
//! answers every [`Task`] with a [`PartialResult`] until the coordinator
//! closes the connection.

use anyhow::Result;
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::common::connection::Connection;
use crate::common::messages::{PartialResult, Task};
use crate::worker::cofactor::cofactor;

pub struct WorkerCore {
    /// Worker name for logging purposes
    name: String,
}

impl WorkerCore {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    /// Connect to the coordinator and serve tasks until it disconnects.
    ///
    /// Returns the number of tasks answered.
    pub async fn run(&self, coordinator_address: &str) -> Result<usize> {
        let stream = TcpStream::connect(coordinator_address).await?;
        stream.set_nodelay(true)?;
        info!(
            "🔗 Worker '{}' connected to coordinator at {}",
            self.name, coordinator_address
        );

        let mut conn = Connection::new(stream);
        self.serve(&mut conn).await
    }

    /// Answer tasks on an established connection until the peer closes it.
    pub async fn serve<S>(&self, conn: &mut Connection<S>) -> Result<usize>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut answered = 0;

        while let Some(task) = conn.read_message::<Task>().await? {
            let result = self.compute(task).await?;
            conn.write_message(&result).await?;
            answered += 1;
        }

        info!(
            "👋 Worker '{}' disconnected after {} tasks",
            self.name, answered
        );
        Ok(answered)
    }

    /// Compute one cofactor on the blocking pool; the determinant is O(N³).
    pub async fn compute(&self, task: Task) -> Result<PartialResult> {
        let cell = task.cell();
        debug!("🧮 Worker '{}' computing cofactor {}", self.name, cell);

        let value = tokio::task::spawn_blocking(move || cofactor(&task.matrix, cell))
            .await
            .map_err(|e| anyhow::anyhow!("Cofactor task panicked: {}", e))?;

        if !value.is_finite() {
            warn!(
                "⚠️  Worker '{}' has no finite cofactor for {} ({})",
                self.name, cell, value
            );
        }

        Ok(PartialResult::new(cell, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::messages::{Cell, Matrix};
    use std::sync::Arc;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_serve_answers_until_close() {
        let (coordinator, worker) = duplex(4096);
        let core = WorkerCore::new("test".to_string());
        let serving = tokio::spawn(async move {
            let mut conn = Connection::new(worker);
            core.serve(&mut conn).await
        });

        let matrix = Arc::new(Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap());
        let mut conn = Connection::new(coordinator);

        conn.write_message(&Task::new(Cell::new(0, 1), matrix.clone()))
            .await
            .unwrap();
        let first: PartialResult = conn.read_message().await.unwrap().unwrap();
        assert_eq!(first.cell(), Cell::new(0, 1));
        assert_eq!(first.cofactor, Some(-3.0));

        conn.write_message(&Task::new(Cell::new(1, 1), matrix))
            .await
            .unwrap();
        let second: PartialResult = conn.read_message().await.unwrap().unwrap();
        assert_eq!(second.cofactor, Some(1.0));

        drop(conn);
        assert_eq!(serving.await.unwrap().unwrap(), 2);
    }
}
