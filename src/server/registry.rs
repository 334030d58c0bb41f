//! # Worker Registry
//!
//! Tracks the workers currently reachable on the worker port. Workers are
//! added when the worker listener accepts them and removed when a round sees
//! their connection fail or miss a task deadline.
//!
//! Each distribution round works from a [`snapshot`](WorkerRegistry::snapshot)
//! taken when it starts, so registrations and removals during a round do not
//! change that round's membership. A retired handle still held by a running
//! round is skipped through its health flag.

use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, MutexGuard};

use crate::common::connection::Connection;
use crate::server::metrics::CoordinatorMetrics;

pub type WorkerId = u64;

/// Any bidirectional byte stream a worker can be reached over.
pub trait WorkerStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> WorkerStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type WorkerConnection = Connection<Box<dyn WorkerStream>>;

/// An open connection to one worker process.
///
/// The connection sits behind an async mutex: whoever holds the guard owns the
/// request/reply exchange, so one physical connection never carries two tasks
/// at once even if the handle is part of several rounds' snapshots.
pub struct WorkerHandle {
    id: WorkerId,
    /// Remote address, for logging
    addr: String,
    connection: Mutex<WorkerConnection>,
    healthy: AtomicBool,
}

impl WorkerHandle {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// Returns `true` if this call flipped the handle from healthy to unhealthy.
    fn mark_unhealthy(&self) -> bool {
        self.healthy.swap(false, Ordering::SeqCst)
    }

    /// Wait for exclusive use of the worker's connection.
    pub async fn connection(&self) -> MutexGuard<'_, WorkerConnection> {
        self.connection.lock().await
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("healthy", &self.is_healthy())
            .finish()
    }
}

/// Thread-safe set of connected workers.
pub struct WorkerRegistry {
    workers: Mutex<BTreeMap<WorkerId, Arc<WorkerHandle>>>,
    next_id: AtomicU64,
    metrics: CoordinatorMetrics,
}

impl WorkerRegistry {
    pub fn new(metrics: CoordinatorMetrics) -> Self {
        Self {
            workers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            metrics,
        }
    }

    /// Add a newly accepted worker connection and return its handle.
    pub async fn register<S>(&self, stream: S, addr: String) -> Arc<WorkerHandle>
    where
        S: WorkerStream + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stream: Box<dyn WorkerStream> = Box::new(stream);
        let handle = Arc::new(WorkerHandle {
            id,
            addr,
            connection: Mutex::new(Connection::new(stream)),
            healthy: AtomicBool::new(true),
        });

        let total = {
            let mut workers = self.workers.lock().await;
            workers.insert(id, handle.clone());
            workers.len()
        };
        self.metrics.worker_registered();

        info!(
            "🔧 Worker {} connected from {}. Total workers: {}",
            id, handle.addr, total
        );

        handle
    }

    /// Remove a worker. Returns `false` if it was not registered.
    pub async fn unregister(&self, id: WorkerId) -> bool {
        let removed = self.workers.lock().await.remove(&id);
        if removed.is_some() {
            self.metrics.worker_unregistered();
        }
        removed.is_some()
    }

    /// Mark a worker unhealthy and remove it, logging why.
    ///
    /// Safe to call from several rounds for the same handle; only the first
    /// call logs and unregisters.
    pub async fn retire(&self, worker: &WorkerHandle, reason: &str) {
        if worker.mark_unhealthy() {
            self.unregister(worker.id).await;
            warn!(
                "⚠️  Worker {} ({}) marked unhealthy: {}",
                worker.id, worker.addr, reason
            );
        }
    }

    /// Point-in-time copy of the registered workers, ordered by id.
    pub async fn snapshot(&self) -> Vec<Arc<WorkerHandle>> {
        self.workers.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.workers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workers.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_later_registrations() {
        let registry = WorkerRegistry::new(CoordinatorMetrics::new());
        let (a, _a_peer) = duplex(64);
        let first = registry.register(a, "worker-a".to_string()).await;

        let snapshot = registry.snapshot().await;

        let (b, _b_peer) = duplex(64);
        let second = registry.register(b, "worker-b".to_string()).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), first.id());
        assert!(second.id() > first.id());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_retire_unregisters_once() {
        let metrics = CoordinatorMetrics::new();
        let registry = WorkerRegistry::new(metrics.clone());
        let (a, _peer) = duplex(64);
        let worker = registry.register(a, "worker-a".to_string()).await;

        registry.retire(&worker, "test").await;
        registry.retire(&worker, "test again").await;

        assert!(!worker.is_healthy());
        assert!(registry.is_empty().await);
        assert!(!registry.unregister(worker.id()).await);
        assert_eq!(metrics.snapshot().workers_unregistered, 1);
    }
}
