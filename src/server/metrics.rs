use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide coordinator counters. Cloning shares the same counters.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorMetrics {
    rounds_started: Arc<AtomicU64>,
    rounds_complete: Arc<AtomicU64>,
    rounds_partial: Arc<AtomicU64>,
    rounds_rejected: Arc<AtomicU64>,
    tasks_dispatched: Arc<AtomicU64>,
    tasks_completed: Arc<AtomicU64>,
    tasks_requeued: Arc<AtomicU64>,
    tasks_undefined: Arc<AtomicU64>,
    workers_registered: Arc<AtomicU64>,
    workers_unregistered: Arc<AtomicU64>,
}

/// Point-in-time copy of [`CoordinatorMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rounds_started: u64,
    pub rounds_complete: u64,
    pub rounds_partial: u64,
    pub rounds_rejected: u64,
    pub tasks_dispatched: u64,
    pub tasks_completed: u64,
    pub tasks_requeued: u64,
    pub tasks_undefined: u64,
    pub workers_registered: u64,
    pub workers_unregistered: u64,
}

impl CoordinatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn round_started(&self) {
        self.rounds_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn round_complete(&self) {
        self.rounds_complete.fetch_add(1, Ordering::Relaxed);
    }

    pub fn round_partial(&self) {
        self.rounds_partial.fetch_add(1, Ordering::Relaxed);
    }

    pub fn round_rejected(&self) {
        self.rounds_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_dispatched(&self) {
        self.tasks_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_requeued(&self) {
        self.tasks_requeued.fetch_add(1, Ordering::Relaxed);
    }

    /// A worker answered a task with no finite value.
    pub fn task_undefined(&self) {
        self.tasks_undefined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_registered(&self) {
        self.workers_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_unregistered(&self) {
        self.workers_unregistered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rounds_started: self.rounds_started.load(Ordering::Relaxed),
            rounds_complete: self.rounds_complete.load(Ordering::Relaxed),
            rounds_partial: self.rounds_partial.load(Ordering::Relaxed),
            rounds_rejected: self.rounds_rejected.load(Ordering::Relaxed),
            tasks_dispatched: self.tasks_dispatched.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_requeued: self.tasks_requeued.load(Ordering::Relaxed),
            tasks_undefined: self.tasks_undefined.load(Ordering::Relaxed),
            workers_registered: self.workers_registered.load(Ordering::Relaxed),
            workers_unregistered: self.workers_unregistered.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rounds {} (complete {}, partial {}, rejected {}), tasks {} dispatched / {} completed / {} requeued / {} undefined, workers +{} -{}",
            self.rounds_started,
            self.rounds_complete,
            self.rounds_partial,
            self.rounds_rejected,
            self.tasks_dispatched,
            self.tasks_completed,
            self.tasks_requeued,
            self.tasks_undefined,
            self.workers_registered,
            self.workers_unregistered
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = CoordinatorMetrics::new();
        let other = metrics.clone();

        metrics.round_started();
        other.round_partial();
        other.task_dispatched();
        other.task_dispatched();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rounds_started, 1);
        assert_eq!(snapshot.rounds_partial, 1);
        assert_eq!(snapshot.tasks_dispatched, 2);
        assert_eq!(snapshot.rounds_complete, 0);
    }
}
