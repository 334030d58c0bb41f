//! # Task Distribution Engine
//!
//! Splits a matrix into one task per cell and fans the tasks out over the
//! workers registered when the round starts.
//!
//! ## Round Flow
//!
//! ```text
//! distribute(matrix)
//!   ├─ board: N² tasks, Pending, row-major
//!   ├─ snapshot registry ── empty? ──> NoCapacity
//!   ├─ one puller per worker:
//!   │     lock connection → claim task → send Task → await PartialResult
//!   │     ok      → Completed, keep result locally
//!   │     no value → Completed, cell left unset, worker kept
//!   │     failure → back to Pending, worker retired, puller stops
//!   ├─ join pullers, merge their results into the result matrix
//!   └─ Complete(matrix) | Partial { matrix, missing }
//! ```
//!
//! Claiming is first come, first served: whichever puller gets the board
//! lock next takes the oldest pending task. A slow worker simply handles
//! fewer cells.

use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout_at, Instant};

use crate::common::messages::{Cell, Matrix, PartialResult, Task};
use crate::server::metrics::CoordinatorMetrics;
use crate::server::registry::{WorkerHandle, WorkerId, WorkerRegistry};

/// How a round ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Every cell received a result.
    Complete(Matrix),
    /// Some cells never received a value; they are left at zero.
    Partial { matrix: Matrix, missing: usize },
    /// No workers were registered, nothing was sent.
    NoCapacity,
}

impl RoundOutcome {
    /// The assembled matrix, if the round produced one.
    pub fn into_matrix(self) -> Option<Matrix> {
        match self {
            RoundOutcome::Complete(matrix) | RoundOutcome::Partial { matrix, .. } => Some(matrix),
            RoundOutcome::NoCapacity => None,
        }
    }

    pub fn missing(&self) -> usize {
        match self {
            RoundOutcome::Partial { missing, .. } => *missing,
            _ => 0,
        }
    }
}

// ============================================================================
// TASK BOARD - per-round task states
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum TaskState {
    Pending,
    InFlight { worker: WorkerId, deadline: Instant },
    Completed,
}

enum Claim {
    Task { cell: Cell, deadline: Instant },
    /// Nothing pending, but a task in flight may still come back.
    Wait,
    /// Nothing pending and nothing in flight.
    Drained,
}

struct BoardState {
    size: usize,
    pending: VecDeque<Cell>,
    states: Vec<TaskState>,
    in_flight: usize,
}

impl BoardState {
    fn index(&self, cell: Cell) -> usize {
        cell.row * self.size + cell.column
    }
}

struct TaskBoard {
    state: Mutex<BoardState>,
    /// Signalled whenever an in-flight task completes or is requeued.
    changed: Notify,
}

impl TaskBoard {
    fn new(matrix: &Matrix) -> Self {
        let pending: VecDeque<Cell> = matrix.cells().collect();
        let states = vec![TaskState::Pending; pending.len()];
        Self {
            state: Mutex::new(BoardState {
                size: matrix.size(),
                pending,
                states,
                in_flight: 0,
            }),
            changed: Notify::new(),
        }
    }

    async fn claim(&self, worker: WorkerId, task_timeout: Duration) -> Claim {
        let mut state = self.state.lock().await;
        match state.pending.pop_front() {
            Some(cell) => {
                let deadline = Instant::now() + task_timeout;
                let index = state.index(cell);
                state.states[index] = TaskState::InFlight { worker, deadline };
                state.in_flight += 1;
                Claim::Task { cell, deadline }
            }
            None if state.in_flight > 0 => Claim::Wait,
            None => Claim::Drained,
        }
    }

    /// Mark an in-flight task done. Returns `false` if `worker` did not hold it.
    async fn complete(&self, cell: Cell, worker: WorkerId) -> bool {
        let mut state = self.state.lock().await;
        let index = state.index(cell);
        let held = matches!(
            state.states[index],
            TaskState::InFlight { worker: holder, .. } if holder == worker
        );
        if held {
            state.states[index] = TaskState::Completed;
            state.in_flight -= 1;
        }
        drop(state);
        self.changed.notify_waiters();
        held
    }

    /// Put an in-flight task back at the end of the queue.
    async fn release(&self, cell: Cell) {
        let mut state = self.state.lock().await;
        let index = state.index(cell);
        if let TaskState::InFlight { worker, deadline } = state.states[index] {
            debug!(
                "Releasing task {} held by worker {} ({:?} before deadline)",
                cell,
                worker,
                deadline.saturating_duration_since(Instant::now())
            );
            state.states[index] = TaskState::Pending;
            state.in_flight -= 1;
            state.pending.push_back(cell);
        }
        drop(state);
        self.changed.notify_waiters();
    }
}

// ============================================================================
// DISTRIBUTION ENGINE
// ============================================================================

/// Shared state of one running round.
struct Round {
    matrix: Arc<Matrix>,
    board: TaskBoard,
    completed: AtomicUsize,
    task_timeout: Duration,
    registry: Arc<WorkerRegistry>,
    metrics: CoordinatorMetrics,
}

/// Runs distribution rounds against a shared [`WorkerRegistry`].
#[derive(Clone)]
pub struct DistributionEngine {
    registry: Arc<WorkerRegistry>,
    metrics: CoordinatorMetrics,
    /// Deadline for one worker to answer one task
    task_timeout: Duration,
}

impl DistributionEngine {
    pub fn new(
        registry: Arc<WorkerRegistry>,
        metrics: CoordinatorMetrics,
        task_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            metrics,
            task_timeout,
        }
    }

    /// Compute every cell of `matrix` on the currently registered workers.
    ///
    /// Returns [`RoundOutcome::NoCapacity`] without sending anything if no
    /// worker is registered. A round that loses tasks (every worker that could
    /// take them failed) still returns the partially filled matrix.
    pub async fn distribute(&self, matrix: Matrix) -> RoundOutcome {
        let matrix = Arc::new(matrix);
        let board = TaskBoard::new(&matrix);
        let expected = matrix.cell_count();

        let workers = self.registry.snapshot().await;
        self.metrics.round_started();
        if workers.is_empty() {
            self.metrics.round_rejected();
            error!("❌ No workers available to perform the calculation");
            return RoundOutcome::NoCapacity;
        }

        info!(
            "🧮 Distributing {} tasks of a {}x{} matrix across {} workers",
            expected,
            matrix.size(),
            matrix.size(),
            workers.len()
        );

        let round = Arc::new(Round {
            matrix: matrix.clone(),
            board,
            completed: AtomicUsize::new(0),
            task_timeout: self.task_timeout,
            registry: self.registry.clone(),
            metrics: self.metrics.clone(),
        });

        let pullers: Vec<_> = workers
            .into_iter()
            .map(|worker| tokio::spawn(run_puller(worker, round.clone())))
            .collect();

        let mut result = Matrix::zeros_like(&matrix);
        for puller in pullers {
            match puller.await {
                Ok(partials) => {
                    for (cell, value) in partials {
                        result.set(cell, value);
                    }
                }
                Err(e) => error!("❌ Puller task failed: {}", e),
            }
        }

        let completed = round.completed.load(Ordering::SeqCst);
        if completed == expected {
            self.metrics.round_complete();
            RoundOutcome::Complete(result)
        } else {
            self.metrics.round_partial();
            warn!(
                "⚠️  Calculation might be incomplete. Expected {}, got {}",
                expected, completed
            );
            RoundOutcome::Partial {
                matrix: result,
                missing: expected.saturating_sub(completed),
            }
        }
    }
}

/// Feed tasks to one worker until the board drains or the worker fails.
///
/// Results are kept locally and handed back when the puller ends, so pullers
/// never contend on the result matrix.
async fn run_puller(worker: Arc<WorkerHandle>, round: Arc<Round>) -> Vec<(Cell, f64)> {
    let mut results = Vec::new();

    loop {
        // Registered before claiming so a wakeup between claim and wait is not lost
        let changed = round.board.changed.notified();

        if !worker.is_healthy() {
            break;
        }
        let mut conn = worker.connection().await;
        // Another round may have retired the worker while we waited for the lock
        if !worker.is_healthy() {
            break;
        }

        let (cell, deadline) = match round.board.claim(worker.id(), round.task_timeout).await {
            Claim::Task { cell, deadline } => (cell, deadline),
            Claim::Wait => {
                drop(conn);
                changed.await;
                continue;
            }
            Claim::Drained => break,
        };

        let task = Task::new(cell, round.matrix.clone());
        round.metrics.task_dispatched();
        debug!("📤 Task {} → worker {}", cell, worker.id());

        let exchange = async {
            conn.write_message(&task).await?;
            conn.read_message::<PartialResult>().await
        };

        let failure = match timeout_at(deadline, exchange).await {
            Ok(Ok(Some(reply))) if reply.cell() == cell => {
                if round.board.complete(cell, worker.id()).await {
                    match reply.cofactor {
                        Some(value) => {
                            round.completed.fetch_add(1, Ordering::SeqCst);
                            round.metrics.task_completed();
                            results.push((cell, value));
                        }
                        None => {
                            round.metrics.task_undefined();
                            warn!(
                                "⚠️  Worker {} has no finite cofactor for task {}",
                                worker.id(),
                                cell
                            );
                        }
                    }
                }
                continue;
            }
            Ok(Ok(Some(reply))) => format!("replied for cell {} to task {}", reply.cell(), cell),
            Ok(Ok(None)) => "connection closed".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no reply for task {} before deadline", cell),
        };

        drop(conn);
        round.board.release(cell).await;
        round.metrics.task_requeued();
        warn!("🔁 Task {} requeued", cell);
        round.registry.retire(&worker, &failure).await;
        break;
    }

    results
}
