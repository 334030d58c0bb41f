//! # Coordinator Components
//!
//! - [`coordinator`]: The two listeners and their accept loops
//! - [`session`]: One client request per connection
//! - [`distribution`]: Splits a matrix into per-cell tasks and fans them out
//! - [`registry`]: The set of connected workers
//! - [`metrics`]: Atomic counters shared across sessions

pub mod coordinator;
pub mod distribution;
pub mod metrics;
pub mod registry;
pub mod session;

pub use coordinator::Coordinator;
pub use distribution::{DistributionEngine, RoundOutcome};
pub use metrics::CoordinatorMetrics;
pub use registry::{WorkerHandle, WorkerRegistry};
