//! Distributed cofactor-matrix computation over TCP.
//!
//! A coordinator accepts workers on one port and clients on another. Each
//! client request is split into one task per matrix cell, the tasks are
//! handed out to the connected workers, and the returned cofactors are
//! assembled into the response.

pub mod client;
pub mod common;
pub mod server;
pub mod worker;

pub use common::messages::{CalculationRequest, CalculationResponse, Cell, Matrix};
pub use server::Coordinator;
