//! # Reference Worker
//!
//! - [`worker`]: Connection loop answering tasks from the coordinator
//! - [`cofactor`]: Minor extraction and determinant

pub mod cofactor;
pub mod worker;

pub use worker::WorkerCore;
