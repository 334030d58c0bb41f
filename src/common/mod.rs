//! # Common Components
//!
//! Shared utilities and data structures used by the coordinator, the
//! reference worker and the reference client.
//!
//! ## Modules
//!
//! - [`messages`]: Wire message definitions and the square [`Matrix`](messages::Matrix) type
//! - [`connection`]: Length-prefixed message framing over a byte stream
//! - [`config`]: Configuration parsing utilities
//! - [`error`]: Typed framing and validation errors

pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
