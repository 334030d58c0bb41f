//! # Reference Client
//!
//! [`ClientCore`] submits one calculation request and returns the
//! coordinator's response. [`random_matrix`] and [`load_matrix`] produce the
//! input.

pub mod client;

pub use client::{load_matrix, random_matrix, ClientCore};
