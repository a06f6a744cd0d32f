//! Koinonia Core Library
//!
//! Error types and the storage port traits both backends implement.

// Re-export pure types from koinonia-types
pub use koinonia_types::*;

pub mod error;
pub mod ports;

pub use error::{Error, Result};
pub use ports::Storage;
