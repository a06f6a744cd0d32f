//! Koinonia server library
//!
//! Storage backends and domain services for the community prayer platform.
//! Everything an HTTP layer needs sits behind `Arc<dyn Storage>` plus the
//! service structs; the binary in `main.rs` runs the maintenance daemon.

pub mod config;
pub mod services;
pub mod storage;

pub use config::{Backend, StoreConfig};
pub use storage::{open, Database, MemoryStore};
