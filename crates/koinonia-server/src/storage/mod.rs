//! Storage backends
//!
//! Two implementations of the same trait family: `Database` persists to
//! embedded SQLite, `MemoryStore` keeps everything in process memory for
//! tests and ephemeral runs. Callers pick one through `open` at startup and
//! hold it as `Arc<dyn Storage>` from then on.

pub mod db;
pub mod memory;

pub use db::Database;
pub use memory::MemoryStore;

use crate::config::{Backend, StoreConfig};
use koinonia_core::{Result, Storage};
use std::sync::Arc;
use tracing::info;

/// Opens the backend named by the configuration.
pub async fn open(config: &StoreConfig) -> Result<Arc<dyn Storage>> {
    match config.backend {
        Backend::Sqlite => {
            let db = Database::new(&config.database_path).await?;
            Ok(Arc::new(db))
        }
        Backend::Memory => {
            info!("Using in-memory storage; data is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
