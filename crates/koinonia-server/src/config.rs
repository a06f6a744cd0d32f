//! Server configuration loaded from environment variables

use koinonia_core::{Error, Result};
use std::path::PathBuf;
use tracing::info;

/// Which storage backend to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: Backend,
    pub database_path: String,
    pub data_dir: PathBuf,
    pub sweep_interval_hours: u64,
}

impl StoreConfig {
    /// Reads `KOINONIA_BACKEND`, `DATA_DIR`, `DATABASE_PATH` and
    /// `SWEEP_INTERVAL_HOURS`, falling back to sensible defaults.
    pub fn from_env() -> Result<Self> {
        let backend = match std::env::var("KOINONIA_BACKEND") {
            Ok(value) => match value.as_str() {
                "sqlite" => Backend::Sqlite,
                "memory" => Backend::Memory,
                other => {
                    return Err(Error::Config(format!(
                        "KOINONIA_BACKEND must be 'sqlite' or 'memory', got '{}'",
                        other
                    )))
                }
            },
            Err(_) => Backend::Sqlite,
        };

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/opt/koinonia/data"));
        info!("Data directory: {}", data_dir.display());

        let database_path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| {
            let path = data_dir.join("koinonia.db");
            path.to_string_lossy().to_string()
        });

        let sweep_interval_hours = match std::env::var("SWEEP_INTERVAL_HOURS") {
            Ok(value) => match value.parse::<u64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(Error::Config(format!(
                        "SWEEP_INTERVAL_HOURS must be a positive integer, got '{}'",
                        value
                    )))
                }
            },
            Err(_) => 24,
        };

        Ok(Self {
            backend,
            database_path,
            data_dir,
            sweep_interval_hours,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The one test that touches process-global env vars; keep it that way so
    // parallel tests cannot race on them.
    #[test]
    fn from_env_reads_backend_and_paths() {
        std::env::set_var("KOINONIA_BACKEND", "memory");
        std::env::set_var("DATA_DIR", "/tmp/koinonia-test");
        std::env::set_var("DATABASE_PATH", "/tmp/koinonia-test/custom.db");
        std::env::set_var("SWEEP_INTERVAL_HOURS", "6");

        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.database_path, "/tmp/koinonia-test/custom.db");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/koinonia-test"));
        assert_eq!(config.sweep_interval_hours, 6);

        std::env::set_var("KOINONIA_BACKEND", "imaginary");
        assert!(StoreConfig::from_env().is_err());

        // The sweep interval must be non-zero.
        std::env::set_var("KOINONIA_BACKEND", "memory");
        std::env::set_var("SWEEP_INTERVAL_HOURS", "0");
        assert!(StoreConfig::from_env().is_err());

        std::env::remove_var("KOINONIA_BACKEND");
        std::env::remove_var("DATA_DIR");
        std::env::remove_var("DATABASE_PATH");
        std::env::remove_var("SWEEP_INTERVAL_HOURS");
    }
}
