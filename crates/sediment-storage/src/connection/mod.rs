//! Connection management: one serialized writer.
//!
//! Migrations assume exclusive access to the schema, so there is no read
//! pool: every operation goes through the single writer connection.

pub mod pragmas;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::Connection;
use sediment_core::config::SedimentConfig;
use sediment_core::errors::StorageError;

use self::pragmas::{apply_pragmas, enable_wal};
use crate::bootstrap;

/// Owns the writer connection and the resolved configuration.
pub struct DatabaseManager {
    writer: Mutex<Connection>,
    config: SedimentConfig,
    path: Option<PathBuf>,
}

impl DatabaseManager {
    /// Open a database at the given path with default configuration.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::open_at(path, SedimentConfig::default())
    }

    /// Open the database named by `config.database.path`.
    pub fn open_with_config(config: SedimentConfig) -> Result<Self, StorageError> {
        let path = PathBuf::from(config.database.effective_path());
        Self::open_at(&path, config)
    }

    /// Open a database at `path`, apply pragmas, run the internal bootstrap.
    pub fn open_at(path: &Path, config: SedimentConfig) -> Result<Self, StorageError> {
        let writer = Connection::open(path).map_err(|e| StorageError::Sqlite {
            message: format!("open {}: {e}", path.display()),
        })?;
        apply_pragmas(&writer, config.database.effective_busy_timeout_ms())?;
        enable_wal(&writer)?;
        bootstrap::run_bootstrap(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            config,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open_in_memory_with_config(SedimentConfig::default())
    }

    pub fn open_in_memory_with_config(config: SedimentConfig) -> Result<Self, StorageError> {
        let writer = Connection::open_in_memory().map_err(StorageError::sqlite)?;
        apply_pragmas(&writer, config.database.effective_busy_timeout_ms())?;
        bootstrap::run_bootstrap(&writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            config,
            path: None,
        })
    }

    /// Execute an operation with the serialized writer connection.
    pub fn with_writer<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<StorageError>,
    {
        let guard = self.writer.lock().map_err(|_| StorageError::Sqlite {
            message: "write lock poisoned".to_string(),
        })?;
        f(&guard)
    }

    pub fn config(&self) -> &SedimentConfig {
        &self.config
    }

    /// Get the database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a WAL checkpoint (TRUNCATE mode) after a large migration pass.
    pub fn checkpoint(&self) -> Result<(), StorageError> {
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(StorageError::sqlite)
        })
    }
}
