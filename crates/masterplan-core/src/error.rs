//! Error types for the persistence layer and process start-up.
//!
//! Mutators on [`crate::MasterPlanStore`] never surface these; storage faults are absorbed and
//! logged by [`crate::PersistenceAdapter`]. They are returned only when opening a backend or
//! loading configuration.

use thiserror::Error;

/// Faults raised by a [`crate::KeyValueStore`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),

    #[error("failed to encode persisted value: {0}")]
    Encode(#[from] serde_json::Error),

    /// The snapshot for one mutation would not fit in the configured quota.
    #[error("storage quota exceeded: snapshot needs {needed} bytes, quota is {quota}")]
    QuotaExceeded { needed: usize, quota: usize },

    /// The backend refuses writes (closed database or injected failure).
    #[error("storage is closed")]
    Closed,
}

/// Start-up errors for binaries embedding the store.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type StorageResult<T> = Result<T, StorageError>;
