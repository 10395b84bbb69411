//! Error types for tablekit
//!
//! Provides a unified error type for the storage and scheduling layers.
//! The table engine itself never surfaces these from its mutators; they
//! are logged at the persistence boundary instead.

use thiserror::Error;

/// Result type alias using TableError
pub type Result<T> = std::result::Result<T, TableError>;

/// Unified error type for tablekit operations
#[derive(Debug, Error)]
pub enum TableError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage write failed for key '{key}': {reason}")]
    StorageWrite { key: String, reason: String },

    #[error("Stored value corrupted: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Record Access Errors
    // -------------------------------------------------------------------------
    #[error("Failed to read column '{column}': {reason}")]
    FieldAccess { column: String, reason: String },

    // -------------------------------------------------------------------------
    // Scheduler Errors
    // -------------------------------------------------------------------------
    #[error("Persist scheduler error: {0}")]
    Scheduler(String),
}

impl TableError {
    /// Build a field access error for a column accessor
    pub fn field(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FieldAccess {
            column: column.into(),
            reason: reason.into(),
        }
    }
}
