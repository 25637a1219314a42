//! Error types for board store operations.

use reunion_board_core::event::Table;
use thiserror::Error;

/// Errors that can occur during `MemoryStore` operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No row matched the given key.
    #[error("{table} row not found: {key}")]
    RowNotFound {
        /// Table that was searched.
        table: Table,
        /// Key that did not match.
        key: String,
    },

    /// The write would leave a dangling reference.
    #[error("Rejected write: {0}")]
    Rejected(String),

    /// Failed to encode or decode the data file.
    #[error("Failed to encode board data: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to acquire the table lock.
    #[error("Store lock error")]
    Lock,

    /// Other unclassified error.
    #[error("Other error: {0}")]
    Other(String),
}

impl StoreError {
    pub(crate) fn not_found(table: Table, key: impl ToString) -> Self {
        Self::RowNotFound {
            table,
            key: key.to_string(),
        }
    }
}
