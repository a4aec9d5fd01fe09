use thiserror::Error;

use crate::model::RecordId;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Column layout validation error (duplicate column, overlap with machine window, ...).
    #[error("layout validation error: {0}")]
    LayoutValidation(String),
    /// A manual pick referenced a row that is not part of the import.
    #[error("unknown record: row {0}")]
    UnknownRecord(RecordId),
    /// The session is not in a step that allows the operation.
    #[error("invalid step: cannot {action} while {step}")]
    InvalidStep { action: &'static str, step: String },
    /// The order store failed while loading candidates.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by an [`crate::store::OrderStore`] implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("order not found: {0}")]
    NotFound(String),
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("store backend error: {0}")]
    Backend(String),
}
