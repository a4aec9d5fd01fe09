use std::path::PathBuf;

use thiserror::Error;

use dyetrack_recon::StoreError;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to open spreadsheet {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("spreadsheet contains no sheets")]
    NoSheets,
    #[error("failed to read sheet '{sheet}': {message}")]
    Sheet { sheet: String, message: String },
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("batch not found: {0}")]
    BatchNotFound(i64),
    #[error("order not found: {0}")]
    OrderNotFound(String),
    #[error("unsupported store schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },
    #[error("batch {batch_id} has an unreadable event: {message}")]
    CorruptEvent { batch_id: i64, message: String },
}

impl From<IoError> for StoreError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::OrderNotFound(path) => StoreError::NotFound(path),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
