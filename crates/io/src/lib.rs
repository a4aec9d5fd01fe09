// File I/O operations

pub mod error;
pub mod export;
pub mod store;
pub mod xlsx;

pub use error::IoError;
pub use store::SqliteStore;

/// SQLite order store schema version.
/// Increment when the schema changes in a way that old versions can't read.
pub const STORE_SCHEMA_VERSION: u32 = 1;
