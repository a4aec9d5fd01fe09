//! `dyetrack-recon`: dyehouse dispatch reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded sheet cells and order candidates,
//! returns matched records and commit reports. No file or database IO; the
//! document store is reached through the [`store::OrderStore`] trait.

pub mod cache;
pub mod commit;
pub mod config;
pub mod error;
pub mod matcher;
pub mod model;
pub mod parse;
pub mod search;
pub mod session;
pub mod store;
pub mod summary;

pub use config::ImportConfig;
pub use error::{ReconError, StoreError};
pub use model::{Cell, DispatchRecord, MatchResult, OrderCandidate, RecordId, Resolution};
pub use session::{ImportSession, Step};
