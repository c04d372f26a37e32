//! TradeLens Core — domain types, ledger normalization, fingerprinting.
//!
//! This crate holds everything that happens before analysis:
//! - Domain types (trade records, side and role labels, the ledger)
//! - The canonical trade schema and its header alias table
//! - Normalization of raw tabular rows into a time-ordered ledger
//! - Ledger fingerprinting for report identity

pub mod domain;
pub mod fingerprint;
pub mod normalize;
pub mod schema;

pub use domain::{Ledger, LedgerFilter, LedgerSummary, Role, Side, TradeRecord, TradeType};
pub use fingerprint::LedgerFingerprint;
pub use normalize::{
    normalize, DataQuality, DropReason, NormalizeError, NormalizeStats, Normalized, RawTable,
};
pub use schema::{ColumnMap, Field};
