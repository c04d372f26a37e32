//! Domain types for TradeLens

pub mod ledger;
pub mod trade;

pub use ledger::{Ledger, LedgerFilter, LedgerSummary};
pub use trade::{Role, Side, TradeRecord, TradeType};
