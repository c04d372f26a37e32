//! Ledger — the normalized, time-ordered trade history.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::trade::{Side, TradeRecord, TradeType};
use crate::fingerprint::LedgerFingerprint;

/// Immutable sequence of trades sorted by timestamp ascending.
///
/// Ties keep their original input order (stable sort), so two trades stamped
/// with the same second appear in the order the export listed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ledger {
    trades: Vec<TradeRecord>,
}

impl Ledger {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a ledger from records in input order.
    pub fn from_records(mut trades: Vec<TradeRecord>) -> Self {
        trades.sort_by_key(|t| t.timestamp);
        Self { trades }
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TradeRecord> {
        self.trades.iter()
    }

    pub fn pnls(&self) -> Vec<f64> {
        self.trades.iter().map(|t| t.closed_pnl).collect()
    }

    /// Running sum of `closed_pnl` in ledger order.
    pub fn cumulative_pnl(&self) -> Vec<f64> {
        let mut running = 0.0;
        self.trades
            .iter()
            .map(|t| {
                running += t.closed_pnl;
                running
            })
            .collect()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.trades.first().map(|t| t.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.trades.last().map(|t| t.timestamp)
    }

    pub fn fingerprint(&self) -> LedgerFingerprint {
        LedgerFingerprint::of(self)
    }

    /// A new ledger holding only the trades that pass `filter`.
    pub fn filter(&self, filter: &LedgerFilter) -> Ledger {
        Ledger {
            trades: self
                .trades
                .iter()
                .filter(|t| filter.matches(t))
                .cloned()
                .collect(),
        }
    }

    pub fn summary(&self) -> LedgerSummary {
        let fees: Vec<f64> = self.trades.iter().filter_map(|t| t.fee).collect();
        let values: Vec<f64> = self.trades.iter().filter_map(|t| t.trade_value).collect();
        let markets: BTreeSet<&str> = self
            .trades
            .iter()
            .filter_map(|t| t.market.as_deref())
            .collect();

        LedgerSummary {
            trade_count: self.trades.len(),
            first_timestamp: self.first_timestamp(),
            last_timestamp: self.last_timestamp(),
            total_fees: fees.iter().sum(),
            known_fee_count: fees.len(),
            mean_trade_value: if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            },
            market_count: markets.len(),
            side_distribution: self.side_distribution(),
            trade_type_distribution: self.trade_type_distribution(),
        }
    }

    /// Trade counts per side label. Labels with no trades are omitted.
    pub fn side_distribution(&self) -> BTreeMap<Side, usize> {
        let mut counts = BTreeMap::new();
        for trade in &self.trades {
            *counts.entry(trade.side).or_insert(0) += 1;
        }
        counts
    }

    /// Trade counts per trade type. Types with no trades are omitted.
    pub fn trade_type_distribution(&self) -> BTreeMap<TradeType, usize> {
        let mut counts = BTreeMap::new();
        for trade in &self.trades {
            *counts.entry(trade.trade_type).or_insert(0) += 1;
        }
        counts
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a TradeRecord;
    type IntoIter = std::slice::Iter<'a, TradeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

/// Selection criteria for narrowing a ledger. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerFilter {
    /// Inclusive lower bound on the trade timestamp.
    pub start: Option<NaiveDateTime>,
    /// Inclusive upper bound on the trade timestamp.
    pub end: Option<NaiveDateTime>,
    /// Case-insensitive market match.
    pub market: Option<String>,
    pub side: Option<Side>,
    pub trade_type: Option<TradeType>,
    /// Inclusive size bounds. Trades with unknown size never satisfy a size bound.
    pub min_size: Option<f64>,
    pub max_size: Option<f64>,
}

impl LedgerFilter {
    pub fn is_empty(&self) -> bool {
        *self == LedgerFilter::default()
    }

    pub fn matches(&self, trade: &TradeRecord) -> bool {
        if self.start.is_some_and(|start| trade.timestamp < start) {
            return false;
        }
        if self.end.is_some_and(|end| trade.timestamp > end) {
            return false;
        }
        if let Some(market) = &self.market {
            match &trade.market {
                Some(m) if m.eq_ignore_ascii_case(market) => {}
                _ => return false,
            }
        }
        if self.side.is_some_and(|side| trade.side != side) {
            return false;
        }
        if self.trade_type.is_some_and(|kind| trade.trade_type != kind) {
            return false;
        }
        if self.min_size.is_some() || self.max_size.is_some() {
            let Some(size) = trade.size else {
                return false;
            };
            if self.min_size.is_some_and(|min| size < min) {
                return false;
            }
            if self.max_size.is_some_and(|max| size > max) {
                return false;
            }
        }
        true
    }
}

/// Overview of a ledger's contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub trade_count: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    /// Sum over trades whose fee is known.
    pub total_fees: f64,
    pub known_fee_count: usize,
    pub mean_trade_value: Option<f64>,
    pub market_count: usize,
    pub side_distribution: BTreeMap<Side, usize>,
    pub trade_type_distribution: BTreeMap<TradeType, usize>,
}
