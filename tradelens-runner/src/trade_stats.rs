//! Per-trade distributions — size and notional statistics, top/bottom trades.

use serde::{Deserialize, Serialize};
use tradelens_core::{Ledger, TradeRecord};

use crate::metrics::{mean, sample_std};
use crate::tail_metrics::percentile;

/// Summary of a set of known (non-missing) values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub total: f64,
}

impl Distribution {
    /// `None` when there is no value to describe.
    pub fn of(values: &[f64]) -> Option<Self> {
        Some(Self {
            count: values.len(),
            mean: mean(values)?,
            std: sample_std(values),
            min: values.iter().copied().reduce(f64::min)?,
            max: values.iter().copied().reduce(f64::max)?,
            median: percentile(values, 0.5)?,
            total: values.iter().sum(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeStats {
    pub size: Option<Distribution>,
    pub trade_value: Option<Distribution>,
}

impl SizeStats {
    pub fn compute(ledger: &Ledger) -> Self {
        let sizes: Vec<f64> = ledger.iter().filter_map(|t| t.size).collect();
        let values: Vec<f64> = ledger.iter().filter_map(|t| t.trade_value).collect();
        Self {
            size: Distribution::of(&sizes),
            trade_value: Distribution::of(&values),
        }
    }
}

/// The `n` highest-pnl trades, best first. Ties keep ledger order.
pub fn best_trades(ledger: &Ledger, n: usize) -> Vec<TradeRecord> {
    let mut trades: Vec<&TradeRecord> = ledger.iter().collect();
    trades.sort_by(|a, b| b.closed_pnl.total_cmp(&a.closed_pnl));
    trades.into_iter().take(n).cloned().collect()
}

/// The `n` lowest-pnl trades, worst first. Ties keep ledger order.
pub fn worst_trades(ledger: &Ledger, n: usize) -> Vec<TradeRecord> {
    let mut trades: Vec<&TradeRecord> = ledger.iter().collect();
    trades.sort_by(|a, b| a.closed_pnl.total_cmp(&b.closed_pnl));
    trades.into_iter().take(n).cloned().collect()
}
