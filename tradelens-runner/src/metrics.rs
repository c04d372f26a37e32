//! Performance metrics — pure functions over per-trade PnL.
//!
//! Every metric is a pure function: PnL list or cumulative series in, scalar
//! or series out. Undefined results are `None`, never NaN or a stand-in zero.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Gross profit over gross loss.
///
/// `Infinite` when there are winners but no losers. Serialized as a number,
/// or the string `"inf"` for the infinite case (JSON has no infinity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitFactor {
    Finite(f64),
    Infinite,
}

impl ProfitFactor {
    pub fn is_infinite(&self) -> bool {
        matches!(self, ProfitFactor::Infinite)
    }

    pub fn map_finite(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            ProfitFactor::Finite(v) => ProfitFactor::Finite(f(v)),
            ProfitFactor::Infinite => ProfitFactor::Infinite,
        }
    }
}

impl Serialize for ProfitFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ProfitFactor::Finite(v) => serializer.serialize_f64(*v),
            ProfitFactor::Infinite => serializer.serialize_str("inf"),
        }
    }
}

impl<'de> Deserialize<'de> for ProfitFactor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(ProfitFactor::Finite(v)),
            Repr::Text(s) if s.eq_ignore_ascii_case("inf") || s.eq_ignore_ascii_case("infinity") => {
                Ok(ProfitFactor::Infinite)
            }
            Repr::Text(s) => Err(de::Error::custom(format!("invalid profit factor '{s}'"))),
        }
    }
}

/// Win/loss decomposition of a trade list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlBreakdown {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub gross_profit: f64,
    /// Absolute value of the summed losses.
    pub gross_loss: f64,
    pub average_pnl: Option<f64>,
    /// Sample standard deviation (n - 1).
    pub pnl_std: Option<f64>,
    pub average_win: Option<f64>,
    /// Mean of losing trades, negative.
    pub average_loss: Option<f64>,
    /// average_win / |average_loss|.
    pub payoff_ratio: Option<f64>,
}

impl PnlBreakdown {
    pub fn compute(pnls: &[f64]) -> Self {
        let winners: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
        let losers: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();
        let gross_profit: f64 = winners.iter().sum();
        let gross_loss: f64 = losers.iter().sum::<f64>().abs();

        let average_win = mean(&winners);
        let average_loss = mean(&losers);
        let payoff_ratio = match (average_win, average_loss) {
            (Some(w), Some(l)) => Some(w / l.abs()),
            _ => None,
        };

        Self {
            total_trades: pnls.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            breakeven_trades: pnls.len() - winners.len() - losers.len(),
            gross_profit,
            gross_loss,
            average_pnl: mean(pnls),
            pnl_std: sample_std(pnls),
            average_win,
            average_loss,
            payoff_ratio,
        }
    }
}

/// Drawdown diagnostics over the cumulative PnL series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownDetail {
    pub max_drawdown: f64,
    pub current_drawdown: f64,
    /// Deepest drawdown as a percentage of its running peak. Only points
    /// whose peak is positive count.
    pub max_drawdown_pct: Option<f64>,
    pub current_drawdown_pct: Option<f64>,
    /// Total PnL over |max drawdown|.
    pub calmar_ratio: Option<f64>,
    /// Highest cumulative PnL reached.
    pub peak_pnl: Option<f64>,
    pub current_pnl: Option<f64>,
    /// Number of points sitting below the running peak.
    pub points_in_drawdown: usize,
    /// Longest run of consecutive points below the running peak.
    pub longest_drawdown: usize,
}

impl DrawdownDetail {
    pub fn compute(cumulative: &[f64]) -> Self {
        let drawdowns = drawdown_series(cumulative);

        let mut longest = 0;
        let mut current_run = 0;
        for dd in &drawdowns {
            if *dd < 0.0 {
                current_run += 1;
                longest = longest.max(current_run);
            } else {
                current_run = 0;
            }
        }

        let pcts = drawdown_pct_series(cumulative);
        let max_dd = max_drawdown(&drawdowns);

        Self {
            max_drawdown: max_dd,
            current_drawdown: drawdowns.last().copied().unwrap_or(0.0),
            max_drawdown_pct: pcts.iter().flatten().copied().reduce(f64::min),
            current_drawdown_pct: pcts.last().copied().flatten(),
            calmar_ratio: cumulative.last().and_then(|&total| calmar_ratio(total, max_dd)),
            peak_pnl: cumulative.iter().copied().reduce(f64::max),
            current_pnl: cumulative.last().copied(),
            points_in_drawdown: drawdowns.iter().filter(|dd| **dd < 0.0).count(),
            longest_drawdown: longest,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn total_pnl(pnls: &[f64]) -> f64 {
    pnls.iter().sum()
}

/// Winners over non-breakeven trades. `None` when every trade (or no trade)
/// closed flat.
pub fn win_rate(pnls: &[f64]) -> Option<f64> {
    let winners = pnls.iter().filter(|p| **p > 0.0).count();
    let decided = pnls.iter().filter(|p| **p != 0.0).count();
    if decided == 0 {
        return None;
    }
    Some(winners as f64 / decided as f64)
}

/// Gross profit / |gross loss|.
///
/// `None` for no trades or when every trade closed flat; `Infinite` when
/// there are winners and no losers; `Finite(0.0)` for losers only.
pub fn profit_factor(pnls: &[f64]) -> Option<ProfitFactor> {
    let gross_profit: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|p| **p < 0.0).sum::<f64>().abs();
    let has_loser = pnls.iter().any(|p| *p < 0.0);
    let has_winner = pnls.iter().any(|p| *p > 0.0);

    match (has_winner, has_loser) {
        (_, true) => Some(ProfitFactor::Finite(gross_profit / gross_loss)),
        (true, false) => Some(ProfitFactor::Infinite),
        (false, false) => None,
    }
}

pub fn max_win(pnls: &[f64]) -> Option<f64> {
    pnls.iter().copied().reduce(f64::max)
}

pub fn max_loss(pnls: &[f64]) -> Option<f64> {
    pnls.iter().copied().reduce(f64::min)
}

/// `cumulative[i] - max(cumulative[0..=i])`; every value is ≤ 0.
pub fn drawdown_series(cumulative: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    cumulative
        .iter()
        .map(|&c| {
            peak = peak.max(c);
            c - peak
        })
        .collect()
}

/// Drawdown at each point as a percentage of the running peak; `None` where
/// the peak is not positive.
pub fn drawdown_pct_series(cumulative: &[f64]) -> Vec<Option<f64>> {
    let mut peak = f64::NEG_INFINITY;
    cumulative
        .iter()
        .map(|&c| {
            peak = peak.max(c);
            if peak > 0.0 {
                finite((c - peak) / peak * 100.0)
            } else {
                None
            }
        })
        .collect()
}

/// Most negative drawdown; 0.0 for an empty or never-declining series.
pub fn max_drawdown(drawdowns: &[f64]) -> f64 {
    drawdowns.iter().copied().fold(0.0, f64::min)
}

/// Per-trade Sharpe ratio: mean / population standard deviation.
///
/// No annualization and no risk-free rate. `None` with fewer than two trades
/// or when every trade has the same PnL.
pub fn sharpe_ratio(pnls: &[f64]) -> Option<f64> {
    if pnls.len() < 2 || pnls.iter().all(|p| *p == pnls[0]) {
        return None;
    }
    let std = population_std(pnls)?;
    if !(std > 0.0) {
        return None;
    }
    finite(mean(pnls)? / std)
}

/// Total PnL over |max drawdown|, not annualized. `None` without a drawdown.
pub fn calmar_ratio(total_pnl: f64, max_drawdown: f64) -> Option<f64> {
    if max_drawdown == 0.0 {
        return None;
    }
    finite(total_pnl / max_drawdown.abs())
}

// ─── Helpers ────────────────────────────────────────────────────────

/// `Some(v)` only for finite values.
pub(crate) fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub(crate) fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}
