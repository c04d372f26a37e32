//! Metrics engine — turns a `Ledger` into a `MetricsReport` or a full
//! `LedgerAnalysis`.
//!
//! The engine is stateless between calls: it owns only its configuration and
//! the registered custom metrics, and never mutates the ledger.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tradelens_core::{Ledger, LedgerSummary, TradeRecord};

use crate::config::MetricsConfig;
use crate::metrics::{self, DrawdownDetail, PnlBreakdown, ProfitFactor};
use crate::tail_metrics::{self, TailRisk, HEADLINE_CONFIDENCE};
use crate::time_buckets::{self, DailyBucket, FrequencyDetail, HourlyBucket, MonthlyBucket};
use crate::trade_stats::{self, SizeStats};

/// Output of a custom metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(Option<f64>),
    Series(Vec<f64>),
}

impl MetricValue {
    /// Non-finite scalars become `None`; non-finite series points are
    /// removed. Returns the value and how many points were discarded.
    fn into_finite(self) -> (Self, usize) {
        match self {
            MetricValue::Scalar(Some(v)) if !v.is_finite() => (MetricValue::Scalar(None), 1),
            MetricValue::Series(values) if values.iter().any(|v| !v.is_finite()) => {
                let before = values.len();
                let kept: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
                let removed = before - kept.len();
                (MetricValue::Series(kept), removed)
            }
            other => (other, 0),
        }
    }
}

/// A user-supplied metric computed alongside the built-in ones.
pub trait LedgerMetric: Send + Sync {
    /// Key under which the value appears in `MetricsReport::custom`.
    fn name(&self) -> &str;
    fn compute(&self, ledger: &Ledger) -> MetricValue;
}

/// Adapter that lets a closure act as a `LedgerMetric`.
pub struct FnMetric<F> {
    name: String,
    f: F,
}

impl<F> FnMetric<F>
where
    F: Fn(&Ledger) -> MetricValue + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> LedgerMetric for FnMetric<F>
where
    F: Fn(&Ledger) -> MetricValue + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, ledger: &Ledger) -> MetricValue {
        (self.f)(ledger)
    }
}

/// Headline metrics with a fixed key set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub total_pnl: f64,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<ProfitFactor>,
    pub max_win: Option<f64>,
    pub max_loss: Option<f64>,
    pub max_drawdown: f64,
    pub drawdown_series: Vec<f64>,
    pub sharpe_ratio: Option<f64>,
    pub var_95: Option<f64>,
    pub cvar_95: Option<f64>,
    pub daily_counts: Vec<DailyBucket>,
    pub hourly_counts: Vec<HourlyBucket>,
    pub most_active_hour: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, MetricValue>,
}

/// One point of the cumulative PnL curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub pnl: f64,
    pub cumulative_pnl: f64,
    pub drawdown: f64,
}

/// Headline metrics plus every extended statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAnalysis {
    pub metrics: MetricsReport,
    pub equity: Vec<EquityPoint>,
    pub pnl: PnlBreakdown,
    pub drawdown: DrawdownDetail,
    pub tail_risk: TailRisk,
    pub frequency: FrequencyDetail,
    pub trade_sizes: SizeStats,
    pub best_trades: Vec<TradeRecord>,
    pub worst_trades: Vec<TradeRecord>,
    pub monthly: Vec<MonthlyBucket>,
    pub summary: LedgerSummary,
}

pub struct MetricsEngine {
    config: MetricsConfig,
    custom: Vec<Box<dyn LedgerMetric>>,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            config,
            custom: Vec::new(),
        }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Register a custom metric. A later metric with the same name replaces
    /// the earlier one in the output.
    pub fn with_metric(mut self, metric: impl LedgerMetric + 'static) -> Self {
        self.custom.push(Box::new(metric));
        self
    }

    /// Register a closure as a custom metric.
    pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Ledger) -> MetricValue + Send + Sync + 'static,
    {
        self.with_metric(FnMetric::new(name, f))
    }

    pub fn custom_metric_names(&self) -> Vec<&str> {
        self.custom.iter().map(|m| m.name()).collect()
    }

    /// Headline metrics. An empty ledger yields null/zero scalars and empty
    /// series.
    pub fn compute(&self, ledger: &Ledger) -> MetricsReport {
        let pnls = ledger.pnls();
        let cumulative = ledger.cumulative_pnl();
        self.compute_from(ledger, &pnls, &cumulative)
    }

    /// Headline metrics plus the extended breakdowns.
    pub fn analyze(&self, ledger: &Ledger) -> LedgerAnalysis {
        let pnls = ledger.pnls();
        let cumulative = ledger.cumulative_pnl();
        let metrics = self.compute_from(ledger, &pnls, &cumulative);

        let equity = ledger
            .iter()
            .zip(cumulative.iter().zip(metrics.drawdown_series.iter()))
            .map(|(trade, (&cum, &dd))| EquityPoint {
                timestamp: trade.timestamp,
                pnl: trade.closed_pnl,
                cumulative_pnl: cum,
                drawdown: dd,
            })
            .collect();

        LedgerAnalysis {
            equity,
            pnl: PnlBreakdown::compute(&pnls),
            drawdown: DrawdownDetail::compute(&cumulative),
            tail_risk: TailRisk::compute(&pnls, &self.config.confidence_levels),
            frequency: FrequencyDetail::compute(ledger),
            trade_sizes: SizeStats::compute(ledger),
            best_trades: trade_stats::best_trades(ledger, self.config.top_trades),
            worst_trades: trade_stats::worst_trades(ledger, self.config.top_trades),
            monthly: time_buckets::monthly_buckets(ledger),
            summary: ledger.summary(),
            metrics,
        }
    }

    fn compute_from(&self, ledger: &Ledger, pnls: &[f64], cumulative: &[f64]) -> MetricsReport {
        debug!(trades = ledger.len(), custom = self.custom.len(), "computing metrics");

        if cumulative.iter().any(|c| !c.is_finite()) {
            warn!(trades = ledger.len(), "cumulative pnl is not finite; amounts are out of range");
        }

        let drawdown_series = metrics::drawdown_series(cumulative);
        let hourly_counts = time_buckets::hourly_buckets(ledger);

        let mut custom = BTreeMap::new();
        for metric in &self.custom {
            let (value, discarded) = metric.compute(ledger).into_finite();
            if discarded > 0 {
                warn!(metric = metric.name(), discarded, "custom metric produced non-finite values");
            }
            custom.insert(metric.name().to_string(), value);
        }

        MetricsReport {
            total_pnl: metrics::total_pnl(pnls),
            win_rate: metrics::win_rate(pnls),
            profit_factor: metrics::profit_factor(pnls),
            max_win: metrics::max_win(pnls),
            max_loss: metrics::max_loss(pnls),
            max_drawdown: metrics::max_drawdown(&drawdown_series),
            sharpe_ratio: metrics::sharpe_ratio(pnls),
            var_95: tail_metrics::value_at_risk(pnls, HEADLINE_CONFIDENCE),
            cvar_95: tail_metrics::conditional_var(pnls, HEADLINE_CONFIDENCE),
            daily_counts: time_buckets::daily_buckets(ledger),
            most_active_hour: time_buckets::most_active_hour(&hourly_counts),
            hourly_counts,
            drawdown_series,
            custom,
        }
    }
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

impl fmt::Debug for MetricsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsEngine")
            .field("config", &self.config)
            .field("custom", &self.custom_metric_names())
            .finish()
    }
}
