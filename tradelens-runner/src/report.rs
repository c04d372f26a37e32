//! Report assembly — shapes a `LedgerAnalysis` into the persisted report.
//!
//! Assembly adds no new statistics. It rounds every float to the configured
//! precision, formats timestamps and dates as strings, and attaches the
//! `meta` section. Nothing time-dependent is embedded, so the same ledger and
//! config always produce byte-identical JSON.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tradelens_core::{
    DataQuality, Ledger, LedgerSummary, NormalizeStats, Role, Side, TradeRecord, TradeType,
};

use crate::config::ReportConfig;
use crate::engine::{LedgerAnalysis, MetricValue, MetricsReport};
use crate::metrics::{DrawdownDetail, PnlBreakdown, ProfitFactor};
use crate::tail_metrics::{TailRisk, VarEstimate};
use crate::time_buckets::{FrequencyDetail, HourlyBucket, MonthlyBucket, WeekdayBucket};
use crate::trade_stats::{Distribution, SizeStats};

/// Current report schema version. Bump on incompatible layout changes.
pub const SCHEMA_VERSION: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Identity and provenance of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMeta {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Label of the input, usually the file name.
    pub source: String,
    pub ledger_fingerprint: String,
    pub rows_read: usize,
    pub rows_dropped: usize,
    #[serde(default)]
    pub data_quality: DataQuality,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ReportMeta {
    /// Meta for a ledger that was built without a normalization pass.
    pub fn for_ledger(source: impl Into<String>, ledger: &Ledger) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            source: source.into(),
            ledger_fingerprint: ledger.fingerprint().0,
            rows_read: ledger.len(),
            rows_dropped: 0,
            data_quality: DataQuality::default(),
        }
    }

    pub fn with_stats(mut self, stats: &NormalizeStats) -> Self {
        self.rows_read = stats.rows_read;
        self.rows_dropped = stats.rows_dropped;
        self.data_quality = stats.quality.clone();
        self
    }
}

// ─── Report layout ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metrics: MetricsSection,
    pub pnl: PnlBreakdown,
    pub drawdown: DrawdownDetail,
    pub tail_risk: TailRisk,
    pub frequency: FrequencyDetail,
    pub trade_sizes: SizeStats,
    pub best_trades: Vec<TradeRow>,
    pub worst_trades: Vec<TradeRow>,
    pub monthly: Vec<MonthRow>,
    pub equity: Vec<EquityRow>,
    pub summary: SummarySection,
    pub meta: ReportMeta,
}

/// `MetricsReport` with formatted dates and rounded floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSection {
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
    pub daily_counts: Vec<DailyRow>,
    pub hourly_counts: Vec<HourlyBucket>,
    pub most_active_hour: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, MetricValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: String,
    pub trade_count: usize,
    pub pnl: f64,
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    pub timestamp: String,
    pub market: Option<String>,
    pub side: Side,
    pub role: Role,
    pub closed_pnl: f64,
    /// Closed PnL minus fee, when the fee is known.
    pub net_pnl: Option<f64>,
    pub trade_value: Option<f64>,
    pub size: Option<f64>,
    pub price: Option<f64>,
    pub fee: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRow {
    /// `YYYY-MM`
    pub month: String,
    pub trade_count: usize,
    pub pnl: f64,
    pub mean_pnl: f64,
    pub traded_value: f64,
    pub cumulative_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityRow {
    pub index: usize,
    pub timestamp: String,
    pub pnl: f64,
    pub cumulative_pnl: f64,
    pub drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySection {
    pub trade_count: usize,
    pub first_timestamp: Option<String>,
    pub last_timestamp: Option<String>,
    pub total_fees: f64,
    pub known_fee_count: usize,
    pub mean_trade_value: Option<f64>,
    pub market_count: usize,
    pub side_distribution: BTreeMap<Side, usize>,
    pub trade_type_distribution: BTreeMap<TradeType, usize>,
}

// ─── Assembly ───────────────────────────────────────────────────────

/// Shape an analysis into a report. `config` is expected to be validated.
pub fn assemble(analysis: &LedgerAnalysis, meta: &ReportMeta, config: &ReportConfig) -> Report {
    let shaper = Shaper {
        precision: config.precision,
        timestamp_format: &config.timestamp_format,
    };

    Report {
        metrics: shaper.metrics(&analysis.metrics),
        pnl: analysis.pnl.rounded(&shaper),
        drawdown: analysis.drawdown.rounded(&shaper),
        tail_risk: analysis.tail_risk.rounded(&shaper),
        frequency: analysis.frequency.rounded(&shaper),
        trade_sizes: analysis.trade_sizes.rounded(&shaper),
        best_trades: analysis.best_trades.iter().map(|t| shaper.trade(t)).collect(),
        worst_trades: analysis.worst_trades.iter().map(|t| shaper.trade(t)).collect(),
        monthly: analysis.monthly.iter().map(|m| shaper.month(m)).collect(),
        equity: analysis
            .equity
            .iter()
            .enumerate()
            .map(|(index, p)| EquityRow {
                index,
                timestamp: shaper.timestamp(p.timestamp),
                pnl: shaper.f(p.pnl),
                cumulative_pnl: shaper.f(p.cumulative_pnl),
                drawdown: shaper.f(p.drawdown),
            })
            .collect(),
        summary: shaper.summary(&analysis.summary),
        meta: meta.clone(),
    }
}

/// Round to `precision` decimals; `-0.0` becomes `0.0`.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;
    if !rounded.is_finite() {
        // value * factor overflowed; the value has no fractional digits left anyway
        return if value == 0.0 { 0.0 } else { value };
    }
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

struct Shaper<'a> {
    precision: u32,
    timestamp_format: &'a str,
}

impl Shaper<'_> {
    fn f(&self, v: f64) -> f64 {
        round_to(v, self.precision)
    }

    fn opt(&self, v: Option<f64>) -> Option<f64> {
        v.map(|x| self.f(x))
    }

    fn series(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.f(*v)).collect()
    }

    fn timestamp(&self, ts: NaiveDateTime) -> String {
        ts.format(self.timestamp_format).to_string()
    }

    fn metrics(&self, m: &MetricsReport) -> MetricsSection {
        MetricsSection {
            total_pnl: self.f(m.total_pnl),
            win_rate: self.opt(m.win_rate),
            profit_factor: m.profit_factor.map(|pf| pf.map_finite(|v| self.f(v))),
            max_win: self.opt(m.max_win),
            max_loss: self.opt(m.max_loss),
            max_drawdown: self.f(m.max_drawdown),
            drawdown_series: self.series(&m.drawdown_series),
            sharpe_ratio: self.opt(m.sharpe_ratio),
            var_95: self.opt(m.var_95),
            cvar_95: self.opt(m.cvar_95),
            daily_counts: m
                .daily_counts
                .iter()
                .map(|d| DailyRow {
                    date: d.date.format(DATE_FORMAT).to_string(),
                    trade_count: d.trade_count,
                    pnl: self.f(d.pnl),
                    win_rate: self.opt(d.win_rate),
                })
                .collect(),
            hourly_counts: m.hourly_counts.iter().map(|h| h.rounded(self)).collect(),
            most_active_hour: m.most_active_hour,
            custom: m
                .custom
                .iter()
                .map(|(k, v)| (k.clone(), v.rounded(self)))
                .collect(),
        }
    }

    fn trade(&self, t: &TradeRecord) -> TradeRow {
        TradeRow {
            timestamp: self.timestamp(t.timestamp),
            market: t.market.clone(),
            side: t.side,
            role: t.role,
            closed_pnl: self.f(t.closed_pnl),
            net_pnl: self.opt(t.net_pnl()),
            trade_value: self.opt(t.trade_value),
            size: self.opt(t.size),
            price: self.opt(t.price),
            fee: self.opt(t.fee),
        }
    }

    fn month(&self, m: &MonthlyBucket) -> MonthRow {
        MonthRow {
            month: format!("{:04}-{:02}", m.year, m.month),
            trade_count: m.trade_count,
            pnl: self.f(m.pnl),
            mean_pnl: self.f(m.mean_pnl),
            traded_value: self.f(m.traded_value),
            cumulative_pnl: self.f(m.cumulative_pnl),
        }
    }

    fn summary(&self, s: &LedgerSummary) -> SummarySection {
        SummarySection {
            trade_count: s.trade_count,
            first_timestamp: s.first_timestamp.map(|ts| self.timestamp(ts)),
            last_timestamp: s.last_timestamp.map(|ts| self.timestamp(ts)),
            total_fees: self.f(s.total_fees),
            known_fee_count: s.known_fee_count,
            mean_trade_value: self.opt(s.mean_trade_value),
            market_count: s.market_count,
            side_distribution: s.side_distribution.clone(),
            trade_type_distribution: s.trade_type_distribution.clone(),
        }
    }
}

/// Float rounding for analysis types that appear in the report unchanged.
trait Rounded {
    fn rounded(&self, s: &Shaper<'_>) -> Self;
}

impl Rounded for PnlBreakdown {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        Self {
            gross_profit: s.f(self.gross_profit),
            gross_loss: s.f(self.gross_loss),
            average_pnl: s.opt(self.average_pnl),
            pnl_std: s.opt(self.pnl_std),
            average_win: s.opt(self.average_win),
            average_loss: s.opt(self.average_loss),
            payoff_ratio: s.opt(self.payoff_ratio),
            ..self.clone()
        }
    }
}

impl Rounded for DrawdownDetail {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        Self {
            max_drawdown: s.f(self.max_drawdown),
            current_drawdown: s.f(self.current_drawdown),
            max_drawdown_pct: s.opt(self.max_drawdown_pct),
            current_drawdown_pct: s.opt(self.current_drawdown_pct),
            calmar_ratio: s.opt(self.calmar_ratio),
            peak_pnl: s.opt(self.peak_pnl),
            current_pnl: s.opt(self.current_pnl),
            ..self.clone()
        }
    }
}

impl Rounded for VarEstimate {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        Self {
            confidence: s.f(self.confidence),
            var: s.opt(self.var),
            cvar: s.opt(self.cvar),
        }
    }
}

impl Rounded for TailRisk {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        Self {
            estimates: self.estimates.iter().map(|e| e.rounded(s)).collect(),
            skewness: s.opt(self.skewness),
            excess_kurtosis: s.opt(self.excess_kurtosis),
            sample_size: self.sample_size,
        }
    }
}

impl Rounded for HourlyBucket {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        Self {
            pnl: s.f(self.pnl),
            win_rate: s.opt(self.win_rate),
            ..self.clone()
        }
    }
}

impl Rounded for WeekdayBucket {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        Self {
            pnl: s.f(self.pnl),
            win_rate: s.opt(self.win_rate),
            ..self.clone()
        }
    }
}

impl Rounded for FrequencyDetail {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        Self {
            mean_trades_per_day: s.opt(self.mean_trades_per_day),
            weekday_counts: self.weekday_counts.iter().map(|w| w.rounded(s)).collect(),
            ..self.clone()
        }
    }
}

impl Rounded for Distribution {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        Self {
            count: self.count,
            mean: s.f(self.mean),
            std: s.opt(self.std),
            min: s.f(self.min),
            max: s.f(self.max),
            median: s.f(self.median),
            total: s.f(self.total),
        }
    }
}

impl Rounded for SizeStats {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        Self {
            size: self.size.as_ref().map(|d| d.rounded(s)),
            trade_value: self.trade_value.as_ref().map(|d| d.rounded(s)),
        }
    }
}

impl Rounded for MetricValue {
    fn rounded(&self, s: &Shaper<'_>) -> Self {
        match self {
            MetricValue::Scalar(v) => MetricValue::Scalar(s.opt(*v)),
            MetricValue::Series(values) => MetricValue::Series(s.series(values)),
        }
    }
}
