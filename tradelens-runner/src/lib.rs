//! TradeLens Runner — metrics engine, report assembly, export, batch runs.
//!
//! This crate builds on `tradelens-core` to provide:
//! - CSV loading into raw tables
//! - The metrics engine (P&L, drawdown, Sharpe, VaR/CVaR, time buckets)
//!   with pluggable custom metrics
//! - Report assembly with rounding and stable layout
//! - JSON / CSV / Markdown export and artifact bundles
//! - TOML analysis configuration
//! - Parallel batch analysis

pub mod batch;
pub mod config;
pub mod data_loader;
pub mod engine;
pub mod export;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod tail_metrics;
pub mod time_buckets;
pub mod trade_stats;

pub use batch::{analyze_all, run_files, BatchEntry};
pub use config::{AnalysisConfig, ConfigError, MetricsConfig, ReportConfig};
pub use data_loader::{load_csv, read_csv, LoadError};
pub use engine::{
    EquityPoint, FnMetric, LedgerAnalysis, LedgerMetric, MetricValue, MetricsEngine,
    MetricsReport,
};
pub use metrics::{DrawdownDetail, PnlBreakdown, ProfitFactor};
pub use report::{assemble, Report, ReportMeta, SCHEMA_VERSION};
pub use runner::{Pipeline, RunError, RunOutput};
pub use tail_metrics::{TailRisk, VarEstimate};
pub use time_buckets::{DailyBucket, FrequencyDetail, HourlyBucket, MonthlyBucket, WeekdayBucket};
pub use trade_stats::{Distribution, SizeStats};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn engine_is_send_sync() {
        assert_send::<MetricsEngine>();
        assert_sync::<MetricsEngine>();
        assert_send::<Pipeline>();
        assert_sync::<Pipeline>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<MetricsReport>();
        assert_sync::<MetricsReport>();
        assert_send::<LedgerAnalysis>();
        assert_sync::<LedgerAnalysis>();
        assert_send::<Report>();
        assert_sync::<Report>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<AnalysisConfig>();
        assert_sync::<AnalysisConfig>();
    }

    #[test]
    fn error_types_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
        assert_send::<LoadError>();
        assert_sync::<LoadError>();
    }
}
