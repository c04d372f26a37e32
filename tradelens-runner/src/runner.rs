//! Analysis pipeline — load, normalize, filter, analyze, assemble.
//!
//! Two entry points:
//! - `Pipeline::run_file()`: reads a trade history from disk. Used by the CLI.
//! - `Pipeline::run_table()`: takes an already-loaded `RawTable`.

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};
use tradelens_core::{normalize, LedgerFilter, NormalizeError, NormalizeStats, RawTable};

use crate::config::{AnalysisConfig, ConfigError, ReportConfig};
use crate::data_loader::{load_csv, LoadError};
use crate::engine::{LedgerAnalysis, MetricsEngine};
use crate::report::{assemble, Report, ReportMeta};

/// Errors from the pipeline.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Everything produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub report: Report,
    pub analysis: LedgerAnalysis,
    pub stats: NormalizeStats,
    /// Trades removed by the ledger filter.
    pub filtered_out: usize,
}

/// Configured engine plus report settings, reusable across inputs.
#[derive(Debug)]
pub struct Pipeline {
    engine: MetricsEngine,
    report_config: ReportConfig,
}

impl Pipeline {
    /// Build a pipeline from a configuration, validating it first.
    pub fn new(config: &AnalysisConfig) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            engine: MetricsEngine::new(config.metrics.clone()),
            report_config: config.report.clone(),
        })
    }

    /// Build a pipeline around an engine that already carries custom metrics.
    pub fn with_engine(engine: MetricsEngine, report_config: ReportConfig) -> Result<Self, RunError> {
        engine.config().validate()?;
        report_config.validate()?;
        Ok(Self {
            engine,
            report_config,
        })
    }

    /// Load and analyze a trade history file. The report source is the file
    /// name.
    pub fn run_file(&self, path: &Path, filter: &LedgerFilter) -> Result<RunOutput, RunError> {
        let table = load_csv(path)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.run_table(&source, &table, filter)
    }

    pub fn run_table(
        &self,
        source: &str,
        table: &RawTable,
        filter: &LedgerFilter,
    ) -> Result<RunOutput, RunError> {
        let normalized = normalize(table)?;

        let ledger = if filter.is_empty() {
            normalized.ledger
        } else {
            normalized.ledger.filter(filter)
        };
        let filtered_out = normalized.stats.rows_kept - ledger.len();
        if filtered_out > 0 {
            info!(source, removed = filtered_out, remaining = ledger.len(), "applied ledger filter");
        }
        if ledger.is_empty() {
            warn!(source, "no trades left after filtering; metrics will be empty");
        }

        let analysis = self.engine.analyze(&ledger);
        let meta = ReportMeta::for_ledger(source, &ledger).with_stats(&normalized.stats);
        let report = assemble(&analysis, &meta, &self.report_config);
        info!(
            source,
            trades = ledger.len(),
            fingerprint = %ledger.fingerprint().short(12),
            "analysis complete"
        );

        Ok(RunOutput {
            report,
            analysis,
            stats: normalized.stats,
            filtered_out,
        })
    }
}
