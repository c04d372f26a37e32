//! Batch analysis — many ledgers or files on the rayon thread pool.
//!
//! Results come back in input order. One failing file does not stop the
//! others; each entry carries its own `Result`.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};
use tradelens_core::{Ledger, LedgerFilter};

use crate::engine::{MetricsEngine, MetricsReport};
use crate::runner::{Pipeline, RunError, RunOutput};

/// Headline metrics for every ledger, in input order.
pub fn analyze_all(engine: &MetricsEngine, ledgers: &[Ledger]) -> Vec<MetricsReport> {
    ledgers.par_iter().map(|ledger| engine.compute(ledger)).collect()
}

/// Outcome of one file in a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub result: Result<RunOutput, RunError>,
}

impl BatchEntry {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run the pipeline over every file in parallel.
pub fn run_files<P: AsRef<Path> + Sync>(
    pipeline: &Pipeline,
    paths: &[P],
    filter: &LedgerFilter,
) -> Vec<BatchEntry> {
    info!(files = paths.len(), threads = rayon::current_num_threads(), "starting batch");

    let entries: Vec<BatchEntry> = paths
        .par_iter()
        .map(|p| {
            let path = p.as_ref();
            let result = pipeline.run_file(path, filter);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "batch entry failed");
            }
            BatchEntry {
                path: path.to_path_buf(),
                result,
            }
        })
        .collect();

    let failed = entries.iter().filter(|e| !e.is_ok()).count();
    info!(files = entries.len(), failed, "batch complete");
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use chrono::NaiveDate;
    use std::io::Write;
    use tradelens_core::TradeRecord;

    fn ledger(pnls: &[f64]) -> Ledger {
        let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        Ledger::from_records(
            pnls.iter()
                .enumerate()
                .map(|(i, &p)| TradeRecord::new(base.and_hms_opt(i as u32, 0, 0).unwrap(), p))
                .collect(),
        )
    }

    #[test]
    fn parallel_matches_sequential_in_order() {
        let engine = MetricsEngine::default();
        let ledgers: Vec<Ledger> = (0..16)
            .map(|i| ledger(&[i as f64, -1.0, 2.5 * i as f64]))
            .collect();

        let parallel = analyze_all(&engine, &ledgers);
        let sequential: Vec<MetricsReport> = ledgers.iter().map(|l| engine.compute(l)).collect();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.csv");
        let mut f = std::fs::File::create(&good).unwrap();
        writeln!(f, "Date,Closed PnL\n2025-01-01 10:00:00,4.0").unwrap();
        drop(f);
        let missing = dir.path().join("missing.csv");
        let unsupported = dir.path().join("trades.json");

        let pipeline = Pipeline::new(&AnalysisConfig::default()).unwrap();
        let entries = run_files(&pipeline, &[&good, &missing, &unsupported], &LedgerFilter::default());

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, good);
        assert!(entries[0].is_ok());
        assert!(matches!(entries[1].result, Err(RunError::Data(_))));
        assert!(matches!(entries[2].result, Err(RunError::Data(_))));
    }
}
