//! Property tests for metrics invariants.
//!
//! Uses proptest to verify:
//! 1. Drawdowns are never positive
//! 2. Total PnL equals the last cumulative point
//! 3. Win rate stays in [0, 1] (or is undefined)
//! 4. CVaR never exceeds VaR
//! 5. Idempotence: computing twice gives the same report
//! 6. Batch results match sequential results

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use tradelens_core::{Ledger, TradeRecord};
use tradelens_runner::{
    analyze_all, assemble, MetricsEngine, ProfitFactor, ReportConfig, ReportMeta,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_pnl() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => -1_000.0..1_000.0_f64,
        1 => Just(0.0),
        1 => (-50i32..50).prop_map(|p| p as f64),
    ]
}

fn arb_ledger() -> impl Strategy<Value = Ledger> {
    prop::collection::vec((arb_pnl(), 0i64..(60 * 24 * 90)), 1..120).prop_map(|rows| {
        let base = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Ledger::from_records(
            rows.into_iter()
                .map(|(pnl, minutes)| TradeRecord::new(base + Duration::minutes(minutes), pnl))
                .collect(),
        )
    })
}

proptest! {
    #[test]
    fn drawdowns_are_never_positive(ledger in arb_ledger()) {
        let report = MetricsEngine::default().compute(&ledger);
        prop_assert!(report.drawdown_series.iter().all(|d| *d <= 0.0));
        prop_assert!(report.drawdown_series.iter().sum::<f64>() <= 0.0);
        prop_assert!(report.max_drawdown <= 0.0);
        prop_assert_eq!(report.drawdown_series.len(), ledger.len());
    }

    #[test]
    fn total_equals_last_cumulative(ledger in arb_ledger()) {
        let report = MetricsEngine::default().compute(&ledger);
        let last = *ledger.cumulative_pnl().last().unwrap();
        prop_assert!((report.total_pnl - last).abs() <= 1e-9 * last.abs().max(1.0));
    }

    #[test]
    fn win_rate_is_a_fraction(ledger in arb_ledger()) {
        let report = MetricsEngine::default().compute(&ledger);
        match report.win_rate {
            Some(w) => prop_assert!((0.0..=1.0).contains(&w)),
            None => prop_assert!(ledger.iter().all(|t| t.closed_pnl == 0.0)),
        }
    }

    #[test]
    fn profit_factor_is_never_negative(ledger in arb_ledger()) {
        let report = MetricsEngine::default().compute(&ledger);
        if let Some(ProfitFactor::Finite(pf)) = report.profit_factor {
            prop_assert!(pf >= 0.0);
        }
    }

    #[test]
    fn cvar_never_exceeds_var(ledger in arb_ledger()) {
        let report = MetricsEngine::default().compute(&ledger);
        prop_assert!(report.cvar_95.unwrap() <= report.var_95.unwrap());
    }

    #[test]
    fn buckets_account_for_every_trade(ledger in arb_ledger()) {
        let report = MetricsEngine::default().compute(&ledger);
        let hourly: usize = report.hourly_counts.iter().map(|h| h.trade_count).sum();
        let daily: usize = report.daily_counts.iter().map(|d| d.trade_count).sum();
        prop_assert_eq!(report.hourly_counts.len(), 24);
        prop_assert_eq!(hourly, ledger.len());
        prop_assert_eq!(daily, ledger.len());
    }

    #[test]
    fn analysis_is_idempotent(ledger in arb_ledger()) {
        let engine = MetricsEngine::default();
        let a = engine.analyze(&ledger);
        let b = engine.analyze(&ledger);
        prop_assert_eq!(&a, &b);

        let meta = ReportMeta::for_ledger("prop.csv", &ledger);
        let config = ReportConfig::default();
        let ja = serde_json::to_string(&assemble(&a, &meta, &config)).unwrap();
        let jb = serde_json::to_string(&assemble(&b, &meta, &config)).unwrap();
        prop_assert_eq!(ja, jb);
    }

    #[test]
    fn batch_matches_sequential(ledgers in prop::collection::vec(arb_ledger(), 1..6)) {
        let engine = MetricsEngine::default();
        let sequential: Vec<_> = ledgers.iter().map(|l| engine.compute(l)).collect();
        prop_assert_eq!(analyze_all(&engine, &ledgers), sequential);
    }
}
