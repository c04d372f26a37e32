//! Criterion benchmarks for the analysis hot paths.
//!
//! Benchmarks:
//! 1. Normalization of a raw table
//! 2. Headline metrics (`compute`)
//! 3. Full analysis (`analyze`)
//! 4. Report assembly and JSON export

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tradelens_core::{normalize, Ledger, RawTable};
use tradelens_runner::export::export_json;
use tradelens_runner::{assemble, MetricsEngine, ReportConfig, ReportMeta};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_table(n: usize) -> RawTable {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let markets = ["BTC", "ETH", "SOL"];
    let rows = (0..n)
        .map(|i| {
            let ts = base + chrono::Duration::minutes(i as i64 * 17);
            let pnl = (i as f64 * 0.37).sin() * 25.0;
            vec![
                ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                format!("{pnl:.2}"),
                markets[i % markets.len()].to_string(),
                if i % 2 == 0 { "Long" } else { "Short" }.to_string(),
                format!("{:.2}", 500.0 + (i % 100) as f64),
                "0.25".to_string(),
            ]
        })
        .collect();
    RawTable::new(
        ["Date", "Closed PnL", "Coin", "Side", "Trade Value", "Fee"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        rows,
    )
}

fn make_ledger(n: usize) -> Ledger {
    normalize(&make_table(n)).unwrap().ledger
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for n in [1_000, 10_000] {
        let table = make_table(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &table, |b, t| {
            b.iter(|| normalize(black_box(t)).unwrap())
        });
    }
    group.finish();
}

fn bench_compute(c: &mut Criterion) {
    let engine = MetricsEngine::default();
    let mut group = c.benchmark_group("compute");
    for n in [1_000, 10_000, 100_000] {
        let ledger = make_ledger(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &ledger, |b, l| {
            b.iter(|| engine.compute(black_box(l)))
        });
    }
    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let engine = MetricsEngine::default();
    let mut group = c.benchmark_group("analyze");
    for n in [1_000, 10_000] {
        let ledger = make_ledger(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &ledger, |b, l| {
            b.iter(|| engine.analyze(black_box(l)))
        });
    }
    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let ledger = make_ledger(10_000);
    let analysis = MetricsEngine::default().analyze(&ledger);
    let meta = ReportMeta::for_ledger("bench.csv", &ledger);
    let config = ReportConfig::default();

    c.bench_function("assemble_and_export_10k", |b| {
        b.iter(|| {
            let report = assemble(black_box(&analysis), &meta, &config);
            export_json(&report).unwrap()
        })
    });
}

criterion_group!(benches, bench_normalize, bench_compute, bench_analyze, bench_report);
criterion_main!(benches);
