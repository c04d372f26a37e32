//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for analysis reports:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: per-trade series, daily and hourly buckets
//! - **Markdown**: human-readable single-ledger report
//!
//! The `meta` section carries a `schema_version`. Newer versions are rejected
//! on load.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::engine::MetricValue;
use crate::metrics::ProfitFactor;
use crate::report::{Report, TradeRow, SCHEMA_VERSION};

/// File names inside an artifact directory.
pub const REPORT_JSON: &str = "report.json";
pub const REPORT_MD: &str = "report.md";
pub const SERIES_CSV: &str = "series.csv";
pub const DAILY_CSV: &str = "daily.csv";
pub const HOURLY_CSV: &str = "hourly.csv";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `Report` to pretty JSON.
pub fn export_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize Report to JSON")
}

/// Deserialize a `Report` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<Report> {
    let report: Report =
        serde_json::from_str(json).context("failed to deserialize Report from JSON")?;
    if report.meta.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.meta.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Per-trade series: index, timestamp, pnl, cumulative_pnl, drawdown.
pub fn export_series_csv(report: &Report) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "timestamp", "pnl", "cumulative_pnl", "drawdown"])?;
    for p in &report.equity {
        wtr.write_record([
            &p.index.to_string(),
            &p.timestamp,
            &p.pnl.to_string(),
            &p.cumulative_pnl.to_string(),
            &p.drawdown.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Daily buckets: date, trade_count, pnl, win_rate (empty when undefined).
pub fn export_daily_csv(report: &Report) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "trade_count", "pnl", "win_rate"])?;
    for d in &report.metrics.daily_counts {
        wtr.write_record([
            &d.date,
            &d.trade_count.to_string(),
            &d.pnl.to_string(),
            &opt_cell(d.win_rate),
        ])?;
    }
    finish(wtr)
}

/// Hourly buckets: all 24 hours, including empty ones.
pub fn export_hourly_csv(report: &Report) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["hour", "trade_count", "pnl", "win_rate"])?;
    for h in &report.metrics.hourly_counts {
        wtr.write_record([
            &h.hour.to_string(),
            &h.trade_count.to_string(),
            &h.pnl.to_string(),
            &opt_cell(h.win_rate),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn opt_cell(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one report.
///
/// Creates `{source_stem}_{fingerprint[..12]}/` under `output_dir` holding
/// `report.json`, `report.md`, `series.csv`, `daily.csv` and `hourly.csv`.
/// The same ledger always maps to the same directory, so re-running
/// overwrites in place.
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &Report, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(report));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        (REPORT_JSON, export_json(report)?),
        (REPORT_MD, generate_markdown(report)),
        (SERIES_CSV, export_series_csv(report)?),
        (DAILY_CSV, export_daily_csv(report)?),
        (HOURLY_CSV, export_hourly_csv(report)?),
    ];
    for (name, content) in &files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    info!(dir = %run_dir.display(), "saved artifacts");
    Ok(run_dir)
}

/// Load a `Report` from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<Report> {
    let path = dir.join(REPORT_JSON);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// `{stem}_{fingerprint[..12]}` with the stem reduced to `[A-Za-z0-9_-]`.
pub fn artifact_dir_name(report: &Report) -> String {
    let stem = Path::new(&report.meta.source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        stem.push_str("ledger");
    }
    let fp = &report.meta.ledger_fingerprint;
    format!("{stem}_{}", &fp[..fp.len().min(12)])
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for one ledger.
pub fn generate_markdown(report: &Report) -> String {
    let mut md = String::with_capacity(4096);
    let m = &report.metrics;
    let meta = &report.meta;
    let s = &report.summary;

    md.push_str("# Trade Ledger Report\n\n");

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    row(&mut md, "Source", &meta.source);
    row(
        &mut md,
        "Period",
        &format!(
            "{} to {}",
            s.first_timestamp.as_deref().unwrap_or("n/a"),
            s.last_timestamp.as_deref().unwrap_or("n/a")
        ),
    );
    row(&mut md, "Trades", &s.trade_count.to_string());
    row(
        &mut md,
        "Rows",
        &format!("{} read, {} dropped", meta.rows_read, meta.rows_dropped),
    );
    row(&mut md, "Markets", &s.market_count.to_string());
    row(&mut md, "Total Fees", &format!("{} ({} known)", s.total_fees, s.known_fee_count));
    row(&mut md, "Fingerprint", &meta.ledger_fingerprint);
    md.push('\n');

    // Data Quality
    let q = &meta.data_quality;
    if q.duplicate_rows > 0 || !q.missing_values.is_empty() || !q.unreadable_values.is_empty() {
        md.push_str("## Data Quality\n\n");
        md.push_str("| Field | Missing | Unreadable |\n");
        md.push_str("| --- | ---: | ---: |\n");
        let fields: BTreeSet<_> = q.missing_values.keys().chain(q.unreadable_values.keys()).collect();
        for field in fields {
            let _ = writeln!(
                md,
                "| {} | {} | {} |",
                field,
                q.missing_values.get(field).copied().unwrap_or(0),
                q.unreadable_values.get(field).copied().unwrap_or(0)
            );
        }
        let _ = writeln!(md, "\nDuplicate rows: {}\n", q.duplicate_rows);
    }

    // Performance Summary
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    row(&mut md, "Total PnL", &m.total_pnl.to_string());
    row(&mut md, "Win Rate", &pct(m.win_rate));
    row(&mut md, "Profit Factor", &profit_factor(m.profit_factor));
    row(&mut md, "Sharpe (per trade)", &num(m.sharpe_ratio));
    row(&mut md, "Max Win", &num(m.max_win));
    row(&mut md, "Max Loss", &num(m.max_loss));
    row(&mut md, "Max Drawdown", &m.max_drawdown.to_string());
    row(&mut md, "VaR 95%", &num(m.var_95));
    row(&mut md, "CVaR 95%", &num(m.cvar_95));
    row(
        &mut md,
        "Most Active Hour",
        &m.most_active_hour.map_or("n/a".to_string(), |h| format!("{h:02}:00")),
    );
    md.push('\n');

    // P&L Breakdown
    let p = &report.pnl;
    md.push_str("## P&L Breakdown\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    row(
        &mut md,
        "Winning / Losing / Breakeven",
        &format!("{} / {} / {}", p.winning_trades, p.losing_trades, p.breakeven_trades),
    );
    row(&mut md, "Gross Profit", &p.gross_profit.to_string());
    row(&mut md, "Gross Loss", &p.gross_loss.to_string());
    row(&mut md, "Average PnL", &num(p.average_pnl));
    row(&mut md, "PnL Std Dev", &num(p.pnl_std));
    row(&mut md, "Average Win", &num(p.average_win));
    row(&mut md, "Average Loss", &num(p.average_loss));
    row(&mut md, "Payoff Ratio", &num(p.payoff_ratio));
    md.push('\n');

    // Drawdown
    let d = &report.drawdown;
    md.push_str("## Drawdown\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    row(&mut md, "Max Drawdown %", &num(d.max_drawdown_pct));
    row(&mut md, "Current Drawdown", &d.current_drawdown.to_string());
    row(&mut md, "Current Drawdown %", &num(d.current_drawdown_pct));
    row(&mut md, "Calmar Ratio", &num(d.calmar_ratio));
    row(&mut md, "Peak Cumulative PnL", &num(d.peak_pnl));
    row(&mut md, "Trades in Drawdown", &d.points_in_drawdown.to_string());
    row(&mut md, "Longest Drawdown (trades)", &d.longest_drawdown.to_string());
    md.push('\n');

    // Tail Risk
    let t = &report.tail_risk;
    md.push_str("## Tail Risk\n\n");
    md.push_str("| Confidence | VaR | CVaR |\n");
    md.push_str("| ---: | ---: | ---: |\n");
    for e in &t.estimates {
        let _ = writeln!(md, "| {} | {} | {} |", e.confidence, num(e.var), num(e.cvar));
    }
    let _ = writeln!(
        md,
        "\nSkewness: {}, excess kurtosis: {}\n",
        num(t.skewness),
        num(t.excess_kurtosis)
    );

    // Activity
    let f = &report.frequency;
    md.push_str("## Activity\n\n");
    let _ = writeln!(
        md,
        "{} trading day(s), {} trades/day on average, at most {} in one day.\n",
        f.trading_days,
        num(f.mean_trades_per_day),
        f.max_trades_per_day
    );
    md.push_str("| Weekday | Trades | PnL | Win Rate |\n");
    md.push_str("| --- | ---: | ---: | ---: |\n");
    for w in &f.weekday_counts {
        let _ = writeln!(md, "| {} | {} | {} | {} |", w.weekday, w.trade_count, w.pnl, pct(w.win_rate));
    }
    md.push('\n');
    if !s.trade_type_distribution.is_empty() {
        md.push_str("| Trade Type | Trades |\n");
        md.push_str("| --- | ---: |\n");
        for (kind, count) in &s.trade_type_distribution {
            let _ = writeln!(md, "| {kind} | {count} |");
        }
        md.push('\n');
    }

    // Monthly
    if !report.monthly.is_empty() {
        md.push_str("## Monthly\n\n");
        md.push_str("| Month | Trades | PnL | Mean PnL | Traded Value | Cumulative |\n");
        md.push_str("| --- | ---: | ---: | ---: | ---: | ---: |\n");
        for r in &report.monthly {
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {} |",
                r.month, r.trade_count, r.pnl, r.mean_pnl, r.traded_value, r.cumulative_pnl
            );
        }
        md.push('\n');
    }

    // Daily
    if !m.daily_counts.is_empty() {
        md.push_str("## Daily\n\n");
        md.push_str("| Date | Trades | PnL | Win Rate |\n");
        md.push_str("| --- | ---: | ---: | ---: |\n");
        for r in &m.daily_counts {
            let _ = writeln!(md, "| {} | {} | {} | {} |", r.date, r.trade_count, r.pnl, pct(r.win_rate));
        }
        md.push('\n');
    }

    trade_table(&mut md, "Best Trades", &report.best_trades);
    trade_table(&mut md, "Worst Trades", &report.worst_trades);

    // Custom metrics
    if !m.custom.is_empty() {
        md.push_str("## Custom Metrics\n\n");
        md.push_str("| Metric | Value |\n");
        md.push_str("| --- | --- |\n");
        for (name, value) in &m.custom {
            let rendered = match value {
                MetricValue::Scalar(v) => num(*v),
                MetricValue::Series(values) => format!("series ({} points)", values.len()),
            };
            row(&mut md, name, &rendered);
        }
        md.push('\n');
    }

    md
}

fn trade_table(md: &mut String, title: &str, trades: &[TradeRow]) {
    if trades.is_empty() {
        return;
    }
    let _ = writeln!(md, "## {title}\n");
    md.push_str("| Time | Market | Side | PnL | Size | Price |\n");
    md.push_str("| --- | --- | --- | ---: | ---: | ---: |\n");
    for t in trades {
        let _ = writeln!(
            md,
            "| {} | {} | {} | {} | {} | {} |",
            t.timestamp,
            t.market.as_deref().unwrap_or("-"),
            t.side,
            t.closed_pnl,
            num(t.size),
            num(t.price)
        );
    }
    md.push('\n');
}

fn row(md: &mut String, label: &str, value: &str) {
    let _ = writeln!(md, "| {label} | {value} |");
}

fn num(v: Option<f64>) -> String {
    v.map_or("n/a".to_string(), |x| x.to_string())
}

fn pct(v: Option<f64>) -> String {
    v.map_or("n/a".to_string(), |x| format!("{:.1}%", x * 100.0))
}

fn profit_factor(pf: Option<ProfitFactor>) -> String {
    match pf {
        None => "n/a".to_string(),
        Some(ProfitFactor::Infinite) => "inf".to_string(),
        Some(ProfitFactor::Finite(v)) => v.to_string(),
    }
}
