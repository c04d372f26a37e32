//! TradeLens CLI — analyze exported trade histories.
//!
//! Commands:
//! - `analyze`: load one file, print a report, save the artifact bundle
//! - `batch`: analyze many files in parallel, one summary line per file
//! - `columns`: show how each header maps to a canonical trade field

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tradelens_core::normalize::parse::parse_timestamp;
use tradelens_core::{ColumnMap, LedgerFilter, TradeType};
use tradelens_runner::export::{export_json, generate_markdown, save_artifacts};
use tradelens_runner::{load_csv, run_files, AnalysisConfig, Pipeline, ProfitFactor, Report};

#[derive(Parser)]
#[command(
    name = "tradelens",
    about = "TradeLens CLI: trade ledger analytics"
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
    Summary,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single trade history file.
    Analyze {
        /// Trade history (.csv, .tsv or .txt).
        file: PathBuf,

        /// Path to a TOML analysis config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for the artifact bundle.
        #[arg(long, default_value = "reports")]
        output_dir: PathBuf,

        /// What to print to stdout.
        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        format: OutputFormat,

        /// Keep trades at or after this time (YYYY-MM-DD or full timestamp).
        #[arg(long)]
        start: Option<String>,

        /// Keep trades at or before this time. A bare date includes the whole day.
        #[arg(long)]
        end: Option<String>,

        /// Keep only trades in this market (case-insensitive).
        #[arg(long)]
        market: Option<String>,

        /// Keep only this kind of fill: open, close, flip, other or unknown.
        #[arg(long)]
        trade_type: Option<TradeType>,

        /// Print only; do not write the artifact bundle.
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,
    },
    /// Analyze many files in parallel.
    Batch {
        /// Trade history files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Path to a TOML analysis config.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show how each column header maps to a trade field.
    Columns {
        /// Trade history file.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Analyze {
            file,
            config,
            output_dir,
            format,
            start,
            end,
            market,
            trade_type,
            no_artifacts,
        } => {
            let filter = LedgerFilter {
                start: start.as_deref().map(|s| parse_bound(s, false)).transpose()?,
                end: end.as_deref().map(|s| parse_bound(s, true)).transpose()?,
                market,
                trade_type,
                ..Default::default()
            };
            let artifacts_dir = (!no_artifacts).then_some(output_dir);
            run_analyze(&file, config.as_deref(), &filter, format, artifacts_dir.as_deref())
        }
        Commands::Batch { files, config } => run_batch(&files, config.as_deref()),
        Commands::Columns { file } => run_columns(&file),
    }
}

/// Logs go to stderr so stdout stays clean for report output.
fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => AnalysisConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Parse a `--start`/`--end` value. A bare end date extends to the end of
/// that day.
fn parse_bound(raw: &str, is_end: bool) -> Result<NaiveDateTime> {
    if is_end {
        if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            if let Some(ts) = date.and_hms_nano_opt(23, 59, 59, 999_999_999) {
                return Ok(ts);
            }
        }
    }
    match parse_timestamp(raw) {
        Some(ts) => Ok(ts),
        None => bail!("unrecognized date or timestamp '{raw}'"),
    }
}

fn run_analyze(
    file: &Path,
    config_path: Option<&Path>,
    filter: &LedgerFilter,
    format: OutputFormat,
    artifacts_dir: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::new(&config)?;
    let out = pipeline
        .run_file(file, filter)
        .with_context(|| format!("failed to analyze {}", file.display()))?;

    match format {
        OutputFormat::Json => println!("{}", export_json(&out.report)?),
        OutputFormat::Markdown => println!("{}", generate_markdown(&out.report)),
        OutputFormat::Summary => print_summary(&out.report),
    }

    if let Some(dir) = artifacts_dir {
        let run_dir = save_artifacts(&out.report, dir)?;
        eprintln!("Artifacts saved to: {}", run_dir.display());
    }

    Ok(())
}

fn run_batch(files: &[PathBuf], config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::new(&config)?;
    let entries = run_files(&pipeline, files, &LedgerFilter::default());

    println!(
        "{:<32} {:>7} {:>14} {:>9} {:>14}",
        "File", "Trades", "Total PnL", "Win Rate", "Max Drawdown"
    );
    println!("{}", "-".repeat(80));
    let mut failed = 0;
    for entry in &entries {
        let name = entry
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.path.display().to_string());
        match &entry.result {
            Ok(out) => {
                let m = &out.report.metrics;
                println!(
                    "{:<32} {:>7} {:>14.2} {:>9} {:>14.2}",
                    name,
                    out.report.summary.trade_count,
                    m.total_pnl,
                    pct(m.win_rate),
                    m.max_drawdown
                );
            }
            Err(e) => {
                failed += 1;
                println!("{name:<32} FAILED: {e}");
            }
        }
    }

    if failed > 0 {
        eprintln!("{failed} of {} file(s) failed", entries.len());
        std::process::exit(1);
    }
    Ok(())
}

fn run_columns(file: &Path) -> Result<()> {
    let table = load_csv(file).with_context(|| format!("failed to load {}", file.display()))?;
    let columns = ColumnMap::resolve(&table.headers);

    println!("{:<4} {:<30} {:<14}", "#", "Header", "Field");
    println!("{}", "-".repeat(50));
    for (idx, header) in table.headers.iter().enumerate() {
        let field = columns
            .mapped
            .iter()
            .find(|(_, i, _)| *i == idx)
            .map_or("(ignored)".to_string(), |(f, _, _)| f.name().to_string());
        println!("{idx:<4} {header:<30} {field:<14}");
    }

    let missing = columns.missing_required();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|f| f.name()).collect();
        println!();
        println!("MISSING required field(s): {}", names.join(", "));
    }
    Ok(())
}

fn print_summary(report: &Report) {
    let m = &report.metrics;
    let s = &report.summary;
    println!();
    println!("=== Ledger Report ===");
    println!("Source:         {}", report.meta.source);
    println!(
        "Period:         {} to {}",
        s.first_timestamp.as_deref().unwrap_or("n/a"),
        s.last_timestamp.as_deref().unwrap_or("n/a")
    );
    println!(
        "Trades:         {} ({} rows read, {} dropped)",
        s.trade_count, report.meta.rows_read, report.meta.rows_dropped
    );
    println!("Markets:        {}", s.market_count);
    println!();
    println!("--- Performance ---");
    println!("Total PnL:      {:.2}", m.total_pnl);
    println!("Win Rate:       {}", pct(m.win_rate));
    println!("Profit Factor:  {}", profit_factor(m.profit_factor));
    println!("Sharpe:         {}", num(m.sharpe_ratio, 3));
    println!("Max Win:        {}", num(m.max_win, 2));
    println!("Max Loss:       {}", num(m.max_loss, 2));
    println!("Max Drawdown:   {:.2}", m.max_drawdown);
    println!(
        "Max DD %:       {}",
        report.drawdown.max_drawdown_pct.map_or("n/a".to_string(), |p| format!("{p:.2}%"))
    );
    println!("Calmar:         {}", num(report.drawdown.calmar_ratio, 3));
    println!("VaR 95%:        {}", num(m.var_95, 2));
    println!("CVaR 95%:       {}", num(m.cvar_95, 2));
    println!(
        "Busiest Hour:   {}",
        m.most_active_hour.map_or("n/a".to_string(), |h| format!("{h:02}:00"))
    );
    if report.meta.rows_dropped > 0 {
        println!();
        println!(
            "WARNING: {} row(s) without a usable timestamp or closed PnL were skipped",
            report.meta.rows_dropped
        );
    }
    println!();
}

fn num(v: Option<f64>, decimals: usize) -> String {
    v.map_or("n/a".to_string(), |x| format!("{x:.decimals$}"))
}

fn pct(v: Option<f64>) -> String {
    v.map_or("n/a".to_string(), |x| format!("{:.1}%", x * 100.0))
}

fn profit_factor(pf: Option<ProfitFactor>) -> String {
    match pf {
        None => "n/a".to_string(),
        Some(ProfitFactor::Infinite) => "inf".to_string(),
        Some(ProfitFactor::Finite(v)) => format!("{v:.2}"),
    }
}
