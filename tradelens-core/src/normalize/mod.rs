//! Ledger normalization — raw tabular rows in, canonical `Ledger` out.
//!
//! Columns are matched through the static alias table in [`crate::schema`].
//! Rows whose timestamp or closed PnL is missing or unreadable are dropped and
//! counted; optional fields that cannot be read become unknown. Only an input
//! with no usable row at all is an error.

pub mod parse;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Ledger, Role, Side, TradeRecord, TradeType};
use crate::schema::{ColumnMap, Field};

/// Header row plus string cells, as produced by a file loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based source line where each row starts. Empty when the table was
    /// not read from a file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_numbers: Vec<u64>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows,
            line_numbers: Vec::new(),
        }
    }

    /// Attach source line numbers, one per row.
    pub fn with_line_numbers(mut self, line_numbers: Vec<u64>) -> Self {
        self.line_numbers = line_numbers;
        self
    }

    /// Convenience constructor from string slices.
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
            line_numbers: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Source line of row `idx`. Without recorded line numbers, assumes one
    /// line per row after a single header line.
    pub fn line_of(&self, idx: usize) -> u64 {
        self.line_numbers
            .get(idx)
            .copied()
            .unwrap_or(idx as u64 + 2)
    }
}

/// Why a row was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    MissingTimestamp,
    BadTimestamp,
    MissingPnl,
    BadPnl,
}

/// Cell-level quality of the input, over every row read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Blank or absent cells in mapped columns, per field.
    pub missing_values: BTreeMap<Field, usize>,
    /// Non-empty optional cells that could not be read, per field.
    pub unreadable_values: BTreeMap<Field, usize>,
    /// Rows identical to an earlier row. They are kept.
    pub duplicate_rows: usize,
}

/// Bookkeeping for one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub drop_reasons: BTreeMap<DropReason, usize>,
    pub quality: DataQuality,
    pub columns: ColumnMap,
}

impl NormalizeStats {
    fn record_drop(&mut self, reason: DropReason) {
        self.rows_dropped += 1;
        *self.drop_reasons.entry(reason).or_insert(0) += 1;
    }

    fn record_unreadable(&mut self, field: Field) {
        *self.quality.unreadable_values.entry(field).or_insert(0) += 1;
    }

    fn record_missing(&mut self, row: &[String]) {
        for (field, idx, _) in &self.columns.mapped {
            if row.get(*idx).map_or(true, |c| c.trim().is_empty()) {
                *self.quality.missing_values.entry(*field).or_insert(0) += 1;
            }
        }
    }
}

/// Output of a successful normalization.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub ledger: Ledger,
    pub stats: NormalizeStats,
}

/// Errors from normalization.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(
        "no usable trades: {rows_read} row(s) read, {rows_dropped} dropped{}",
        missing_note(.missing_columns)
    )]
    EmptyLedger {
        rows_read: usize,
        rows_dropped: usize,
        missing_columns: Vec<Field>,
    },
}

fn missing_note(missing: &[Field]) -> String {
    if missing.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = missing.iter().map(|f| f.name()).collect();
    format!(" (missing column(s): {})", names.join(", "))
}

/// Normalize a raw table into a time-ordered ledger.
pub fn normalize(table: &RawTable) -> Result<Normalized, NormalizeError> {
    let columns = ColumnMap::resolve(&table.headers);
    for (field, idx, header) in &columns.mapped {
        debug!(%field, column = idx, header = %header, "mapped column");
    }
    if !columns.unmapped.is_empty() {
        debug!(unmapped = ?columns.unmapped, "ignoring unmapped columns");
    }

    let missing = columns.missing_required();
    let mut stats = NormalizeStats {
        rows_read: table.rows.len(),
        columns,
        ..Default::default()
    };

    let mut seen: HashSet<&[String]> = HashSet::with_capacity(table.rows.len());
    let mut records = Vec::with_capacity(table.rows.len());
    for (idx, row) in table.rows.iter().enumerate() {
        if !seen.insert(row.as_slice()) {
            stats.quality.duplicate_rows += 1;
        }
        stats.record_missing(row);
        match read_row(row, &mut stats) {
            Ok(record) => records.push(record),
            Err(reason) => {
                debug!(line = table.line_of(idx), ?reason, "dropping row");
                stats.record_drop(reason);
            }
        }
    }
    stats.rows_kept = records.len();
    if stats.quality.duplicate_rows > 0 {
        warn!(duplicates = stats.quality.duplicate_rows, "input contains duplicate rows");
    }

    if records.is_empty() {
        return Err(NormalizeError::EmptyLedger {
            rows_read: stats.rows_read,
            rows_dropped: stats.rows_dropped,
            missing_columns: missing,
        });
    }

    if stats.rows_dropped > 0 {
        warn!(
            dropped = stats.rows_dropped,
            read = stats.rows_read,
            reasons = ?stats.drop_reasons,
            "dropped rows without a usable timestamp or closed pnl"
        );
    }

    let ledger = Ledger::from_records(records);
    info!(trades = ledger.len(), dropped = stats.rows_dropped, "ledger normalized");
    Ok(Normalized { ledger, stats })
}

fn read_row(row: &[String], stats: &mut NormalizeStats) -> Result<TradeRecord, DropReason> {
    let cell = |field: Field| {
        stats
            .columns
            .index_of(field)
            .and_then(|idx| row.get(idx))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    };

    let timestamp = match cell(Field::Timestamp) {
        None => return Err(DropReason::MissingTimestamp),
        Some(raw) => parse::parse_timestamp(raw).ok_or(DropReason::BadTimestamp)?,
    };
    let closed_pnl = match cell(Field::ClosedPnl) {
        None => return Err(DropReason::MissingPnl),
        Some(raw) => parse::parse_decimal(raw).ok_or(DropReason::BadPnl)?,
    };

    let market = cell(Field::Market).map(str::to_string);
    let side = cell(Field::Side).map_or(Side::Unknown, parse::parse_side);
    let trade_type = cell(Field::Side).map_or(TradeType::Unknown, parse::parse_trade_type);
    let role = cell(Field::Role).map_or(Role::Unknown, parse::parse_role);

    let mut unreadable = Vec::new();
    let mut numeric = |field: Field| -> Option<f64> {
        let raw = cell(field)?;
        let value = parse::parse_non_negative(raw);
        if value.is_none() {
            unreadable.push(field);
        }
        value
    };
    let trade_value = numeric(Field::TradeValue);
    let size = numeric(Field::Size);
    let price = numeric(Field::Price);
    let fee = numeric(Field::Fee);

    for field in unreadable {
        stats.record_unreadable(field);
    }

    Ok(TradeRecord {
        timestamp,
        closed_pnl,
        market,
        side,
        trade_type,
        role,
        trade_value,
        size,
        price,
        fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    const HEADERS: &[&str] = &[
        "Date", "Closed PnL", "Market", "Side", "Trade Value", "Size", "Price", "Fee",
    ];

    #[test]
    fn normalizes_sample_rows() {
        let table = RawTable::from_strs(
            HEADERS,
            &[
                &["2025-01-01 10:00:00", "10.5", "BTC", "Long", "1000", "0.001", "50000", "2.0"],
                &["2025-01-01 11:00:00", "-5.2", "BTC", "Short", "800", "0.001", "48000", "2.0"],
            ],
        );
        let out = normalize(&table).unwrap();
        assert_eq!(out.ledger.len(), 2);
        assert_eq!(out.stats.rows_dropped, 0);

        let first = &out.ledger.trades()[0];
        assert_eq!(first.closed_pnl, 10.5);
        assert_eq!(first.market.as_deref(), Some("BTC"));
        assert_eq!(first.side, Side::Long);
        assert_eq!(first.trade_value, Some(1000.0));
        assert_eq!(first.fee, Some(2.0));
        assert_eq!(first.role, Role::Unknown);
        assert_eq!(
            first.timestamp.date(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
    }

    #[test]
    fn headers_are_case_insensitive() {
        let table = RawTable::from_strs(
            &["DATE", "closed pnl", "ROLE"],
            &[&["2025-01-01 10:00:00", "1", "maker"]],
        );
        let out = normalize(&table).unwrap();
        assert_eq!(out.ledger.trades()[0].role, Role::Maker);
    }

    #[test]
    fn bad_rows_are_dropped_and_counted() {
        let table = RawTable::from_strs(
            &["Date", "Closed PnL"],
            &[
                &["2025-01-01 10:00:00", "1.0"],
                &["", "2.0"],
                &["not a date", "3.0"],
                &["2025-01-01 11:00:00", ""],
                &["2025-01-01 12:00:00", "abc"],
                &["2025-01-01 13:00:00"],
            ],
        );
        let out = normalize(&table).unwrap();
        assert_eq!(out.ledger.len(), 1);
        assert_eq!(out.stats.rows_read, 6);
        assert_eq!(out.stats.rows_kept, 1);
        assert_eq!(out.stats.rows_dropped, 5);
        assert_eq!(out.stats.drop_reasons[&DropReason::MissingTimestamp], 1);
        assert_eq!(out.stats.drop_reasons[&DropReason::BadTimestamp], 1);
        assert_eq!(out.stats.drop_reasons[&DropReason::MissingPnl], 2);
        assert_eq!(out.stats.drop_reasons[&DropReason::BadPnl], 1);
    }

    #[test]
    fn unreadable_optional_numbers_stay_unknown() {
        let table = RawTable::from_strs(
            &["Date", "Closed PnL", "Size", "Fee"],
            &[
                &["2025-01-01 10:00:00", "1.0", "n/a", "-0.5"],
                &["2025-01-01 11:00:00", "1.0", "", "0.25"],
            ],
        );
        let out = normalize(&table).unwrap();
        let trades = out.ledger.trades();
        assert_eq!(trades[0].size, None);
        assert_eq!(trades[0].fee, None);
        assert_eq!(trades[1].size, None);
        assert_eq!(trades[1].fee, Some(0.25));
        assert_eq!(out.stats.quality.unreadable_values[&Field::Size], 1);
        assert_eq!(out.stats.quality.unreadable_values[&Field::Fee], 1);
    }

    #[test]
    fn accounting_negatives_are_losses() {
        let table = RawTable::from_strs(
            &["Date", "Closed PnL"],
            &[&["2025-01-01 10:00:00", "(8.50)"], &["2025-01-01 11:00:00", "1"]],
        );
        let out = normalize(&table).unwrap();
        assert_eq!(out.stats.rows_dropped, 0);
        assert_eq!(out.ledger.pnls(), vec![-8.5, 1.0]);
    }

    #[test]
    fn overflowing_amounts_are_dropped() {
        let table = RawTable::from_strs(
            &["Date", "Closed PnL"],
            &[
                &["2025-01-01 10:00:00", "1e308"],
                &["2025-01-01 11:00:00", "1e308"],
                &["2025-01-01 12:00:00", "-1e308"],
                &["2025-01-01 13:00:00", "2"],
            ],
        );
        let out = normalize(&table).unwrap();
        assert_eq!(out.stats.drop_reasons[&DropReason::BadPnl], 3);
        assert_eq!(out.ledger.pnls(), vec![2.0]);
    }

    #[test]
    fn trade_type_comes_from_side_label() {
        let table = RawTable::from_strs(
            &["Date", "Closed PnL", "Side"],
            &[
                &["2025-01-01 10:00:00", "1", "Open Long"],
                &["2025-01-01 11:00:00", "1", "Close Long"],
                &["2025-01-01 12:00:00", "1", "Long > Short"],
                &["2025-01-01 13:00:00", "1", "Short"],
                &["2025-01-01 14:00:00", "1", ""],
            ],
        );
        let out = normalize(&table).unwrap();
        let kinds: Vec<TradeType> = out.ledger.iter().map(|t| t.trade_type).collect();
        assert_eq!(
            kinds,
            vec![
                TradeType::Open,
                TradeType::Close,
                TradeType::Flip,
                TradeType::Other,
                TradeType::Unknown,
            ]
        );
        assert_eq!(out.ledger.trades()[0].side, Side::Long);
        assert_eq!(out.ledger.trades()[2].side, Side::LongToShort);
    }

    #[test]
    fn data_quality_counts_missing_cells_and_duplicates() {
        let table = RawTable::from_strs(
            &["Date", "Closed PnL", "Fee", "Notes"],
            &[
                &["2025-01-01 10:00:00", "1", "0.1", ""],
                &["2025-01-01 10:00:00", "1", "0.1", ""],
                &["2025-01-01 11:00:00", "", ""],
                &["", "2", "0.2", "x"],
            ],
        );
        let out = normalize(&table).unwrap();
        let quality = &out.stats.quality;
        assert_eq!(quality.duplicate_rows, 1);
        assert_eq!(quality.missing_values[&Field::ClosedPnl], 1);
        assert_eq!(quality.missing_values[&Field::Fee], 1);
        assert_eq!(quality.missing_values[&Field::Timestamp], 1);
        // unmapped columns are not tracked
        assert_eq!(quality.missing_values.len(), 3);
        // duplicates stay in the ledger
        assert_eq!(out.ledger.len(), 2);
    }

    #[test]
    fn line_numbers_follow_the_source() {
        let table = RawTable::from_strs(&["Date", "Closed PnL"], &[&["a", "1"], &["b", "2"]]);
        assert_eq!(table.line_of(0), 2);
        assert_eq!(table.line_of(1), 3);

        let table = table.with_line_numbers(vec![2, 5]);
        assert_eq!(table.line_of(1), 5);
        assert!(!table.is_empty());
    }

    #[test]
    fn output_is_sorted_with_stable_ties() {
        let table = RawTable::from_strs(
            &["Date", "Closed PnL"],
            &[
                &["2025-01-02 09:00:00", "1"],
                &["2025-01-01 09:00:00", "2"],
                &["2025-01-01 09:00:00", "3"],
            ],
        );
        let out = normalize(&table).unwrap();
        assert_eq!(out.ledger.pnls(), vec![2.0, 3.0, 1.0]);
        assert_eq!(out.ledger.trades()[2].timestamp.hour(), 9);
    }

    #[test]
    fn empty_input_is_an_error() {
        let table = RawTable::from_strs(&["Date", "Closed PnL"], &[]);
        let err = normalize(&table).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::EmptyLedger { rows_read: 0, rows_dropped: 0, .. }
        ));
    }

    #[test]
    fn all_rejected_is_an_error() {
        let table = RawTable::from_strs(&["Date", "Closed PnL"], &[&["bad", "1"], &["", ""]]);
        let err = normalize(&table).unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::EmptyLedger { rows_read: 2, rows_dropped: 2, .. }
        ));
    }

    #[test]
    fn missing_required_column_is_named_in_error() {
        let table = RawTable::from_strs(&["Date", "Market"], &[&["2025-01-01", "BTC"]]);
        let err = normalize(&table).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("no usable trades"), "{msg}");
        assert!(msg.contains("closed_pnl"), "{msg}");
    }
}
