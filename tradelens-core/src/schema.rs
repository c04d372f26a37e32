//! Trade schema contract — the boundary between exported files and the ledger.
//!
//! Defines the canonical fields of a trade record and the header spellings
//! accepted for each. Header matching is case-insensitive and resolved once
//! per table into a [`ColumnMap`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical trade record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Timestamp,
    Market,
    Side,
    TradeValue,
    Size,
    Price,
    ClosedPnl,
    Fee,
    Role,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Timestamp => "date",
            Field::Market => "market",
            Field::Side => "side",
            Field::TradeValue => "trade_value",
            Field::Size => "size",
            Field::Price => "price",
            Field::ClosedPnl => "closed_pnl",
            Field::Fee => "fee",
            Field::Role => "role",
        }
    }

    /// A row missing a required field is dropped.
    pub fn is_required(&self) -> bool {
        matches!(self, Field::Timestamp | Field::ClosedPnl)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepted header spellings per field, after [`canonical_key`] folding.
pub const FIELD_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::Timestamp,
        &["date", "time", "timestamp", "datetime", "date_time", "trade_time"],
    ),
    (
        Field::Market,
        &["market", "coin", "symbol", "instrument", "asset"],
    ),
    (Field::Side, &["side", "direction", "dir"]),
    (
        Field::TradeValue,
        &["trade_value", "value", "notional", "ntl"],
    ),
    (Field::Size, &["size", "sz", "qty", "quantity", "amount"]),
    (
        Field::Price,
        &["price", "px", "fill_price", "execution_price"],
    ),
    (
        Field::ClosedPnl,
        &["closed_pnl", "closedpnl", "pnl", "realized_pnl", "realised_pnl"],
    ),
    (Field::Fee, &["fee", "fees", "commission"]),
    (Field::Role, &["role", "liquidity", "maker_taker"]),
];

/// Fold a raw header into its lookup key: trimmed, BOM-stripped, lowercase,
/// with runs of spaces, hyphens, dots and slashes collapsed to `_`.
pub fn canonical_key(header: &str) -> String {
    let trimmed = header.trim().trim_start_matches('\u{feff}').trim();
    let mut key = String::with_capacity(trimmed.len());
    let mut pending_sep = false;
    for ch in trimmed.chars() {
        if matches!(ch, ' ' | '-' | '.' | '/' | '_' | '\t') {
            pending_sep = !key.is_empty();
            continue;
        }
        if pending_sep {
            key.push('_');
            pending_sep = false;
        }
        key.extend(ch.to_lowercase());
    }
    key
}

/// Look up the canonical field for a header, if any alias matches.
pub fn field_for_header(header: &str) -> Option<Field> {
    let key = canonical_key(header);
    FIELD_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&key.as_str()))
        .map(|(field, _)| *field)
}

/// Resolution of a header row: which column index feeds each field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    /// `(field, column index, original header)` in header order.
    pub mapped: Vec<(Field, usize, String)>,
    /// Headers that matched nothing, or repeated an already-mapped field.
    pub unmapped: Vec<String>,
}

impl ColumnMap {
    /// Resolve headers against [`FIELD_ALIASES`]. The first column that
    /// matches a field wins.
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut map = ColumnMap::default();
        for (idx, header) in headers.iter().enumerate() {
            let header = header.as_ref();
            match field_for_header(header) {
                Some(field) if map.index_of(field).is_none() => {
                    map.mapped.push((field, idx, header.to_string()));
                }
                _ => map.unmapped.push(header.to_string()),
            }
        }
        map
    }

    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.mapped
            .iter()
            .find(|(f, _, _)| *f == field)
            .map(|(_, idx, _)| *idx)
    }

    /// Required fields with no column at all.
    pub fn missing_required(&self) -> Vec<Field> {
        FIELD_ALIASES
            .iter()
            .map(|(field, _)| *field)
            .filter(|f| f.is_required() && self.index_of(*f).is_none())
            .collect()
    }
}
