//! TradeRecord — one executed trade from an exported trade history.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction label attached to a fill.
///
/// Treated as an opaque categorical label: direction-change variants are
/// recorded as written, no position model is derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
    LongToShort,
    ShortToLong,
    Unknown,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
            Side::LongToShort => "long_to_short",
            Side::ShortToLong => "short_to_long",
            Side::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of fill, read from keywords in the side label.
///
/// "Open Long" is `Open`, "Close Short" is `Close`, "Long > Short" is `Flip`.
/// Any other non-empty label is `Other`; a missing label is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    Open,
    Close,
    Flip,
    Other,
    Unknown,
}

impl TradeType {
    pub const ALL: [TradeType; 5] = [
        TradeType::Open,
        TradeType::Close,
        TradeType::Flip,
        TradeType::Other,
        TradeType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Open => "open",
            TradeType::Close => "close",
            TradeType::Flip => "flip",
            TradeType::Other => "other",
            TradeType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TradeType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let names: Vec<&str> = TradeType::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown trade type '{wanted}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Liquidity role of the fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Maker,
    Taker,
    Unknown,
}

/// A single executed trade with its realized profit/loss.
///
/// Optional numeric fields are `None` when the input did not carry a usable
/// value; they are never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Required ──
    pub timestamp: NaiveDateTime,
    pub closed_pnl: f64,

    // ── Identification ──
    pub market: Option<String>,
    pub side: Side,
    pub trade_type: TradeType,
    pub role: Role,

    // ── Execution (non-negative when known) ──
    pub trade_value: Option<f64>,
    pub size: Option<f64>,
    pub price: Option<f64>,
    pub fee: Option<f64>,
}

impl TradeRecord {
    /// Minimal record: timestamp and pnl, everything else unknown.
    pub fn new(timestamp: NaiveDateTime, closed_pnl: f64) -> Self {
        Self {
            timestamp,
            closed_pnl,
            market: None,
            side: Side::Unknown,
            trade_type: TradeType::Unknown,
            role: Role::Unknown,
            trade_value: None,
            size: None,
            price: None,
            fee: None,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.closed_pnl > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.closed_pnl < 0.0
    }

    /// PnL after fees, when the fee is known.
    pub fn net_pnl(&self) -> Option<f64> {
        self.fee.map(|fee| self.closed_pnl - fee)
    }
}
