//! Cell parsers for the normalizer.
//!
//! Every parser returns `None` (or `Unknown`) for input it cannot read; the
//! caller decides whether that drops the row or leaves the field unknown.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::domain::{Role, Side, TradeType};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    // Exchange trade-history exports: "01/15/2025 - 14:23:11"
    "%m/%d/%Y - %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Largest magnitude accepted for any amount. Sums over a ledger of bounded
/// values cannot overflow `f64`.
pub const MAX_ABS_AMOUNT: f64 = 1e15;

/// Parse a trade timestamp.
///
/// Offset-carrying inputs are converted to UTC. Date-only inputs resolve to
/// midnight. Bare integers are read as Unix epoch seconds (10 digits) or
/// milliseconds (13 digits).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return parse_epoch(s);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn parse_epoch(digits: &str) -> Option<NaiveDateTime> {
    let value: i64 = digits.parse().ok()?;
    let dt = match digits.len() {
        10 => DateTime::from_timestamp(value, 0)?,
        13 => DateTime::from_timestamp_millis(value)?,
        _ => return None,
    };
    Some(dt.naive_utc())
}

/// Parse a signed decimal. Tolerates thousands separators, a currency sign
/// and accounting-style parentheses for negatives (`(8.50)` is `-8.5`).
/// Rejects NaN, infinities and magnitudes above [`MAX_ABS_AMOUNT`]. Negative
/// zero reads as `0.0`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        let inner = inner.trim();
        if inner.starts_with(['-', '+', '(']) {
            return None;
        }
        return parse_unsigned(inner).map(|v| if v == 0.0 { 0.0 } else { -v });
    }
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let value = parse_unsigned(body)?;
    Some(if negative && value != 0.0 { -value } else { value })
}

fn parse_unsigned(body: &str) -> Option<f64> {
    let body = body.strip_prefix('$').unwrap_or(body);
    let cleaned: String = body.chars().filter(|c| *c != ',' && *c != '_').collect();
    if cleaned.is_empty() || cleaned.starts_with(['-', '+']) {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() || value.abs() > MAX_ABS_AMOUNT {
        return None;
    }
    Some(value)
}

/// Parse a decimal that must not be negative; negatives read as unknown.
pub fn parse_non_negative(raw: &str) -> Option<f64> {
    parse_decimal(raw).filter(|v| *v >= 0.0)
}

/// Classify a side label. Combined labels ("Long > Short") keep the order
/// they were written in.
pub fn parse_side(raw: &str) -> Side {
    let lower = raw.trim().to_lowercase();
    let long_at = lower.find("long");
    let short_at = lower.find("short");

    match (long_at, short_at) {
        (Some(l), Some(s)) if lower.contains('>') => {
            if l < s {
                Side::LongToShort
            } else {
                Side::ShortToLong
            }
        }
        (Some(_), None) => Side::Long,
        (None, Some(_)) => Side::Short,
        _ => Side::Unknown,
    }
}

/// Classify the kind of fill from the side label. Open and close keywords win
/// over a direction change marker.
pub fn parse_trade_type(raw: &str) -> TradeType {
    let lower = raw.trim().to_lowercase();
    if lower.is_empty() {
        TradeType::Unknown
    } else if lower.contains("open") {
        TradeType::Open
    } else if lower.contains("close") {
        TradeType::Close
    } else if lower.contains('>') {
        TradeType::Flip
    } else {
        TradeType::Other
    }
}

pub fn parse_role(raw: &str) -> Role {
    match raw.trim().to_lowercase().as_str() {
        "maker" => Role::Maker,
        "taker" => Role::Taker,
        _ => Role::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn timestamp_formats() {
        let expected = dt(2025, 1, 15, 14, 23, 11);
        for input in [
            "2025-01-15 14:23:11",
            "2025-01-15T14:23:11",
            "2025-01-15T14:23:11Z",
            "2025-01-15T15:23:11+01:00",
            "2025/01/15 14:23:11",
            "01/15/2025 - 14:23:11",
            "01/15/2025 14:23:11",
            "  2025-01-15 14:23:11  ",
        ] {
            assert_eq!(parse_timestamp(input), Some(expected), "input {input:?}");
        }
    }

    #[test]
    fn timestamp_fractional_seconds() {
        use chrono::Timelike;
        let parsed = parse_timestamp("2025-01-15 14:23:11.250").unwrap();
        assert_eq!(parsed.nanosecond(), 250_000_000);
    }

    #[test]
    fn timestamp_date_only_is_midnight() {
        assert_eq!(parse_timestamp("2025-01-15"), Some(dt(2025, 1, 15, 0, 0, 0)));
    }

    #[test]
    fn timestamp_epoch() {
        let expected = dt(2025, 1, 1, 0, 0, 0);
        assert_eq!(parse_timestamp("1735689600"), Some(expected));
        assert_eq!(parse_timestamp("1735689600000"), Some(expected));
        assert_eq!(parse_timestamp("12345"), None);
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2025-13-45 10:00:00"), None);
    }

    #[test]
    fn decimal_parsing() {
        assert_eq!(parse_decimal("15.25"), Some(15.25));
        assert_eq!(parse_decimal("-8.50"), Some(-8.5));
        assert_eq!(parse_decimal("+3"), Some(3.0));
        assert_eq!(parse_decimal("1,234.5"), Some(1234.5));
        assert_eq!(parse_decimal("$1,000"), Some(1000.0));
        assert_eq!(parse_decimal("-$5.00"), Some(-5.0));
        assert_eq!(parse_decimal(" 0 "), Some(0.0));
        assert_eq!(parse_decimal("(8.50)"), Some(-8.5));
        assert_eq!(parse_decimal("($1,000)"), Some(-1000.0));
        assert_eq!(parse_decimal("( 2 )"), Some(-2.0));
    }

    #[test]
    fn negative_zero_reads_as_zero() {
        for input in ["-0", "-0.00", "(0)", "-$0"] {
            let v = parse_decimal(input).unwrap();
            assert_eq!(v, 0.0, "input {input:?}");
            assert!(v.is_sign_positive(), "input {input:?}");
        }
    }

    #[test]
    fn decimal_rejects_overflowing_magnitudes() {
        assert_eq!(parse_decimal("1e308"), None);
        assert_eq!(parse_decimal("-1e16"), None);
        assert_eq!(parse_decimal("(1e300)"), None);
        assert_eq!(parse_decimal("1e15"), Some(MAX_ABS_AMOUNT));
    }

    #[test]
    fn decimal_rejects_non_numeric() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("n/a"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("inf"), None);
        assert_eq!(parse_decimal("--5"), None);
        assert_eq!(parse_decimal("$"), None);
        assert_eq!(parse_decimal("(5"), None);
        assert_eq!(parse_decimal("(-5)"), None);
        assert_eq!(parse_decimal("()"), None);
    }

    #[test]
    fn non_negative_rejects_negatives() {
        assert_eq!(parse_non_negative("2.5"), Some(2.5));
        assert_eq!(parse_non_negative("0"), Some(0.0));
        assert_eq!(parse_non_negative("-0.1"), None);
    }

    #[test]
    fn side_labels() {
        assert_eq!(parse_side("Long"), Side::Long);
        assert_eq!(parse_side("SHORT"), Side::Short);
        assert_eq!(parse_side("Open Long"), Side::Long);
        assert_eq!(parse_side("Close Short"), Side::Short);
        assert_eq!(parse_side("Long > Short"), Side::LongToShort);
        assert_eq!(parse_side("short > long"), Side::ShortToLong);
        assert_eq!(parse_side("Long Short"), Side::Unknown);
        assert_eq!(parse_side("Buy"), Side::Unknown);
        assert_eq!(parse_side(""), Side::Unknown);
    }

    #[test]
    fn trade_type_labels() {
        assert_eq!(parse_trade_type("Open Long"), TradeType::Open);
        assert_eq!(parse_trade_type("close short"), TradeType::Close);
        assert_eq!(parse_trade_type("Long > Short"), TradeType::Flip);
        assert_eq!(parse_trade_type("Long"), TradeType::Other);
        assert_eq!(parse_trade_type("  "), TradeType::Unknown);
    }

    #[test]
    fn role_labels() {
        assert_eq!(parse_role("Maker"), Role::Maker);
        assert_eq!(parse_role(" TAKER "), Role::Taker);
        assert_eq!(parse_role("crossed"), Role::Unknown);
    }
}
