//! Ledger fingerprinting — deterministic identification of a trade history.
//!
//! The fingerprint is a BLAKE3 digest over every record in ledger order, so
//! two exports with the same trades produce the same identity regardless of
//! column order or header spelling in the source file.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Ledger, Role};

/// Hex-encoded BLAKE3 digest of a ledger's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerFingerprint(pub String);

impl LedgerFingerprint {
    pub fn of(ledger: &Ledger) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(ledger.len() as u64).to_le_bytes());

        for trade in ledger {
            hasher.update(trade.timestamp.to_string().as_bytes());
            hasher.update(&trade.closed_pnl.to_le_bytes());
            update_opt_str(&mut hasher, trade.market.as_deref());
            hasher.update(trade.side.as_str().as_bytes());
            hasher.update(trade.trade_type.as_str().as_bytes());
            hasher.update(match trade.role {
                Role::Maker => b"m",
                Role::Taker => b"t",
                Role::Unknown => b"?",
            });
            for value in [trade.trade_value, trade.size, trade.price, trade.fee] {
                update_opt_f64(&mut hasher, value);
            }
        }

        Self(hasher.finalize().to_hex().to_string())
    }

    /// Leading `n` hex characters, for directory names and log lines.
    pub fn short(&self, n: usize) -> &str {
        &self.0[..n.min(self.0.len())]
    }
}

impl fmt::Display for LedgerFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Presence byte first, so `None` and an empty string hash differently.
fn update_opt_str(hasher: &mut blake3::Hasher, value: Option<&str>) {
    match value {
        Some(s) => {
            hasher.update(&[1]);
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

fn update_opt_f64(hasher: &mut blake3::Hasher, value: Option<f64>) {
    match value {
        Some(v) => {
            hasher.update(&[1]);
            hasher.update(&v.to_le_bytes());
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TradeRecord;
    use chrono::NaiveDate;

    fn ledger(pnls: &[f64]) -> Ledger {
        let base = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Ledger::from_records(
            pnls.iter()
                .enumerate()
                .map(|(i, &p)| TradeRecord::new(base + chrono::Duration::hours(i as i64), p))
                .collect(),
        )
    }

    #[test]
    fn deterministic() {
        assert_eq!(ledger(&[1.0, -2.0]).fingerprint(), ledger(&[1.0, -2.0]).fingerprint());
    }

    #[test]
    fn sensitive_to_content() {
        assert_ne!(ledger(&[1.0, -2.0]).fingerprint(), ledger(&[1.0, -2.5]).fingerprint());
        assert_ne!(ledger(&[]).fingerprint(), ledger(&[0.0]).fingerprint());
    }

    #[test]
    fn sensitive_to_optional_fields() {
        let plain = ledger(&[1.0]);
        let mut records = plain.trades().to_vec();
        records[0].fee = Some(0.0);
        assert_ne!(plain.fingerprint(), Ledger::from_records(records).fingerprint());
    }

    #[test]
    fn short_prefix() {
        let fp = ledger(&[1.0]).fingerprint();
        assert_eq!(fp.0.len(), 64);
        assert_eq!(fp.short(12).len(), 12);
        assert!(fp.0.starts_with(fp.short(12)));
    }
}
