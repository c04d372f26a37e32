//! Time-based aggregation — daily, hourly, weekday and monthly buckets.
//!
//! Buckets are keyed on the trade timestamp as written in the source (no
//! timezone conversion).

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use tradelens_core::{Ledger, TradeRecord};

pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Running tally shared by every bucket kind.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Tally {
    trades: usize,
    winners: usize,
    losers: usize,
    pnl: f64,
}

impl Tally {
    fn add(&mut self, trade: &TradeRecord) {
        self.trades += 1;
        self.pnl += trade.closed_pnl;
        if trade.is_winner() {
            self.winners += 1;
        } else if trade.is_loser() {
            self.losers += 1;
        }
    }

    fn win_rate(&self) -> Option<f64> {
        let decided = self.winners + self.losers;
        (decided > 0).then(|| self.winners as f64 / decided as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub trade_count: usize,
    pub pnl: f64,
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: u32,
    pub trade_count: usize,
    pub pnl: f64,
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayBucket {
    /// English weekday name, "Monday" … "Sunday".
    pub weekday: String,
    pub trade_count: usize,
    pub pnl: f64,
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    pub trade_count: usize,
    pub pnl: f64,
    pub mean_pnl: f64,
    /// Sum of known trade values.
    pub traded_value: f64,
    /// Cumulative pnl at the end of the month.
    pub cumulative_pnl: f64,
}

/// Trading-activity profile of a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyDetail {
    pub trading_days: usize,
    pub mean_trades_per_day: Option<f64>,
    pub max_trades_per_day: usize,
    pub weekday_counts: Vec<WeekdayBucket>,
    pub most_active_weekday: Option<String>,
}

impl FrequencyDetail {
    pub fn compute(ledger: &Ledger) -> Self {
        let daily = daily_buckets(ledger);
        let weekday_counts = weekday_buckets(ledger);

        let most_active_weekday = busiest(weekday_counts.iter().map(|b| b.trade_count))
            .map(|idx| weekday_counts[idx].weekday.clone());

        Self {
            trading_days: daily.len(),
            mean_trades_per_day: (!daily.is_empty())
                .then(|| ledger.len() as f64 / daily.len() as f64),
            max_trades_per_day: daily.iter().map(|d| d.trade_count).max().unwrap_or(0),
            weekday_counts,
            most_active_weekday,
        }
    }
}

/// One bucket per calendar day with trades, ascending.
pub fn daily_buckets(ledger: &Ledger) -> Vec<DailyBucket> {
    let mut days: BTreeMap<NaiveDate, Tally> = BTreeMap::new();
    for trade in ledger {
        days.entry(trade.timestamp.date()).or_default().add(trade);
    }
    days.into_iter()
        .map(|(date, t)| DailyBucket {
            date,
            trade_count: t.trades,
            pnl: t.pnl,
            win_rate: t.win_rate(),
        })
        .collect()
}

/// Exactly 24 buckets, hour 0 through 23.
pub fn hourly_buckets(ledger: &Ledger) -> Vec<HourlyBucket> {
    let mut hours = [Tally::default(); 24];
    for trade in ledger {
        hours[trade.timestamp.hour() as usize].add(trade);
    }
    hours
        .iter()
        .enumerate()
        .map(|(hour, t)| HourlyBucket {
            hour: hour as u32,
            trade_count: t.trades,
            pnl: t.pnl,
            win_rate: t.win_rate(),
        })
        .collect()
}

/// Exactly 7 buckets, Monday through Sunday.
pub fn weekday_buckets(ledger: &Ledger) -> Vec<WeekdayBucket> {
    let mut days = [Tally::default(); 7];
    for trade in ledger {
        days[trade.timestamp.weekday().num_days_from_monday() as usize].add(trade);
    }
    WEEKDAYS
        .iter()
        .zip(days.iter())
        .map(|(day, t)| WeekdayBucket {
            weekday: weekday_name(*day).to_string(),
            trade_count: t.trades,
            pnl: t.pnl,
            win_rate: t.win_rate(),
        })
        .collect()
}

/// One bucket per calendar month with trades, ascending.
pub fn monthly_buckets(ledger: &Ledger) -> Vec<MonthlyBucket> {
    let mut months: BTreeMap<(i32, u32), (Tally, f64)> = BTreeMap::new();
    for trade in ledger {
        let key = (trade.timestamp.year(), trade.timestamp.month());
        let (tally, traded) = months.entry(key).or_default();
        tally.add(trade);
        *traded += trade.trade_value.unwrap_or(0.0);
    }

    let mut cumulative = 0.0;
    months
        .into_iter()
        .map(|((year, month), (t, traded_value))| {
            cumulative += t.pnl;
            MonthlyBucket {
                year,
                month,
                trade_count: t.trades,
                pnl: t.pnl,
                mean_pnl: t.pnl / t.trades as f64,
                traded_value,
                cumulative_pnl: cumulative,
            }
        })
        .collect()
}

/// Hour with the most trades; ties go to the earliest hour.
pub fn most_active_hour(hourly: &[HourlyBucket]) -> Option<u32> {
    busiest(hourly.iter().map(|b| b.trade_count)).map(|idx| hourly[idx].hour)
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Index of the first maximum among non-zero counts.
fn busiest(counts: impl Iterator<Item = usize>) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (idx, count) in counts.enumerate() {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((idx, count)),
        }
    }
    best.map(|(idx, _)| idx)
}
