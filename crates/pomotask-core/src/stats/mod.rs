//! Productivity statistics keyed by calendar date.
//!
//! The session engine reports each fully completed work interval through
//! [`StatsSink::record`]. Aggregation and presentation live elsewhere.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Receiver of worked seconds per day.
///
/// Implementations must not fail the caller; storage problems are logged
/// and dropped.
pub trait StatsSink {
    fn record(&mut self, date: NaiveDate, seconds: u64);
}

impl<T: StatsSink + ?Sized> StatsSink for &mut T {
    fn record(&mut self, date: NaiveDate, seconds: u64) {
        (**self).record(date, seconds);
    }
}

/// In-memory per-day accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    by_date: BTreeMap<NaiveDate, u64>,
}

impl DailyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seconds_on(&self, date: NaiveDate) -> u64 {
        self.by_date.get(&date).copied().unwrap_or(0)
    }

    pub fn total_seconds(&self) -> u64 {
        self.by_date.values().sum()
    }

    /// Days with recorded work, oldest first.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.by_date.iter().map(|(d, s)| (*d, *s))
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

impl StatsSink for DailyStats {
    fn record(&mut self, date: NaiveDate, seconds: u64) {
        let slot = self.by_date.entry(date).or_insert(0);
        *slot = slot.saturating_add(seconds);
    }
}

/// Summary over everything stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub today_secs: u64,
    pub total_secs: u64,
    pub days_active: u64,
    pub total_pomodoros: u64,
    /// Consecutive days up to and including today with recorded work.
    pub current_streak_days: u64,
}

/// Length of the run of consecutive days ending at `today`.
///
/// `days` must be sorted ascending and free of duplicates.
pub fn streak_ending(days: &[NaiveDate], today: NaiveDate) -> u64 {
    let mut expected = today;
    let mut streak = 0;
    for day in days.iter().rev() {
        if *day > expected {
            continue;
        }
        if *day != expected {
            break;
        }
        streak += 1;
        match expected.pred_opt() {
            Some(prev) => expected = prev,
            None => break,
        }
    }
    streak
}
