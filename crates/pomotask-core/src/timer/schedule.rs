use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn is_break(&self) -> bool {
        !matches!(self, Phase::Work)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Work",
            Phase::ShortBreak => "Short Break",
            Phase::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Interval lengths (seconds) and break cadence for a session.
///
/// Every field is at least 1; the only way to build one is through
/// [`SessionConfig::new`], which enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    work_duration: u64,
    break_duration: u64,
    long_break_duration: u64,
    pomodoros_before_long_break: u32,
}

impl SessionConfig {
    pub fn new(
        work_duration: u64,
        break_duration: u64,
        long_break_duration: u64,
        pomodoros_before_long_break: u32,
    ) -> Result<Self, ValidationError> {
        let checks: [(&'static str, u64); 4] = [
            ("work_duration", work_duration),
            ("break_duration", break_duration),
            ("long_break_duration", long_break_duration),
            (
                "pomodoros_before_long_break",
                u64::from(pomodoros_before_long_break),
            ),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ValidationError::NonPositiveDuration { field });
            }
        }
        Ok(Self {
            work_duration,
            break_duration,
            long_break_duration,
            pomodoros_before_long_break,
        })
    }

    /// Same as [`SessionConfig::new`] with durations given in minutes.
    pub fn from_minutes(
        work_min: u32,
        break_min: u32,
        long_break_min: u32,
        pomodoros_before_long_break: u32,
    ) -> Result<Self, ValidationError> {
        Self::new(
            u64::from(work_min) * 60,
            u64::from(break_min) * 60,
            u64::from(long_break_min) * 60,
            pomodoros_before_long_break,
        )
    }

    pub fn work_duration(&self) -> u64 {
        self.work_duration
    }

    pub fn break_duration(&self) -> u64 {
        self.break_duration
    }

    pub fn long_break_duration(&self) -> u64 {
        self.long_break_duration
    }

    pub fn pomodoros_before_long_break(&self) -> u32 {
        self.pomodoros_before_long_break
    }

    pub fn duration_of(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Work => self.work_duration,
            Phase::ShortBreak => self.break_duration,
            Phase::LongBreak => self.long_break_duration,
        }
    }

    /// Break that follows the `completed_intervals`-th finished work interval.
    ///
    /// Long iff the count is a positive multiple of the cadence.
    pub fn break_after(&self, completed_intervals: u64) -> Phase {
        let cadence = u64::from(self.pomodoros_before_long_break);
        if completed_intervals > 0 && completed_intervals % cadence == 0 {
            Phase::LongBreak
        } else {
            Phase::ShortBreak
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            work_duration: 25 * 60,
            break_duration: 5 * 60,
            long_break_duration: 15 * 60,
            pomodoros_before_long_break: 4,
        }
    }
}
