//! Session engine implementation.
//!
//! One call to [`SessionEngine::start_session`] runs one work interval for
//! one task. Inside, a ticker and the control-signal channel are raced with
//! `tokio::select!`; whichever is ready first is handled, so a signal never
//! waits for the next tick boundary.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> (Expired | StoppedByUser | CompletedByUser)
//! ```
//!
//! Elapsed time is a count of logical ticks taken while running. Wall-clock
//! time is only used to pace the ticker, so pausing or clock adjustments
//! never change how many ticks an interval needs.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(progress_tx, DailyStats::new());
//! let (signal_tx, mut signal_rx) = tokio::sync::mpsc::channel(16);
//! let result = engine.start_session(&mut task, &config, &mut signal_rx).await?;
//! // caller persists `task` when result.needs_task_save()
//! ```

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::schedule::{Phase, SessionConfig};
use super::signal::ControlSignal;
use crate::error::SessionError;
use crate::events::{Event, ProgressSink};
use crate::stats::StatsSink;
use crate::task::Task;

/// Default length of one tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionExit {
    /// The work interval ran to zero.
    Expired,
    /// A stop signal arrived mid-interval.
    StoppedByUser,
    /// The user marked the task done mid-interval.
    CompletedByUser,
}

impl SessionExit {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionExit::Expired => "expired",
            SessionExit::StoppedByUser => "stopped_by_user",
            SessionExit::CompletedByUser => "completed_by_user",
        }
    }
}

/// Outcome of one [`SessionEngine::start_session`] call.
///
/// The engine never persists anything. The caller must save the task when
/// [`SessionResult::needs_task_save`] is true: `elapsed` seconds were added
/// to its current interval, `completed` means they were folded into the
/// total, and `task_marked_done` means its status changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub exit: SessionExit,
    /// True only when the work interval expired naturally.
    pub completed: bool,
    /// Work seconds attributed to the task during this call.
    pub elapsed: u64,
    pub task_marked_done: bool,
    /// Break that followed an expired interval.
    pub break_phase: Option<Phase>,
    /// The break was cut short by Stop or CompleteNow.
    pub break_skipped: bool,
}

impl SessionResult {
    fn ended_early(exit: SessionExit, elapsed: u64) -> Self {
        Self {
            exit,
            completed: false,
            elapsed,
            task_marked_done: exit == SessionExit::CompletedByUser,
            break_phase: None,
            break_skipped: false,
        }
    }

    pub fn needs_task_save(&self) -> bool {
        self.completed || self.task_marked_done || self.elapsed > 0
    }
}

/// Why a single countdown returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountdownEnd {
    Expired,
    Stop,
    CompleteNow,
}

/// Runs timed work intervals and the breaks that follow them.
///
/// The engine instance owns the count of completed work intervals used to
/// pick short vs. long breaks. That count lives as long as the instance
/// (in the CLI, the process) and is never persisted.
pub struct SessionEngine<P, S> {
    progress: P,
    stats: S,
    tick_period: Duration,
    completed_intervals: u64,
}

impl<P: ProgressSink, S: StatsSink> SessionEngine<P, S> {
    pub fn new(progress: P, stats: S) -> Self {
        Self {
            progress,
            stats,
            tick_period: TICK_PERIOD,
            completed_intervals: 0,
        }
    }

    /// Override the tick length. Zero is bumped to one millisecond.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period.max(Duration::from_millis(1));
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn completed_intervals(&self) -> u64 {
        self.completed_intervals
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    pub fn stats(&self) -> &S {
        &self.stats
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Run one work interval for `task`.
    ///
    /// The task is engine-owned until this returns; the `&mut` borrow
    /// enforces that. Fails without touching the task when it is already
    /// completed.
    pub async fn start_session(
        &mut self,
        task: &mut Task,
        config: &SessionConfig,
        signals: &mut mpsc::Receiver<ControlSignal>,
    ) -> Result<SessionResult, SessionError> {
        if task.is_completed() {
            tracing::warn!(task_id = task.id(), "refusing to start session on completed task");
            return Err(SessionError::TaskAlreadyCompleted { task_id: task.id() });
        }

        let work = config.work_duration();
        tracing::info!(task_id = task.id(), work_secs = work, "session started");
        self.progress.emit(Event::SessionStarted {
            task_id: task.id(),
            phase: Phase::Work,
            duration_secs: work,
            at: Utc::now(),
        });

        let (end, elapsed) = self
            .run_countdown(Phase::Work, work, Some(&mut *task), signals)
            .await;

        let result = match end {
            CountdownEnd::Expired => self.handle_completion(task, config, signals).await,
            CountdownEnd::Stop => SessionResult::ended_early(SessionExit::StoppedByUser, elapsed),
            CountdownEnd::CompleteNow => {
                task.mark_complete();
                SessionResult::ended_early(SessionExit::CompletedByUser, elapsed)
            }
        };

        tracing::info!(
            task_id = task.id(),
            exit = result.exit.as_str(),
            elapsed = result.elapsed,
            "session ended"
        );
        self.progress.emit(Event::SessionEnded {
            exit: result.exit,
            elapsed_secs: result.elapsed,
            at: Utc::now(),
        });
        Ok(result)
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Commit an expired work interval, then run the break it earns.
    async fn handle_completion(
        &mut self,
        task: &mut Task,
        config: &SessionConfig,
        signals: &mut mpsc::Receiver<ControlSignal>,
    ) -> SessionResult {
        let work = config.work_duration();
        task.complete_pomodoro();
        self.completed_intervals += 1;
        self.stats.record(Local::now().date_naive(), work);
        self.progress.emit(Event::PhaseCompleted {
            phase: Phase::Work,
            at: Utc::now(),
        });

        let break_phase = config.break_after(self.completed_intervals);
        let break_secs = config.duration_of(break_phase);
        tracing::debug!(
            completed_intervals = self.completed_intervals,
            phase = break_phase.label(),
            "break selected"
        );
        self.progress.emit(Event::BreakSelected {
            phase: break_phase,
            duration_secs: break_secs,
            completed_intervals: self.completed_intervals,
        });

        let (end, _) = self
            .run_countdown(break_phase, break_secs, None, signals)
            .await;
        let break_skipped = end != CountdownEnd::Expired;
        if !break_skipped {
            self.progress.emit(Event::PhaseCompleted {
                phase: break_phase,
                at: Utc::now(),
            });
        }

        SessionResult {
            exit: SessionExit::Expired,
            completed: true,
            elapsed: work,
            task_marked_done: false,
            break_phase: Some(break_phase),
            break_skipped,
        }
    }

    /// Count `duration` ticks of `phase`, accruing one second per running
    /// tick into `task` when given.
    ///
    /// Returns why it stopped and how many running ticks were taken.
    async fn run_countdown(
        &mut self,
        phase: Phase,
        duration: u64,
        mut task: Option<&mut Task>,
        signals: &mut mpsc::Receiver<ControlSignal>,
    ) -> (CountdownEnd, u64) {
        let period = self.tick_period;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut elapsed = 0u64;
        let mut paused = false;
        let mut signals_open = true;

        loop {
            tokio::select! {
                biased;

                signal = signals.recv(), if signals_open => match signal {
                    Some(ControlSignal::TogglePause) => {
                        paused = !paused;
                        let seconds_remaining = duration - elapsed;
                        if paused {
                            tracing::debug!(phase = phase.label(), seconds_remaining, "paused");
                            self.progress.emit(Event::Paused { phase, seconds_remaining, at: Utc::now() });
                        } else {
                            tracing::debug!(phase = phase.label(), seconds_remaining, "resumed");
                            ticker.reset();
                            self.progress.emit(Event::Resumed { phase, seconds_remaining, at: Utc::now() });
                        }
                    }
                    Some(ControlSignal::Stop) => return (CountdownEnd::Stop, elapsed),
                    Some(ControlSignal::CompleteNow) => return (CountdownEnd::CompleteNow, elapsed),
                    None => {
                        tracing::debug!("signal source closed, counting down without input");
                        signals_open = false;
                    }
                },

                _ = ticker.tick() => {
                    if !paused {
                        if let Some(task) = task.as_deref_mut() {
                            task.add_time(1);
                        }
                        elapsed += 1;
                    }
                    self.progress.emit(Event::Progress {
                        phase,
                        seconds_remaining: duration - elapsed,
                        paused,
                    });
                    if elapsed >= duration {
                        return (CountdownEnd::Expired, elapsed);
                    }
                }
            }
        }
    }
}
