use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::timer::{Phase, SessionExit};

/// Every state change in a running session produces an Event.
/// Renderers consume them; the engine never draws anything itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        task_id: i64,
        phase: Phase,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Emitted exactly once per tick, paused or not.
    Progress {
        phase: Phase,
        seconds_remaining: u64,
        paused: bool,
    },
    Paused {
        phase: Phase,
        seconds_remaining: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        phase: Phase,
        seconds_remaining: u64,
        at: DateTime<Utc>,
    },
    PhaseCompleted {
        phase: Phase,
        at: DateTime<Utc>,
    },
    BreakSelected {
        phase: Phase,
        duration_secs: u64,
        completed_intervals: u64,
    },
    SessionEnded {
        exit: SessionExit,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_progress(&self) -> bool {
        matches!(self, Event::Progress { .. })
    }
}

/// Receiver of session events.
pub trait ProgressSink {
    fn emit(&mut self, event: Event);
}

/// Discards everything.
impl ProgressSink for () {
    fn emit(&mut self, _event: Event) {}
}

impl ProgressSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

/// Forwards to a renderer task. A dropped receiver is not an error: the
/// session keeps counting without a display.
impl ProgressSink for mpsc::UnboundedSender<Event> {
    fn emit(&mut self, event: Event) {
        if self.send(event).is_err() {
            tracing::trace!("progress receiver dropped");
        }
    }
}

impl<T: ProgressSink + ?Sized> ProgressSink for &mut T {
    fn emit(&mut self, event: Event) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_serializes_with_type_tag() {
        let ev = Event::Progress {
            phase: Phase::Work,
            seconds_remaining: 42,
            paused: false,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["phase"], "work");
        assert_eq!(json["seconds_remaining"], 42);
    }

    #[test]
    fn unbounded_sender_survives_dropped_receiver() {
        let (mut tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.emit(Event::PhaseCompleted {
            phase: Phase::ShortBreak,
            at: Utc::now(),
        });
    }
}
