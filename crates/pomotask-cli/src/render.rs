//! Terminal rendering of session progress.

use std::io::{self, Stdout, Write};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use pomotask_core::{Event, KeyBindings, Phase, ProgressSink, SessionExit};

/// `1h 05m`, `12m`, `0m`.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

/// Countdown display: `mm:ss`, or rounded-up minutes when seconds are hidden.
pub fn format_clock(secs: u64, show_seconds: bool) -> String {
    if show_seconds {
        format!("{:02}:{:02}", secs / 60, secs % 60)
    } else {
        format!("{}m", secs.div_ceil(60))
    }
}

/// Draws one status line per progress event, rewriting it in place.
///
/// Raw mode is usually on while this runs, so finished lines end with
/// `\r\n`.
pub struct TerminalRenderer {
    out: Stdout,
    title: String,
    keys: KeyBindings,
    show_seconds: bool,
    bell: bool,
}

impl TerminalRenderer {
    pub fn new(title: &str, keys: KeyBindings, show_seconds: bool, bell: bool) -> Self {
        Self {
            out: io::stdout(),
            title: title.to_string(),
            keys,
            show_seconds,
            bell,
        }
    }

    fn status_line(&mut self, phase: Phase, seconds_remaining: u64, paused: bool) -> io::Result<()> {
        let state = if paused { "  [paused]" } else { "" };
        let line = format!(
            "{:<11} {}{}   {} pause  {} stop  {} done  | {}",
            phase.label(),
            format_clock(seconds_remaining, self.show_seconds),
            state,
            self.keys.toggle_pause,
            self.keys.stop,
            self.keys.complete,
            self.title,
        );
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(line))?;
        self.out.flush()
    }

    fn finish_line(&mut self, text: String) -> io::Result<()> {
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(text),
            Print("\r\n")
        )?;
        self.out.flush()
    }

    fn draw(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Progress {
                phase,
                seconds_remaining,
                paused,
            } => self.status_line(phase, seconds_remaining, paused),
            Event::Paused {
                phase,
                seconds_remaining,
                ..
            } => self.status_line(phase, seconds_remaining, true),
            Event::Resumed {
                phase,
                seconds_remaining,
                ..
            } => self.status_line(phase, seconds_remaining, false),
            Event::PhaseCompleted { phase, .. } => {
                if self.bell {
                    queue!(self.out, Print('\u{7}'))?;
                }
                let text = if phase.is_break() {
                    format!("{} over.", phase.label())
                } else {
                    format!("{} finished.", phase.label())
                };
                self.finish_line(text)
            }
            Event::BreakSelected {
                phase,
                duration_secs,
                completed_intervals,
            } => self.finish_line(format!(
                "Pomodoro #{completed_intervals} done. {} for {}.",
                phase.label(),
                format_clock(duration_secs, self.show_seconds)
            )),
            Event::SessionEnded {
                exit: SessionExit::StoppedByUser,
                elapsed_secs,
                ..
            } => self.finish_line(format!("Stopped after {}.", format_clock(elapsed_secs, true))),
            Event::SessionEnded {
                exit: SessionExit::CompletedByUser,
                ..
            } => self.finish_line(format!("Marked '{}' as done.", self.title)),
            Event::SessionStarted { .. } | Event::SessionEnded { .. } => Ok(()),
        }
    }
}

impl ProgressSink for TerminalRenderer {
    fn emit(&mut self, event: Event) {
        if let Err(e) = self.draw(event) {
            tracing::debug!(error = %e, "failed to draw progress");
        }
    }
}
