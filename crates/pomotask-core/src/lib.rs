//! # Pomotask Core Library
//!
//! This library provides the core logic for Pomotask, a personal task tracker
//! built around timed work sessions. The `pomotask` CLI is a thin layer over
//! the same types.
//!
//! ## Architecture
//!
//! - **Session Engine**: runs one work interval for one task, racing a ticker
//!   against pause/stop/complete signals, then runs the earned break
//! - **Task**: per-task accounting of seconds worked and pomodoros completed
//! - **Stats**: seconds worked per calendar day
//! - **Storage**: SQLite task list and statistics, TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`Task`]: Work item whose time the engine accounts for
//! - [`Database`]: Task and statistics persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, SessionError, ValidationError};
pub use events::{Event, ProgressSink};
pub use stats::{DailyStats, Stats, StatsSink};
pub use storage::{Config, Database, TaskFilter};
pub use task::{Task, TaskStatus};
pub use timer::{
    ControlSignal, KeyBindings, Phase, SessionConfig, SessionEngine, SessionExit, SessionResult,
};
