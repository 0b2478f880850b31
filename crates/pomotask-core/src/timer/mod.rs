mod engine;
mod schedule;
mod signal;

pub use engine::{SessionEngine, SessionExit, SessionResult, TICK_PERIOD};
pub use schedule::{Phase, SessionConfig};
pub use signal::{ControlSignal, KeyBindings};
