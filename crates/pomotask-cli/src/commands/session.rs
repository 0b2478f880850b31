//! Interactive work sessions.

use chrono::Utc;
use clap::Args;
use pomotask_core::{
    Config, ControlSignal, CoreError, Database, ProgressSink, SessionConfig, SessionEngine,
    SessionExit, SessionResult, Task,
};
use tokio::sync::mpsc;

use crate::keys::{spawn_listener, RawModeGuard};
use crate::render::{format_duration, TerminalRenderer};

#[derive(Args)]
pub struct StartArgs {
    /// Task ID
    id: i64,
    /// Work intervals to run back to back
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    rounds: u32,
    /// Override the configured work length, in minutes
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    work: Option<u32>,
}

fn session_config(config: &Config, work_override: Option<u32>) -> Result<SessionConfig, CoreError> {
    let base = config.session_config()?;
    match work_override {
        None => Ok(base),
        Some(work) => Ok(SessionConfig::new(
            u64::from(work) * 60,
            base.break_duration(),
            base.long_break_duration(),
            base.pomodoros_before_long_break(),
        )?),
    }
}

/// Run up to `rounds` sessions, saving after each one.
///
/// Stops early on anything but an uninterrupted interval and break.
async fn run_rounds<P: ProgressSink>(
    engine: &mut SessionEngine<P, Database>,
    task: &mut Task,
    config: &SessionConfig,
    signals: &mut mpsc::Receiver<ControlSignal>,
    rounds: u32,
) -> Result<Vec<SessionResult>, CoreError> {
    let mut results = Vec::new();
    for _ in 0..rounds {
        let started_at = Utc::now();
        let result = engine.start_session(task, config, signals).await?;

        let db = engine.stats();
        if result.needs_task_save() {
            db.save_task(task)?;
        }
        db.record_session(task.id(), &result, started_at, Utc::now())?;

        let keep_going = result.exit == SessionExit::Expired && !result.break_skipped;
        results.push(result);
        if !keep_going {
            break;
        }
    }
    Ok(results)
}

pub fn run(args: StartArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let session_config = session_config(&config, args.work)?;
    let db = Database::open()?;
    let mut task = db.require_task(args.id)?;

    let keys = config.key_bindings();
    let renderer = TerminalRenderer::new(
        task.title(),
        keys,
        config.display.show_seconds,
        config.display.bell_on_phase_end,
    );
    let mut engine = SessionEngine::new(renderer, db);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let (tx, mut rx) = mpsc::channel(16);
    let (guard, listener) = match RawModeGuard::enable() {
        Ok(guard) => (Some(guard), Some(spawn_listener(keys, tx))),
        Err(e) => {
            tracing::warn!(error = %e, "no interactive terminal, running without key controls");
            drop(tx);
            (None, None)
        }
    };

    let outcome = runtime.block_on(run_rounds(
        &mut engine,
        &mut task,
        &session_config,
        &mut rx,
        args.rounds,
    ));

    drop(rx);
    if let Some(listener) = listener {
        if listener.join().is_err() {
            tracing::warn!("key listener panicked");
        }
    }
    drop(guard);

    let results = outcome?;
    let worked: u64 = results.iter().map(|r| r.elapsed).sum();
    let completed = results.iter().filter(|r| r.completed).count();
    println!(
        "{}: {} pomodoro(s) completed, {} worked this run, {} total.",
        task.title(),
        completed,
        format_duration(worked),
        format_duration(task.tracked_time()),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_override_keeps_breaks() {
        let config = Config::default();
        let sc = session_config(&config, Some(50)).unwrap();
        assert_eq!(sc.work_duration(), 3000);
        assert_eq!(sc.break_duration(), 300);
        assert_eq!(sc.pomodoros_before_long_break(), 4);
    }

    #[test]
    fn no_override_uses_config() {
        let config = Config::default();
        assert_eq!(session_config(&config, None).unwrap(), config.session_config().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_stop_after_interrupted_session() {
        let db = Database::open_memory().unwrap();
        let mut task = db.add_task("loop").unwrap();
        let config = SessionConfig::new(2, 1, 1, 4).unwrap();
        let mut engine = SessionEngine::new(Vec::new(), db);
        let (tx, mut rx) = mpsc::channel(1);
        tx.send(ControlSignal::Stop).await.unwrap();

        let results = run_rounds(&mut engine, &mut task, &config, &mut rx, 3)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].exit, SessionExit::StoppedByUser);
        assert_eq!(engine.stats().recent_sessions(10).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_run_back_to_back_and_persist() {
        let db = Database::open_memory().unwrap();
        let mut task = db.add_task("loop").unwrap();
        let config = SessionConfig::new(2, 1, 1, 2).unwrap();
        let mut engine = SessionEngine::new((), db);
        let (_tx, mut rx) = mpsc::channel(1);

        let results = run_rounds(&mut engine, &mut task, &config, &mut rx, 3)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        let stored = engine.stats().require_task(task.id()).unwrap();
        assert_eq!(stored.pomodoros_completed(), 3);
        assert_eq!(stored.total_pomodoro_time(), 6);
    }
}
