//! Integration tests for the session engine.
//!
//! Control signals are sent from a spawned task after a virtual sleep, so
//! every test runs on tokio's paused clock and finishes instantly.

use std::time::Duration;

use chrono::Utc;
use pomotask_core::{
    ControlSignal, DailyStats, Event, Phase, SessionConfig, SessionEngine, SessionExit, Task,
};
use proptest::prelude::*;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

fn task() -> Task {
    Task::new(1, "Write the report", Utc::now()).unwrap()
}

/// Send `signal` once `after` of virtual time has passed.
fn send_after(tx: &mpsc::Sender<ControlSignal>, after: Duration, signal: ControlSignal) {
    let tx = tx.clone();
    tokio::spawn(async move {
        time::sleep(after).await;
        tx.send(signal).await.unwrap();
    });
}

/// `(seconds_remaining, paused)` for every work-phase Progress event.
fn work_progress(events: &[Event]) -> Vec<(u64, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Progress {
                phase: Phase::Work,
                seconds_remaining,
                paused,
            } => Some((*seconds_remaining, *paused)),
            _ => None,
        })
        .collect()
}

fn break_selections(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::BreakSelected { .. }))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_expiry_counts_down_every_second() {
    let mut engine = SessionEngine::new(Vec::new(), DailyStats::new());
    let config = SessionConfig::new(4, 1, 1, 4).unwrap();
    let (_tx, mut rx) = mpsc::channel(4);
    let mut t = task();

    let result = engine.start_session(&mut t, &config, &mut rx).await.unwrap();

    assert_eq!(result.exit, SessionExit::Expired);
    assert_eq!(
        work_progress(engine.progress()),
        vec![(3, false), (2, false), (1, false), (0, false)]
    );
    assert_eq!(t.total_pomodoro_time(), 4);
    assert_eq!(engine.stats().total_seconds(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stop_after_three_ticks_keeps_partial_time() {
    let mut engine = SessionEngine::new(Vec::new(), DailyStats::new());
    let config = SessionConfig::new(10, 2, 4, 4).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    send_after(&tx, Duration::from_millis(3_500), ControlSignal::Stop);
    let mut t = task();

    let result = engine.start_session(&mut t, &config, &mut rx).await.unwrap();

    assert_eq!(result.exit, SessionExit::StoppedByUser);
    assert!(!result.completed);
    assert_eq!(result.elapsed, 3);
    assert_eq!(result.break_phase, None);
    assert!(result.needs_task_save());
    assert_eq!(t.current_pomodoro_time(), 3);
    assert_eq!(t.total_pomodoro_time(), 0);
    assert_eq!(t.pomodoros_completed(), 0);
    assert!(!t.is_completed());
    assert!(engine.stats().is_empty());
    assert_eq!(engine.completed_intervals(), 0);
    assert_eq!(break_selections(engine.progress()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_complete_now_marks_task_done_without_break() {
    let mut engine = SessionEngine::new(Vec::new(), DailyStats::new());
    let config = SessionConfig::new(10, 2, 4, 4).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    send_after(&tx, Duration::from_millis(2_500), ControlSignal::CompleteNow);
    let mut t = task();

    let result = engine.start_session(&mut t, &config, &mut rx).await.unwrap();

    assert_eq!(result.exit, SessionExit::CompletedByUser);
    assert!(result.task_marked_done);
    assert!(!result.completed);
    assert_eq!(result.elapsed, 2);
    assert_eq!(result.break_phase, None);
    assert!(t.is_completed());
    assert_eq!(t.current_pomodoro_time(), 2);
    assert_eq!(t.total_pomodoro_time(), 0);
    assert_eq!(t.pomodoros_completed(), 0);
    assert!(engine.stats().is_empty());
    assert_eq!(break_selections(engine.progress()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pause_freezes_time_and_ticks_to_expiry() {
    let mut engine = SessionEngine::new(Vec::new(), DailyStats::new());
    let config = SessionConfig::new(5, 1, 1, 4).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    send_after(&tx, Duration::from_millis(3_500), ControlSignal::TogglePause);
    send_after(&tx, Duration::from_millis(103_500), ControlSignal::TogglePause);
    let mut t = task();

    let started = Instant::now();
    let result = engine.start_session(&mut t, &config, &mut rx).await.unwrap();

    assert_eq!(result.exit, SessionExit::Expired);
    assert_eq!(result.elapsed, 5);
    assert_eq!(t.total_pomodoro_time(), 5);

    let progress = work_progress(engine.progress());
    let running: Vec<u64> = progress
        .iter()
        .filter(|(_, paused)| !paused)
        .map(|(remaining, _)| *remaining)
        .collect();
    assert_eq!(running, vec![4, 3, 2, 1, 0]);

    // One Progress per tick while paused, frozen at the pause point.
    let paused: Vec<&(u64, bool)> = progress.iter().filter(|(_, p)| *p).collect();
    assert_eq!(paused.len(), 100);
    assert!(paused.iter().all(|(remaining, _)| *remaining == 2));

    let events = engine.progress();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Paused { seconds_remaining: 2, .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Resumed { seconds_remaining: 2, .. })));

    // 3.5s running + 100s paused + 2s running after the ticker reset + 1s break
    assert_eq!(started.elapsed(), Duration::from_millis(106_500));
}

#[tokio::test(start_paused = true)]
async fn test_long_break_cadence_across_sessions() {
    let mut engine = SessionEngine::new(Vec::new(), DailyStats::new());
    let config = SessionConfig::new(2, 1, 3, 4).unwrap();
    let (_tx, mut rx) = mpsc::channel(4);
    let mut t = task();

    let mut breaks = Vec::new();
    for _ in 0..8 {
        let result = engine.start_session(&mut t, &config, &mut rx).await.unwrap();
        assert!(result.completed);
        breaks.push(result.break_phase);
    }

    let short = Some(Phase::ShortBreak);
    let long = Some(Phase::LongBreak);
    assert_eq!(
        breaks,
        vec![short, short, short, long, short, short, short, long]
    );
    assert_eq!(engine.completed_intervals(), 8);
    assert_eq!(t.pomodoros_completed(), 8);
    assert_eq!(t.total_pomodoro_time(), 16);
    assert_eq!(engine.stats().total_seconds(), 16);

    let counts: Vec<u64> = engine
        .progress()
        .iter()
        .filter_map(|e| match e {
            Event::BreakSelected {
                completed_intervals,
                ..
            } => Some(*completed_intervals),
            _ => None,
        })
        .collect();
    assert_eq!(counts, (1..=8).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn test_stopped_session_does_not_advance_cadence() {
    let mut engine = SessionEngine::new((), DailyStats::new());
    let config = SessionConfig::new(3, 1, 2, 2).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    let mut t = task();

    let first = engine.start_session(&mut t, &config, &mut rx).await.unwrap();
    assert_eq!(first.break_phase, Some(Phase::ShortBreak));

    send_after(&tx, Duration::from_millis(1_500), ControlSignal::Stop);
    let stopped = engine.start_session(&mut t, &config, &mut rx).await.unwrap();
    assert_eq!(stopped.exit, SessionExit::StoppedByUser);
    assert_eq!(engine.completed_intervals(), 1);

    let third = engine.start_session(&mut t, &config, &mut rx).await.unwrap();
    assert_eq!(third.break_phase, Some(Phase::LongBreak));
    assert_eq!(engine.completed_intervals(), 2);
    // leftover second from the stopped session folds into the next expiry
    assert_eq!(t.total_pomodoro_time(), 7);
    assert_eq!(engine.stats().total_seconds(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_break_skips_rest_of_break() {
    let mut engine = SessionEngine::new(Vec::new(), DailyStats::new());
    let config = SessionConfig::new(2, 5, 5, 4).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    send_after(&tx, Duration::from_millis(3_500), ControlSignal::Stop);
    let mut t = task();

    let started = Instant::now();
    let result = engine.start_session(&mut t, &config, &mut rx).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(3_500));
    assert_eq!(result.exit, SessionExit::Expired);
    assert!(result.completed);
    assert!(result.break_skipped);
    assert_eq!(result.break_phase, Some(Phase::ShortBreak));
    assert_eq!(t.pomodoros_completed(), 1);
    assert!(!t.is_completed());
    assert_eq!(engine.stats().total_seconds(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_complete_now_during_break_does_not_mark_task_done() {
    let mut engine = SessionEngine::new((), DailyStats::new());
    let config = SessionConfig::new(2, 5, 5, 4).unwrap();
    let (tx, mut rx) = mpsc::channel(4);
    send_after(&tx, Duration::from_millis(2_500), ControlSignal::CompleteNow);
    let mut t = task();

    let result = engine.start_session(&mut t, &config, &mut rx).await.unwrap();

    assert!(result.completed);
    assert!(result.break_skipped);
    assert!(!result.task_marked_done);
    assert!(!t.is_completed());
    assert_eq!(t.total_pomodoro_time(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_honored_before_next_tick() {
    let mut engine = SessionEngine::new((), DailyStats::new());
    let config = SessionConfig::default();
    let (tx, mut rx) = mpsc::channel(4);
    send_after(&tx, Duration::from_millis(7_200), ControlSignal::Stop);
    let mut t = task();

    let started = Instant::now();
    let result = engine.start_session(&mut t, &config, &mut rx).await.unwrap();

    assert_eq!(started.elapsed(), Duration::from_millis(7_200));
    assert_eq!(result.elapsed, 7);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn stop_after_k_ticks_adds_exactly_k(work in 2u64..40, k_seed in 0u64..1_000, leftover in 0u64..100) {
        let k = k_seed % work;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let (t, result, stats_empty) = rt.block_on(async {
            let mut engine = SessionEngine::new((), DailyStats::new());
            let config = SessionConfig::new(work, 1, 1, 4).unwrap();
            let (tx, mut rx) = mpsc::channel(4);
            send_after(&tx, Duration::from_millis(k * 1_000 + 500), ControlSignal::Stop);
            let mut t = task();
            t.add_time(leftover);
            let result = engine.start_session(&mut t, &config, &mut rx).await.unwrap();
            (t, result, engine.stats().is_empty())
        });

        prop_assert_eq!(result.exit, SessionExit::StoppedByUser);
        prop_assert_eq!(result.elapsed, k);
        prop_assert_eq!(t.current_pomodoro_time(), leftover + k);
        prop_assert_eq!(t.total_pomodoro_time(), 0);
        prop_assert_eq!(t.pomodoros_completed(), 0);
        prop_assert!(stats_empty);
    }
}
