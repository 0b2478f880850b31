//! SQLite-based task list and statistics storage.
//!
//! Provides persistent storage for:
//! - The task list (the engine's tasks between sessions)
//! - Seconds worked per calendar day (a [`StatsSink`])
//! - A log of session outcomes
//!
//! Every write is a single statement, flushed when it returns.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::data_dir;
use crate::error::{DatabaseError, Result, ValidationError};
use crate::stats::{streak_ending, Stats, StatsSink};
use crate::task::{Task, TaskStatus};
use crate::timer::SessionResult;

const DATE_FMT: &str = "%Y-%m-%d";

/// Which tasks [`Database::list_tasks`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    #[default]
    All,
    Pending,
    Completed,
}

/// One row of the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub task_id: i64,
    pub exit: String,
    pub elapsed_secs: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// SQLite database for tasks and statistics.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/pomotask.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("pomotask.db"))
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        super::migrations::migrate(&conn)?;
        Ok(Self { conn })
    }

    // ── Tasks ────────────────────────────────────────────────────────

    /// Insert a new pending task. Ids are assigned monotonically.
    pub fn add_task(&self, title: &str) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO tasks (title, status, created_at) VALUES (?1, ?2, ?3)",
            params![title, TaskStatus::Pending.as_str(), created_at.to_rfc3339()],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(task_id = id, "task added");
        Ok(Task::new(id, title, created_at)?)
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                "SELECT id, title, status, pomodoros_completed, total_pomodoro_time,
                        current_pomodoro_time, created_at
                 FROM tasks WHERE id = ?1",
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Like [`Database::get_task`] but a missing task is an error.
    pub fn require_task(&self, id: i64) -> Result<Task> {
        self.get_task(id)?
            .ok_or_else(|| DatabaseError::TaskNotFound(id).into())
    }

    pub fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let status = match filter {
            TaskFilter::All => None,
            TaskFilter::Pending => Some(TaskStatus::Pending.as_str()),
            TaskFilter::Completed => Some(TaskStatus::Completed.as_str()),
        };
        let mut stmt = self.conn.prepare(
            "SELECT id, title, status, pomodoros_completed, total_pomodoro_time,
                    current_pomodoro_time, created_at
             FROM tasks
             WHERE ?1 IS NULL OR status = ?1
             ORDER BY id",
        )?;
        let rows = stmt.query_map(params![status], task_from_row)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Persist the mutable fields of `task`.
    pub fn save_task(&self, task: &Task) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET status = ?2, pomodoros_completed = ?3,
                 total_pomodoro_time = ?4, current_pomodoro_time = ?5
             WHERE id = ?1",
            params![
                task.id(),
                task.status().as_str(),
                task.pomodoros_completed(),
                task.total_pomodoro_time(),
                task.current_pomodoro_time(),
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::TaskNotFound(task.id()).into());
        }
        Ok(())
    }

    pub fn delete_task(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(DatabaseError::TaskNotFound(id).into());
        }
        tracing::debug!(task_id = id, "task deleted");
        Ok(())
    }

    // ── Statistics ───────────────────────────────────────────────────

    /// Add `seconds` to the total for `date`.
    pub fn record_daily(&self, date: NaiveDate, seconds: u64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO daily_stats (date, seconds) VALUES (?1, ?2)
             ON CONFLICT(date) DO UPDATE SET seconds = seconds + excluded.seconds",
            params![date.format(DATE_FMT).to_string(), seconds],
        )?;
        Ok(())
    }

    pub fn seconds_on(&self, date: NaiveDate) -> Result<u64> {
        let secs = self
            .conn
            .query_row(
                "SELECT seconds FROM daily_stats WHERE date = ?1",
                params![date.format(DATE_FMT).to_string()],
                |row| row.get::<_, u64>(0),
            )
            .optional()?;
        Ok(secs.unwrap_or(0))
    }

    /// Totals for the `days` days ending at `today`, oldest first, with
    /// zero for days without work.
    pub fn daily_totals(&self, today: NaiveDate, days: u32) -> Result<Vec<(NaiveDate, u64)>> {
        let mut out = Vec::with_capacity(days as usize);
        for back in (0..i64::from(days)).rev() {
            let date = today - Duration::days(back);
            out.push((date, self.seconds_on(date)?));
        }
        Ok(out)
    }

    pub fn stats(&self, today: NaiveDate) -> Result<Stats> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, seconds FROM daily_stats WHERE seconds > 0 ORDER BY date")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;

        let mut stats = Stats::default();
        let mut active_days = Vec::new();
        for row in rows {
            let (date, seconds) = row?;
            let date = NaiveDate::parse_from_str(&date, DATE_FMT)
                .map_err(|e| DatabaseError::QueryFailed(format!("bad date '{date}': {e}")))?;
            stats.total_secs += seconds;
            if date == today {
                stats.today_secs = seconds;
            }
            active_days.push(date);
        }
        stats.days_active = active_days.len() as u64;
        stats.current_streak_days = streak_ending(&active_days, today);
        stats.total_pomodoros = self.conn.query_row(
            "SELECT COALESCE(SUM(pomodoros_completed), 0) FROM tasks",
            [],
            |row| row.get::<_, u64>(0),
        )?;
        Ok(stats)
    }

    // ── Session log ──────────────────────────────────────────────────

    pub fn record_session(
        &self,
        task_id: i64,
        result: &SessionResult,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sessions (task_id, exit, elapsed_secs, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                task_id,
                result.exit.as_str(),
                result.elapsed,
                started_at.to_rfc3339(),
                ended_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: u32) -> Result<Vec<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, exit, elapsed_secs, started_at, ended_at
             FROM sessions ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok(SessionRecord {
                id: row.get(0)?,
                task_id: row.get(1)?,
                exit: row.get(2)?,
                elapsed_secs: row.get(3)?,
                started_at: parse_timestamp(row, 4)?,
                ended_at: parse_timestamp(row, 5)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Storage failures are logged, never surfaced to the session.
impl StatsSink for Database {
    fn record(&mut self, date: NaiveDate, seconds: u64) {
        if let Err(e) = self.record_daily(date, seconds) {
            tracing::warn!(error = %e, %date, seconds, "failed to record daily stats");
        }
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(2)?;
    let status = TaskStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown task status '{status}'").into(),
        )
    })?;
    Ok(Task::restore(
        row.get(0)?,
        row.get(1)?,
        status,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        parse_timestamp(row, 6)?,
    ))
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::timer::SessionExit;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[test]
    fn add_and_get_task() {
        let db = Database::open_memory().unwrap();
        let task = db.add_task("  Write tests ").unwrap();
        assert_eq!(task.title(), "Write tests");
        let loaded = db.get_task(task.id()).unwrap().unwrap();
        assert_eq!(loaded.title(), "Write tests");
        assert_eq!(loaded.status(), TaskStatus::Pending);
    }

    #[test]
    fn ids_are_monotonic_after_delete() {
        let db = Database::open_memory().unwrap();
        let a = db.add_task("a").unwrap();
        let b = db.add_task("b").unwrap();
        db.delete_task(b.id()).unwrap();
        let c = db.add_task("c").unwrap();
        assert!(b.id() > a.id());
        assert!(c.id() > b.id());
    }

    #[test]
    fn blank_title_rejected() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.add_task("   "),
            Err(CoreError::Validation(ValidationError::EmptyTitle))
        ));
    }

    #[test]
    fn save_task_persists_accounting() {
        let db = Database::open_memory().unwrap();
        let mut task = db.add_task("Report").unwrap();
        task.add_time(30);
        task.complete_pomodoro();
        task.add_time(7);
        task.mark_complete();
        db.save_task(&task).unwrap();

        let loaded = db.require_task(task.id()).unwrap();
        assert_eq!(loaded.pomodoros_completed(), 1);
        assert_eq!(loaded.total_pomodoro_time(), 30);
        assert_eq!(loaded.current_pomodoro_time(), 7);
        assert!(loaded.is_completed());
    }

    #[test]
    fn missing_task_errors() {
        let db = Database::open_memory().unwrap();
        assert!(matches!(
            db.delete_task(99),
            Err(CoreError::Database(DatabaseError::TaskNotFound(99)))
        ));
        assert!(db.get_task(99).unwrap().is_none());
    }

    #[test]
    fn list_filters_by_status() {
        let db = Database::open_memory().unwrap();
        db.add_task("open").unwrap();
        let mut done = db.add_task("done").unwrap();
        done.mark_complete();
        db.save_task(&done).unwrap();

        assert_eq!(db.list_tasks(TaskFilter::All).unwrap().len(), 2);
        let pending = db.list_tasks(TaskFilter::Pending).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title(), "open");
        let completed = db.list_tasks(TaskFilter::Completed).unwrap();
        assert_eq!(completed[0].title(), "done");
    }

    #[test]
    fn daily_stats_accumulate_and_summarize() {
        let mut db = Database::open_memory().unwrap();
        StatsSink::record(&mut db, day(3), 1500);
        StatsSink::record(&mut db, day(4), 1500);
        StatsSink::record(&mut db, day(4), 1500);

        assert_eq!(db.seconds_on(day(4)).unwrap(), 3000);
        let totals = db.daily_totals(day(5), 3).unwrap();
        assert_eq!(totals, vec![(day(3), 1500), (day(4), 3000), (day(5), 0)]);

        let stats = db.stats(day(4)).unwrap();
        assert_eq!(stats.today_secs, 3000);
        assert_eq!(stats.total_secs, 4500);
        assert_eq!(stats.days_active, 2);
        assert_eq!(stats.current_streak_days, 2);
    }

    #[test]
    fn session_log_is_newest_first() {
        let db = Database::open_memory().unwrap();
        let task = db.add_task("log").unwrap();
        let now = Utc::now();
        let stopped = SessionResult {
            exit: SessionExit::StoppedByUser,
            completed: false,
            elapsed: 3,
            task_marked_done: false,
            break_phase: None,
            break_skipped: false,
        };
        db.record_session(task.id(), &stopped, now, now).unwrap();
        let expired = SessionResult {
            exit: SessionExit::Expired,
            completed: true,
            elapsed: 1500,
            ..stopped.clone()
        };
        db.record_session(task.id(), &expired, now, now).unwrap();

        let recent = db.recent_sessions(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].exit, "expired");
        assert_eq!(recent[1].elapsed_secs, 3);
    }
}
