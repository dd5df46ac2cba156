use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::utils::time::date_to_key;

use super::entities::{
    ActivitySegment, Category, CategoryMinutes, DailySummary, InputSnapshot, ProcessUsage,
    RetentionReport,
};

/// Timestamps are stored as local wall clock text, which keeps them sortable and lets SQLite
/// bucket them by day.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Interface for abstracting storage of activity data.
#[cfg_attr(test, mockall::automock)]
pub trait ActivityStore: Send + Sync {
    fn insert_segment(&self, segment: &ActivitySegment) -> Result<()>;

    fn insert_snapshot(&self, snapshot: &InputSnapshot) -> Result<()>;

    /// Minutes per category for a local date. `None` means nothing was recorded that day.
    fn category_minutes(&self, date: NaiveDate) -> Result<Option<CategoryMinutes>>;

    /// Mean of `keyboard_count + 0.5 * mouse_count` over the snapshots of a date, 0 without
    /// snapshots.
    fn average_activity_score(&self, date: NaiveDate) -> Result<f64>;

    /// Processes ranked by total minutes. Each process is listed once, under the category
    /// holding most of its time.
    fn top_processes(&self, date: NaiveDate, limit: usize) -> Result<Vec<ProcessUsage>>;

    /// Inserts the summary or fully replaces the one stored for the same date.
    fn upsert_daily_summary(&self, summary: &DailySummary) -> Result<()>;

    fn daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>>;

    /// Most recent summaries, newest first.
    fn recent_summaries(&self, limit: usize) -> Result<Vec<DailySummary>>;

    /// Removes segments and snapshots recorded before `cutoff`. Summaries are kept forever.
    fn delete_older_than(&self, cutoff: NaiveDate) -> Result<RetentionReport>;
}

/// The main realization of [ActivityStore].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn).context("failed to initialize database schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock was poisoned"))
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS activities (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  window_title TEXT NOT NULL,
  process_name TEXT NOT NULL,
  category TEXT NOT NULL,
  start_time TEXT NOT NULL,
  end_time TEXT NOT NULL,
  duration_seconds INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activities_start_time ON activities(start_time);

CREATE TABLE IF NOT EXISTS activity_levels (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  timestamp TEXT NOT NULL,
  keyboard_count INTEGER NOT NULL,
  mouse_count INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activity_levels_timestamp ON activity_levels(timestamp);

CREATE TABLE IF NOT EXISTS daily_summary (
  date TEXT PRIMARY KEY,
  work_minutes INTEGER NOT NULL DEFAULT 0,
  game_minutes INTEGER NOT NULL DEFAULT 0,
  entertainment_minutes INTEGER NOT NULL DEFAULT 0,
  social_minutes INTEGER NOT NULL DEFAULT 0,
  browse_minutes INTEGER NOT NULL DEFAULT 0,
  other_minutes INTEGER NOT NULL DEFAULT 0,
  total_active_minutes INTEGER NOT NULL DEFAULT 0,
  avg_activity_score REAL NOT NULL DEFAULT 0,
  mood_score REAL,
  stress_score REAL,
  summary_text TEXT,
  social_caption TEXT,
  created_at TEXT NOT NULL
);
"#,
    )
}

fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Half-open `[start, end)` range covering a whole local day, in stored form.
fn day_bounds(date: NaiveDate) -> (String, String) {
    let start = date.and_time(NaiveTime::MIN);
    (
        format_timestamp(start),
        format_timestamp(start + Duration::days(1)),
    )
}

fn conversion_error(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_summary(row: &Row) -> Result<DailySummary, rusqlite::Error> {
    let date: String = row.get("date")?;
    let created_at: String = row.get("created_at")?;
    Ok(DailySummary {
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| conversion_error(0, e))?,
        minutes: CategoryMinutes {
            work: row.get("work_minutes")?,
            game: row.get("game_minutes")?,
            entertainment: row.get("entertainment_minutes")?,
            social: row.get("social_minutes")?,
            browse: row.get("browse_minutes")?,
            other: row.get("other_minutes")?,
        },
        total_active_minutes: row.get("total_active_minutes")?,
        avg_activity_score: row.get("avg_activity_score")?,
        mood_score: row.get("mood_score")?,
        stress_score: row.get("stress_score")?,
        summary_text: row.get("summary_text")?,
        social_caption: row.get("social_caption")?,
        created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
            .map_err(|e| conversion_error(13, e))?,
    })
}

impl ActivityStore for SqliteStore {
    fn insert_segment(&self, segment: &ActivitySegment) -> Result<()> {
        self.connection()?.execute(
            "INSERT INTO activities
                (window_title, process_name, category, start_time, end_time, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                segment.window_title,
                segment.process_name,
                segment.category.as_str(),
                format_timestamp(segment.start),
                format_timestamp(segment.end),
                segment.duration_seconds,
            ],
        )?;
        Ok(())
    }

    fn insert_snapshot(&self, snapshot: &InputSnapshot) -> Result<()> {
        self.connection()?.execute(
            "INSERT INTO activity_levels (timestamp, keyboard_count, mouse_count)
             VALUES (?1, ?2, ?3)",
            params![
                format_timestamp(snapshot.timestamp),
                snapshot.keyboard_count as i64,
                snapshot.mouse_count as i64,
            ],
        )?;
        Ok(())
    }

    fn category_minutes(&self, date: NaiveDate) -> Result<Option<CategoryMinutes>> {
        let (start, end) = day_bounds(date);
        let conn = self.connection()?;
        let mut statement = conn.prepare(
            "SELECT category, SUM(duration_seconds) / 60
             FROM activities
             WHERE start_time >= ?1 AND start_time < ?2
             GROUP BY category",
        )?;
        let rows = statement
            .query_map(params![start, end], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if rows.is_empty() {
            return Ok(None);
        }

        let minutes = rows
            .into_iter()
            .map(|(category, minutes)| {
                Ok::<_, anyhow::Error>((category.parse::<Category>()?, minutes))
            })
            .collect::<Result<CategoryMinutes>>()?;
        Ok(Some(minutes))
    }

    fn average_activity_score(&self, date: NaiveDate) -> Result<f64> {
        let (start, end) = day_bounds(date);
        let average: Option<f64> = self.connection()?.query_row(
            "SELECT AVG(keyboard_count + mouse_count * 0.5)
             FROM activity_levels
             WHERE timestamp >= ?1 AND timestamp < ?2",
            params![start, end],
            |row| row.get(0),
        )?;
        Ok(average.unwrap_or(0.))
    }

    fn top_processes(&self, date: NaiveDate, limit: usize) -> Result<Vec<ProcessUsage>> {
        let (start, end) = day_bounds(date);
        let conn = self.connection()?;
        let mut statement = conn.prepare(
            "WITH per_category AS (
                 SELECT process_name, category, SUM(duration_seconds) AS seconds
                 FROM activities
                 WHERE start_time >= ?1 AND start_time < ?2
                 GROUP BY process_name, category
             ),
             ranked AS (
                 SELECT process_name, category,
                        SUM(seconds) OVER (PARTITION BY process_name) AS total,
                        ROW_NUMBER() OVER (
                            PARTITION BY process_name ORDER BY seconds DESC, category
                        ) AS position
                 FROM per_category
             )
             SELECT process_name, category, total / 60 AS minutes
             FROM ranked
             WHERE position = 1
             ORDER BY total DESC, process_name
             LIMIT ?3",
        )?;
        let rows = statement
            .query_map(params![start, end, limit as i64], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(process_name, category, minutes)| {
                Ok::<_, anyhow::Error>(ProcessUsage {
                    process_name,
                    category: category.parse()?,
                    minutes,
                })
            })
            .collect()
    }

    fn upsert_daily_summary(&self, summary: &DailySummary) -> Result<()> {
        let minutes = &summary.minutes;
        self.connection()?.execute(
            "INSERT INTO daily_summary
                (date, work_minutes, game_minutes, entertainment_minutes, social_minutes,
                 browse_minutes, other_minutes, total_active_minutes, avg_activity_score,
                 mood_score, stress_score, summary_text, social_caption, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(date) DO UPDATE SET
                work_minutes = excluded.work_minutes,
                game_minutes = excluded.game_minutes,
                entertainment_minutes = excluded.entertainment_minutes,
                social_minutes = excluded.social_minutes,
                browse_minutes = excluded.browse_minutes,
                other_minutes = excluded.other_minutes,
                total_active_minutes = excluded.total_active_minutes,
                avg_activity_score = excluded.avg_activity_score,
                mood_score = excluded.mood_score,
                stress_score = excluded.stress_score,
                summary_text = excluded.summary_text,
                social_caption = excluded.social_caption,
                created_at = excluded.created_at",
            params![
                date_to_key(summary.date),
                minutes.work,
                minutes.game,
                minutes.entertainment,
                minutes.social,
                minutes.browse,
                minutes.other,
                summary.total_active_minutes,
                summary.avg_activity_score,
                summary.mood_score,
                summary.stress_score,
                summary.summary_text,
                summary.social_caption,
                format_timestamp(summary.created_at),
            ],
        )?;
        debug!("Stored summary for {}", summary.date);
        Ok(())
    }

    fn daily_summary(&self, date: NaiveDate) -> Result<Option<DailySummary>> {
        Ok(self
            .connection()?
            .query_row(
                "SELECT * FROM daily_summary WHERE date = ?1",
                params![date_to_key(date)],
                row_to_summary,
            )
            .optional()?)
    }

    fn recent_summaries(&self, limit: usize) -> Result<Vec<DailySummary>> {
        let conn = self.connection()?;
        let mut statement =
            conn.prepare("SELECT * FROM daily_summary ORDER BY date DESC LIMIT ?1")?;
        let summaries = statement
            .query_map(params![limit as i64], row_to_summary)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(summaries)
    }

    fn delete_older_than(&self, cutoff: NaiveDate) -> Result<RetentionReport> {
        let cutoff = format_timestamp(cutoff.and_time(NaiveTime::MIN));
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let segments = tx.execute(
            "DELETE FROM activities WHERE start_time < ?1",
            params![cutoff],
        )?;
        let snapshots = tx.execute(
            "DELETE FROM activity_levels WHERE timestamp < ?1",
            params![cutoff],
        )?;
        tx.commit()?;
        info!("Removed {segments} segments and {snapshots} snapshots older than {cutoff}");
        Ok(RetentionReport {
            segments,
            snapshots,
        })
    }
}

/// First date that survives a retention sweep keeping `days` days of raw data.
pub fn retention_cutoff(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(days as i64)
}
