//! SQLite-based storage for point records, daily tasks, and the ledger.
//!
//! Schema is created idempotently on open. Timestamps are stored as RFC 3339
//! text, calendar days as `YYYY-MM-DD`. The `point_transactions` table is
//! append-only: no update or delete is exposed for it.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use super::{data_dir, PointStore, TaskApplyOutcome};
use crate::error::StoreError;
use crate::level::Tier;
use crate::points::{
    DailyTaskRecord, PointRecordUpdate, PointTransaction, TransactionKind, UserPointRecord,
};

// === Helper Functions ===

/// Parse tier from database string
fn parse_tier(tier_str: &str) -> Tier {
    match tier_str {
        "silver" => Tier::Silver,
        "gold" => Tier::Gold,
        "platinum" => Tier::Platinum,
        "diamond" => Tier::Diamond,
        _ => Tier::Bronze,
    }
}

/// Parse transaction kind from database string
fn parse_kind(kind_str: &str) -> TransactionKind {
    match kind_str {
        "daily_claim" => TransactionKind::DailyClaim,
        "task_completion" => TransactionKind::TaskCompletion,
        _ => TransactionKind::Bonus,
    }
}

/// Parse datetime from RFC3339 string with fallback to current time
fn parse_datetime_fallback(dt_str: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(dt_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Parse an optional datetime column; unparseable values read as None
fn parse_datetime_opt(dt_str: Option<&str>) -> Option<DateTime<Utc>> {
    dt_str
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a calendar day for database storage
fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a calendar day from database storage
fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap_or_default()
}

/// Build a UserPointRecord from a database row
fn row_to_point_record(row: &rusqlite::Row) -> Result<UserPointRecord, rusqlite::Error> {
    let last_claim_str: Option<String> = row.get(3)?;
    let level_str: String = row.get(4)?;
    let created_str: String = row.get(6)?;
    let updated_str: String = row.get(7)?;

    Ok(UserPointRecord {
        user_id: row.get(0)?,
        total_points: row.get(1)?,
        daily_streak: row.get(2)?,
        last_claim_at: parse_datetime_opt(last_claim_str.as_deref()),
        level: parse_tier(&level_str),
        version: row.get(5)?,
        created_at: parse_datetime_fallback(&created_str),
        updated_at: parse_datetime_fallback(&updated_str),
    })
}

/// Build a PointTransaction from a database row
fn row_to_transaction(row: &rusqlite::Row) -> Result<PointTransaction, rusqlite::Error> {
    let kind_str: String = row.get(3)?;
    let created_str: String = row.get(5)?;

    Ok(PointTransaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        points: row.get(2)?,
        kind: parse_kind(&kind_str),
        description: row.get(4)?,
        created_at: parse_datetime_fallback(&created_str),
    })
}

/// Build a DailyTaskRecord from a database row
fn row_to_daily_task(row: &rusqlite::Row) -> Result<DailyTaskRecord, rusqlite::Error> {
    let date_str: String = row.get(2)?;
    let completed_at_str: String = row.get(5)?;

    Ok(DailyTaskRecord {
        user_id: row.get(0)?,
        task_type: row.get(1)?,
        date: parse_date(&date_str),
        completed: row.get(3)?,
        points_earned: row.get(4)?,
        completed_at: parse_datetime_fallback(&completed_at_str),
    })
}

/// SQLite database implementing [`PointStore`].
pub struct PointsDb {
    conn: Connection,
}

impl PointsDb {
    /// Open the database at `~/.config/kudos/kudos.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("kudos.db");
        Self::open_at(path)
    }

    /// Open the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        // Concurrent writers block instead of failing fast
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(StoreError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS user_points (
                    user_id       TEXT PRIMARY KEY,
                    total_points  INTEGER NOT NULL DEFAULT 0,
                    daily_streak  INTEGER NOT NULL DEFAULT 0,
                    last_claim_at TEXT,
                    level         TEXT NOT NULL DEFAULT 'bronze',
                    version       INTEGER NOT NULL DEFAULT 0,
                    created_at    TEXT NOT NULL,
                    updated_at    TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS point_transactions (
                    id          TEXT PRIMARY KEY,
                    user_id     TEXT NOT NULL,
                    points      INTEGER NOT NULL,
                    kind        TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    created_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS daily_tasks (
                    user_id       TEXT NOT NULL,
                    task_type     TEXT NOT NULL,
                    date          TEXT NOT NULL,
                    completed     INTEGER NOT NULL DEFAULT 0,
                    points_earned INTEGER NOT NULL DEFAULT 0,
                    completed_at  TEXT NOT NULL,
                    PRIMARY KEY (user_id, task_type, date)
                );

                -- Create index for the ledger's only query pattern
                CREATE INDEX IF NOT EXISTS idx_point_transactions_user_created
                    ON point_transactions(user_id, created_at);",
            )
            .map_err(StoreError::from)
    }

    fn insert_transaction(&self, ledger: &PointTransaction) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO point_transactions (id, user_id, points, kind, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                ledger.id,
                ledger.user_id,
                ledger.points,
                ledger.kind.as_str(),
                ledger.description,
                ledger.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn conditional_record_update(
        &self,
        user_id: &str,
        expected_version: i64,
        update: &PointRecordUpdate,
    ) -> Result<usize, rusqlite::Error> {
        self.conn.execute(
            "UPDATE user_points
             SET total_points = ?1, daily_streak = ?2, last_claim_at = ?3, level = ?4,
                 updated_at = ?5, version = version + 1
             WHERE user_id = ?6 AND version = ?7",
            params![
                update.total_points,
                update.daily_streak,
                update.last_claim_at.map(|t| t.to_rfc3339()),
                update.level.as_str(),
                update.updated_at.to_rfc3339(),
                user_id,
                expected_version,
            ],
        )
    }

    /// Run `body` inside a BEGIN IMMEDIATE transaction, committing only when
    /// it reports success via `commit_if`.
    fn in_immediate_txn<T>(
        &self,
        body: impl FnOnce() -> Result<T, rusqlite::Error>,
        commit_if: impl Fn(&T) -> bool,
    ) -> Result<T, StoreError> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE TRANSACTION;")
            .map_err(StoreError::from)?;
        match body() {
            Ok(value) => {
                let end = if commit_if(&value) { "COMMIT;" } else { "ROLLBACK;" };
                self.conn.execute_batch(end).map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(e.into())
            }
        }
    }
}

impl PointStore for PointsDb {
    fn get_point_record(&self, user_id: &str) -> Result<Option<UserPointRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT user_id, total_points, daily_streak, last_claim_at, level, version,
                        created_at, updated_at
                 FROM user_points WHERE user_id = ?1",
            )
            .map_err(StoreError::from)?;
        stmt.query_row(params![user_id], row_to_point_record)
            .optional()
            .map_err(StoreError::from)
    }

    fn create_point_record(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserPointRecord, StoreError> {
        self.conn
            .execute(
                "INSERT INTO user_points
                     (user_id, total_points, daily_streak, last_claim_at, level, version,
                      created_at, updated_at)
                 VALUES (?1, 0, 0, NULL, ?2, 0, ?3, ?3)
                 ON CONFLICT(user_id) DO NOTHING",
                params![user_id, Tier::Bronze.as_str(), now.to_rfc3339()],
            )
            .map_err(StoreError::from)?;
        self.get_point_record(user_id)?
            .ok_or_else(|| StoreError::QueryFailed("point record missing after upsert".to_string()))
    }

    fn apply_update(
        &self,
        user_id: &str,
        expected_version: i64,
        update: &PointRecordUpdate,
        ledger: &PointTransaction,
    ) -> Result<bool, StoreError> {
        self.in_immediate_txn(
            || {
                let changed = self.conditional_record_update(user_id, expected_version, update)?;
                if changed == 0 {
                    return Ok(false);
                }
                self.insert_transaction(ledger)?;
                Ok(true)
            },
            |applied| *applied,
        )
    }

    fn apply_task_completion(
        &self,
        task: &DailyTaskRecord,
        expected_version: i64,
        update: &PointRecordUpdate,
        ledger: &PointTransaction,
    ) -> Result<TaskApplyOutcome, StoreError> {
        self.in_immediate_txn(
            || {
                // The (user_id, task_type, date) key collapses concurrent
                // completions to one winner; the DO UPDATE arm only fires
                // for a leftover incomplete row.
                let claimed = self.conn.execute(
                    "INSERT INTO daily_tasks
                         (user_id, task_type, date, completed, points_earned, completed_at)
                     VALUES (?1, ?2, ?3, 1, ?4, ?5)
                     ON CONFLICT(user_id, task_type, date) DO UPDATE
                         SET completed = 1,
                             points_earned = excluded.points_earned,
                             completed_at = excluded.completed_at
                         WHERE daily_tasks.completed = 0",
                    params![
                        task.user_id,
                        task.task_type,
                        format_date(task.date),
                        task.points_earned,
                        task.completed_at.to_rfc3339(),
                    ],
                )?;
                if claimed == 0 {
                    return Ok(TaskApplyOutcome::AlreadyCompleted);
                }
                let changed =
                    self.conditional_record_update(&task.user_id, expected_version, update)?;
                if changed == 0 {
                    return Ok(TaskApplyOutcome::Conflict);
                }
                self.insert_transaction(ledger)?;
                Ok(TaskApplyOutcome::Applied)
            },
            |outcome| *outcome == TaskApplyOutcome::Applied,
        )
    }

    fn get_daily_task(
        &self,
        user_id: &str,
        task_type: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyTaskRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT user_id, task_type, date, completed, points_earned, completed_at
                 FROM daily_tasks WHERE user_id = ?1 AND task_type = ?2 AND date = ?3",
            )
            .map_err(StoreError::from)?;
        stmt.query_row(
            params![user_id, task_type, format_date(date)],
            row_to_daily_task,
        )
        .optional()
        .map_err(StoreError::from)
    }

    fn transactions_for(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PointTransaction>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, user_id, points, kind, description, created_at
                 FROM point_transactions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], row_to_transaction)
            .map_err(StoreError::from)?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row.map_err(StoreError::from)?);
        }
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn update_for(total: u64, streak: u32, last_claim: Option<DateTime<Utc>>) -> PointRecordUpdate {
        PointRecordUpdate {
            total_points: total,
            daily_streak: streak,
            last_claim_at: last_claim,
            level: Tier::for_points(total),
            updated_at: now(),
        }
    }

    fn claim_tx(points: i64) -> PointTransaction {
        PointTransaction::new("user-1", points, TransactionKind::DailyClaim, "test", now())
    }

    #[test]
    fn test_create_is_idempotent() {
        let db = PointsDb::open_memory().unwrap();
        let first = db.create_point_record("user-1", now()).unwrap();
        let second = db.create_point_record("user-1", now()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.total_points, 0);
        assert_eq!(first.level, Tier::Bronze);
        assert_eq!(first.version, 0);
    }

    #[test]
    fn test_create_does_not_reset_existing_record() {
        let db = PointsDb::open_memory().unwrap();
        let record = db.create_point_record("user-1", now()).unwrap();
        assert!(db
            .apply_update("user-1", record.version, &update_for(65, 2, Some(now())), &claim_tx(65))
            .unwrap());

        let again = db.create_point_record("user-1", now()).unwrap();
        assert_eq!(again.total_points, 65);
        assert_eq!(again.daily_streak, 2);
        assert_eq!(again.version, 1);
    }

    #[test]
    fn test_apply_update_bumps_version_and_appends_ledger() {
        let db = PointsDb::open_memory().unwrap();
        let record = db.create_point_record("user-1", now()).unwrap();

        let applied = db
            .apply_update("user-1", record.version, &update_for(50, 1, Some(now())), &claim_tx(50))
            .unwrap();
        assert!(applied);

        let updated = db.get_point_record("user-1").unwrap().unwrap();
        assert_eq!(updated.total_points, 50);
        assert_eq!(updated.version, record.version + 1);
        assert_eq!(updated.last_claim_at, Some(now()));

        let ledger = db.transactions_for("user-1", 10).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].points, 50);
        assert_eq!(ledger[0].kind, TransactionKind::DailyClaim);
    }

    #[test]
    fn test_apply_update_rejects_stale_version() {
        let db = PointsDb::open_memory().unwrap();
        let record = db.create_point_record("user-1", now()).unwrap();
        assert!(db
            .apply_update("user-1", record.version, &update_for(50, 1, Some(now())), &claim_tx(50))
            .unwrap());

        // Second write against the version we already consumed
        let applied = db
            .apply_update("user-1", record.version, &update_for(100, 2, Some(now())), &claim_tx(50))
            .unwrap();
        assert!(!applied);

        // Neither the record nor the ledger moved
        let current = db.get_point_record("user-1").unwrap().unwrap();
        assert_eq!(current.total_points, 50);
        assert_eq!(db.transactions_for("user-1", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_task_completion_guard_wins_once() {
        let db = PointsDb::open_memory().unwrap();
        let record = db.create_point_record("user-1", now()).unwrap();
        let task = DailyTaskRecord {
            user_id: "user-1".to_string(),
            task_type: "read_article".to_string(),
            date: now().date_naive(),
            completed: true,
            points_earned: 10,
            completed_at: now(),
        };
        let tx = PointTransaction::new("user-1", 10, TransactionKind::TaskCompletion, "t", now());

        let first = db
            .apply_task_completion(&task, record.version, &update_for(10, 0, None), &tx)
            .unwrap();
        assert_eq!(first, TaskApplyOutcome::Applied);

        let record = db.get_point_record("user-1").unwrap().unwrap();
        let second = db
            .apply_task_completion(&task, record.version, &update_for(20, 0, None), &tx)
            .unwrap();
        assert_eq!(second, TaskApplyOutcome::AlreadyCompleted);

        // The losing attempt changed nothing
        let current = db.get_point_record("user-1").unwrap().unwrap();
        assert_eq!(current.total_points, 10);
        assert_eq!(db.transactions_for("user-1", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_task_completion_conflict_rolls_back_guard_row() {
        let db = PointsDb::open_memory().unwrap();
        db.create_point_record("user-1", now()).unwrap();
        let task = DailyTaskRecord {
            user_id: "user-1".to_string(),
            task_type: "watch_video".to_string(),
            date: now().date_naive(),
            completed: true,
            points_earned: 10,
            completed_at: now(),
        };
        let tx = PointTransaction::new("user-1", 10, TransactionKind::TaskCompletion, "t", now());

        let outcome = db
            .apply_task_completion(&task, 99, &update_for(10, 0, None), &tx)
            .unwrap();
        assert_eq!(outcome, TaskApplyOutcome::Conflict);

        // Rolled back: the guard row must not survive a conflicted attempt
        assert!(db
            .get_daily_task("user-1", "watch_video", now().date_naive())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_daily_task_round_trip() {
        let db = PointsDb::open_memory().unwrap();
        let record = db.create_point_record("user-1", now()).unwrap();
        let task = DailyTaskRecord {
            user_id: "user-1".to_string(),
            task_type: "read_article".to_string(),
            date: now().date_naive(),
            completed: true,
            points_earned: 10,
            completed_at: now(),
        };
        let tx = PointTransaction::new("user-1", 10, TransactionKind::TaskCompletion, "t", now());
        db.apply_task_completion(&task, record.version, &update_for(10, 0, None), &tx)
            .unwrap();

        let stored = db
            .get_daily_task("user-1", "read_article", now().date_naive())
            .unwrap()
            .unwrap();
        assert_eq!(stored, task);
        assert!(db
            .get_daily_task("user-1", "read_article", now().date_naive() + chrono::Duration::days(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_transactions_newest_first_with_limit() {
        let db = PointsDb::open_memory().unwrap();
        let mut record = db.create_point_record("user-1", now()).unwrap();
        for i in 0..5i64 {
            let at = now() + chrono::Duration::minutes(i);
            let tx =
                PointTransaction::new("user-1", 50 + i, TransactionKind::DailyClaim, "c", at);
            assert!(db
                .apply_update(
                    "user-1",
                    record.version,
                    &update_for((50 + i) as u64, 1, Some(at)),
                    &tx
                )
                .unwrap());
            record = db.get_point_record("user-1").unwrap().unwrap();
        }

        let page = db.transactions_for("user-1", 3).unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].points, 54);
        assert_eq!(page[1].points, 53);
        assert_eq!(page[2].points, 52);
    }

    #[test]
    fn test_unknown_user_reads_as_none() {
        let db = PointsDb::open_memory().unwrap();
        assert!(db.get_point_record("nobody").unwrap().is_none());
        assert!(db.transactions_for("nobody", 10).unwrap().is_empty());
    }
}
