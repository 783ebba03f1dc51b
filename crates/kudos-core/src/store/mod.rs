pub mod points_db;

pub use points_db::PointsDb;

use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

use crate::error::StoreError;
use crate::points::{DailyTaskRecord, PointRecordUpdate, PointTransaction, UserPointRecord};

/// Returns `~/.config/kudos[-dev]/` based on KUDOS_ENV.
///
/// Set KUDOS_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("KUDOS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("kudos-dev")
    } else {
        base_dir.join("kudos")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Result of attempting a guarded task-completion write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskApplyOutcome {
    /// Task marked complete, points applied, ledger appended
    Applied,
    /// A completed row already existed for this task today
    AlreadyCompleted,
    /// The point record changed under us; re-read and retry
    Conflict,
}

/// Storage collaborator for the engagement engine.
///
/// The engine owns all business rules; implementations only provide durable
/// reads and the two guarded multi-statement writes. Every write that
/// touches a point record is conditional on the record's `version` counter,
/// and each guarded write appends its ledger entry in the same transaction,
/// so a mutation and its audit entry land together or not at all.
pub trait PointStore {
    /// Fetch a user's point record, if one exists.
    fn get_point_record(&self, user_id: &str) -> Result<Option<UserPointRecord>, StoreError>;

    /// Fetch-or-create in one idempotent call, keyed on `user_id`
    /// uniqueness. Existing records are returned untouched.
    fn create_point_record(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UserPointRecord, StoreError>;

    /// Conditionally write a point record and append a ledger entry,
    /// atomically. Returns `false` without side effects when the stored
    /// version no longer matches `expected_version`.
    fn apply_update(
        &self,
        user_id: &str,
        expected_version: i64,
        update: &PointRecordUpdate,
        ledger: &PointTransaction,
    ) -> Result<bool, StoreError>;

    /// Mark a task complete for its calendar day and apply the point award,
    /// atomically. The `(user_id, task_type, date)` uniqueness constraint
    /// decides the winner under concurrency.
    fn apply_task_completion(
        &self,
        task: &DailyTaskRecord,
        expected_version: i64,
        update: &PointRecordUpdate,
        ledger: &PointTransaction,
    ) -> Result<TaskApplyOutcome, StoreError>;

    /// Fetch the completion guard row for a task on a calendar day.
    fn get_daily_task(
        &self,
        user_id: &str,
        task_type: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyTaskRecord>, StoreError>;

    /// Newest-first page of a user's ledger entries.
    fn transactions_for(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PointTransaction>, StoreError>;
}
