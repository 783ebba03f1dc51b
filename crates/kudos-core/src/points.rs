//! Data model for the engagement engine.
//!
//! [`UserPointRecord`] is the single mutable record per user;
//! [`PointTransaction`] is the append-only audit ledger;
//! [`DailyTaskRecord`] guards once-per-day task awards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::level::Tier;

/// One point record per user. Mutated only through the engine; the `version`
/// counter keys every conditional write (optimistic concurrency).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPointRecord {
    /// Opaque reference to the external user entity
    pub user_id: String,

    /// Cumulative points; never decremented by this engine
    pub total_points: u64,

    /// Consecutive qualifying daily claims
    pub daily_streak: u32,

    /// None means "never claimed"
    pub last_claim_at: Option<DateTime<Utc>>,

    /// Always `Tier::for_points(total_points)` after any write
    pub level: Tier,

    /// Optimistic-concurrency counter, bumped on every write
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPointRecord {
    /// Default record for a user who has never interacted with the system.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            total_points: 0,
            daily_streak: 0,
            last_claim_at: None,
            level: Tier::Bronze,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields written back to a point record by a single mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointRecordUpdate {
    pub total_points: u64,
    pub daily_streak: u32,
    pub last_claim_at: Option<DateTime<Utc>>,
    pub level: Tier,
    pub updated_at: DateTime<Utc>,
}

/// Category of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Daily claim reward (base + streak bonus)
    DailyClaim,
    /// Flat reward for a named once-per-day task
    TaskCompletion,
    /// Ad-hoc grant outside the claim and task paths
    Bonus,
}

impl TransactionKind {
    /// Stable name used for storage.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::DailyClaim => "daily_claim",
            TransactionKind::TaskCompletion => "task_completion",
            TransactionKind::Bonus => "bonus",
        }
    }
}

/// Immutable audit record of a single point-affecting event.
///
/// Ledger entries are never read back to reconstruct state -- the record in
/// [`UserPointRecord`] is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTransaction {
    pub id: String,
    pub user_id: String,
    /// Signed amount applied; positive for every kind this engine writes
    pub points: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl PointTransaction {
    /// Create a ledger entry with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        points: i64,
        kind: TransactionKind,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            points,
            kind,
            description: description.into(),
            created_at: now,
        }
    }
}

/// Per-day completion guard for a named task. At most one row exists per
/// `(user_id, task_type, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTaskRecord {
    pub user_id: String,
    pub task_type: String,
    /// Calendar day (UTC), not an instant
    pub date: NaiveDate,
    pub completed: bool,
    pub points_earned: i64,
    pub completed_at: DateTime<Utc>,
}
