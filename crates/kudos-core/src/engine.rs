//! Points engine: the orchestrator for claims, task rewards, and status.
//!
//! Every mutation follows the same shape: read the user's record (creating
//! the default lazily), compute the new state with the pure policies, then
//! write conditionally on the record's version together with the ledger
//! entry. A version miss means another request won the race; the operation
//! is re-evaluated from a fresh read, so a lost daily-claim race surfaces as
//! `AlreadyClaimed` rather than a double award.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::claim_window::{ClaimWindow, TimeRemaining};
use crate::config::EngineConfig;
use crate::error::{CoreError, Result};
use crate::level::Tier;
use crate::points::{
    DailyTaskRecord, PointRecordUpdate, PointTransaction, TransactionKind, UserPointRecord,
};
use crate::store::{PointStore, PointsDb, TaskApplyOutcome};
use crate::streak;

/// Bounded retries for optimistic-concurrency conflicts.
const MAX_APPLY_ATTEMPTS: u32 = 3;

/// Result of a successful daily claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimOutcome {
    /// Total points granted by this claim
    pub points_awarded: i64,

    /// Flat portion of the award
    pub base_points: i64,

    /// Bonus computed from the streak held before this claim
    pub streak_bonus: i64,

    /// Cumulative total after the claim
    pub total_points: u64,

    /// Streak recorded by the claim
    pub daily_streak: u32,

    /// Level derived from the new total
    pub level: Tier,
}

/// Result of a successful task completion or bonus grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub points_awarded: i64,
    pub total_points: u64,
    pub level: Tier,
}

/// Read-only projection of a user's engagement state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementStatus {
    pub record: UserPointRecord,

    /// Whether a daily claim would currently be accepted
    pub can_claim: bool,

    /// Time until the next claim; None when one is available now
    pub next_claim_in: Option<TimeRemaining>,

    /// Points still needed for the next tier; None at the top tier
    pub points_to_next_level: Option<u64>,
}

/// Orchestrator over a [`PointStore`].
pub struct PointsEngine<S: PointStore> {
    store: S,
    config: EngineConfig,
    window: ClaimWindow,
}

impl PointsEngine<PointsDb> {
    /// Open an engine over the default SQLite store and on-disk config.
    ///
    /// # Errors
    /// Returns an error if the database or configuration cannot be loaded.
    pub fn open() -> Result<Self> {
        let config = EngineConfig::load()?;
        Ok(Self::with_config(PointsDb::open()?, config))
    }
}

impl<S: PointStore> PointsEngine<S> {
    /// Create an engine with default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an engine with custom configuration.
    pub fn with_config(store: S, config: EngineConfig) -> Self {
        let window = ClaimWindow::new(config.claim_interval_hours);
        Self {
            store,
            config,
            window,
        }
    }

    /// Get the active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Claim the daily reward for `user_id` at the current time.
    ///
    /// # Errors
    /// Fails with [`CoreError::AlreadyClaimed`] inside the claim window
    /// (side-effect-free) or with a storage error.
    pub fn claim_daily(&self, user_id: &str) -> Result<ClaimOutcome> {
        self.claim_daily_at(user_id, Utc::now())
    }

    /// Claim the daily reward at an explicit instant.
    pub fn claim_daily_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<ClaimOutcome> {
        for attempt in 0..MAX_APPLY_ATTEMPTS {
            let record = self.store.create_point_record(user_id, now)?;

            let decision = self.window.evaluate(record.last_claim_at, now);
            if !decision.allowed {
                return Err(CoreError::AlreadyClaimed {
                    remaining: decision.remaining,
                });
            }

            // The bonus scales with the streak held *before* this claim;
            // the recorded streak is what the claim establishes.
            let new_streak = streak::next_streak(record.last_claim_at, now, record.daily_streak);
            let streak_bonus = i64::from(record.daily_streak) * self.config.streak_bonus_step;
            let awarded = self.config.base_points + streak_bonus;

            let new_total = record.total_points.saturating_add(awarded.max(0) as u64);
            let new_level = Tier::for_points(new_total);

            let update = PointRecordUpdate {
                total_points: new_total,
                daily_streak: new_streak,
                last_claim_at: Some(now),
                level: new_level,
                updated_at: now,
            };
            let ledger = PointTransaction::new(
                user_id,
                awarded,
                TransactionKind::DailyClaim,
                format!(
                    "Daily claim: {} base + {} streak bonus",
                    self.config.base_points, streak_bonus
                ),
                now,
            );

            if self.store.apply_update(user_id, record.version, &update, &ledger)? {
                debug!(
                    user_id = %user_id,
                    points = awarded,
                    streak = new_streak,
                    level = %new_level,
                    "daily claim applied"
                );
                return Ok(ClaimOutcome {
                    points_awarded: awarded,
                    base_points: self.config.base_points,
                    streak_bonus,
                    total_points: new_total,
                    daily_streak: new_streak,
                    level: new_level,
                });
            }
            warn!(user_id = %user_id, attempt, "claim hit a concurrent update, re-evaluating");
        }
        Err(CoreError::Contention {
            user_id: user_id.to_string(),
        })
    }

    /// Award a flat amount for a named task, at most once per calendar day.
    ///
    /// # Errors
    /// Fails with [`CoreError::AlreadyCompletedToday`] when the task was
    /// already completed on today's calendar date (side-effect-free), or
    /// with [`CoreError::InvalidPoints`] for non-positive amounts.
    pub fn complete_task(&self, user_id: &str, task_type: &str, points: i64) -> Result<TaskOutcome> {
        self.complete_task_at(user_id, task_type, points, Utc::now())
    }

    /// Award a task at an explicit instant.
    pub fn complete_task_at(
        &self,
        user_id: &str,
        task_type: &str,
        points: i64,
        now: DateTime<Utc>,
    ) -> Result<TaskOutcome> {
        if points <= 0 {
            return Err(CoreError::InvalidPoints(points));
        }

        let today = now.date_naive();
        if let Some(existing) = self.store.get_daily_task(user_id, task_type, today)? {
            if existing.completed {
                return Err(CoreError::AlreadyCompletedToday {
                    task_type: task_type.to_string(),
                });
            }
        }

        let task = DailyTaskRecord {
            user_id: user_id.to_string(),
            task_type: task_type.to_string(),
            date: today,
            completed: true,
            points_earned: points,
            completed_at: now,
        };

        for attempt in 0..MAX_APPLY_ATTEMPTS {
            let record = self.store.create_point_record(user_id, now)?;

            let new_total = record.total_points.saturating_add(points as u64);
            let new_level = Tier::for_points(new_total);

            // Streak and last claim belong to the daily-claim path alone
            let update = PointRecordUpdate {
                total_points: new_total,
                daily_streak: record.daily_streak,
                last_claim_at: record.last_claim_at,
                level: new_level,
                updated_at: now,
            };
            let ledger = PointTransaction::new(
                user_id,
                points,
                TransactionKind::TaskCompletion,
                format!("Completed daily task '{task_type}'"),
                now,
            );

            match self
                .store
                .apply_task_completion(&task, record.version, &update, &ledger)?
            {
                TaskApplyOutcome::Applied => {
                    debug!(
                        user_id = %user_id,
                        task_type = %task_type,
                        points,
                        "daily task completed"
                    );
                    return Ok(TaskOutcome {
                        points_awarded: points,
                        total_points: new_total,
                        level: new_level,
                    });
                }
                TaskApplyOutcome::AlreadyCompleted => {
                    return Err(CoreError::AlreadyCompletedToday {
                        task_type: task_type.to_string(),
                    });
                }
                TaskApplyOutcome::Conflict => {
                    warn!(
                        user_id = %user_id,
                        task_type = %task_type,
                        attempt,
                        "task completion hit a concurrent update, re-evaluating"
                    );
                }
            }
        }
        Err(CoreError::Contention {
            user_id: user_id.to_string(),
        })
    }

    /// Grant an ad-hoc positive point amount outside the claim and task
    /// paths (e.g. an operator award). Leaves streak state untouched.
    ///
    /// # Errors
    /// Fails with [`CoreError::InvalidPoints`] for non-positive amounts.
    pub fn grant_bonus(&self, user_id: &str, points: i64, description: &str) -> Result<TaskOutcome> {
        self.grant_bonus_at(user_id, points, description, Utc::now())
    }

    /// Grant a bonus at an explicit instant.
    pub fn grant_bonus_at(
        &self,
        user_id: &str,
        points: i64,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<TaskOutcome> {
        if points <= 0 {
            return Err(CoreError::InvalidPoints(points));
        }

        for attempt in 0..MAX_APPLY_ATTEMPTS {
            let record = self.store.create_point_record(user_id, now)?;

            let new_total = record.total_points.saturating_add(points as u64);
            let new_level = Tier::for_points(new_total);

            let update = PointRecordUpdate {
                total_points: new_total,
                daily_streak: record.daily_streak,
                last_claim_at: record.last_claim_at,
                level: new_level,
                updated_at: now,
            };
            let ledger =
                PointTransaction::new(user_id, points, TransactionKind::Bonus, description, now);

            if self.store.apply_update(user_id, record.version, &update, &ledger)? {
                debug!(user_id = %user_id, points, "bonus granted");
                return Ok(TaskOutcome {
                    points_awarded: points,
                    total_points: new_total,
                    level: new_level,
                });
            }
            warn!(user_id = %user_id, attempt, "bonus grant hit a concurrent update, re-evaluating");
        }
        Err(CoreError::Contention {
            user_id: user_id.to_string(),
        })
    }

    /// Current engagement state for `user_id`; never fails for unknown
    /// users, who read as a fresh Bronze record with a claim available.
    pub fn status(&self, user_id: &str) -> Result<EngagementStatus> {
        self.status_at(user_id, Utc::now())
    }

    /// Engagement state at an explicit instant.
    pub fn status_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<EngagementStatus> {
        let record = self.store.create_point_record(user_id, now)?;
        let decision = self.window.evaluate(record.last_claim_at, now);
        Ok(EngagementStatus {
            can_claim: decision.allowed,
            next_claim_in: (!decision.allowed).then_some(decision.remaining),
            points_to_next_level: Tier::points_to_next(record.total_points),
            record,
        })
    }

    /// Newest-first page of a user's point transactions.
    pub fn history(&self, user_id: &str, limit: usize) -> Result<Vec<PointTransaction>> {
        Ok(self.store.transactions_for(user_id, limit)?)
    }
}
