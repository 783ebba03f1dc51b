//! # Kudos Core Library
//!
//! This library implements the engagement engine behind the Kudos content
//! platform: daily point claims, consecutive-day streaks, tiered membership
//! levels, once-per-day task rewards, and an append-only point transaction
//! ledger. Request handlers (or the bundled CLI) call into it with an already
//! authenticated user id; everything else -- identity, content, rendering --
//! lives outside this crate.
//!
//! ## Architecture
//!
//! - **Level Classifier**: pure mapping from a cumulative point total to a
//!   membership tier
//! - **Claim Window Policy**: pure 24-hour gate over the last claim timestamp
//! - **Streak Evaluator**: pure calendar-day continuation rule
//! - **Points Engine**: the orchestrator that applies the three policies and
//!   persists results through the storage collaborator
//! - **Storage**: SQLite-backed [`PointStore`] implementation plus TOML
//!   configuration
//!
//! All business functions take an explicit `now` so behavior is
//! deterministic under test; the `*_at` variants expose it, the plain
//! variants default to `Utc::now()`.
//!
//! ## Key Components
//!
//! - [`PointsEngine`]: claim / task-completion / status orchestrator
//! - [`PointsDb`]: SQLite persistence for records, tasks, and the ledger
//! - [`Tier`]: membership level classification
//! - [`EngineConfig`]: tunable point amounts and claim interval

pub mod claim_window;
pub mod config;
pub mod engine;
pub mod error;
pub mod level;
pub mod points;
pub mod store;
pub mod streak;

pub use claim_window::{ClaimDecision, ClaimWindow, TimeRemaining};
pub use config::EngineConfig;
pub use engine::{ClaimOutcome, EngagementStatus, PointsEngine, TaskOutcome};
pub use error::{ConfigError, CoreError, Result, StoreError};
pub use level::Tier;
pub use points::{
    DailyTaskRecord, PointRecordUpdate, PointTransaction, TransactionKind, UserPointRecord,
};
pub use store::{PointStore, PointsDb, TaskApplyOutcome};
