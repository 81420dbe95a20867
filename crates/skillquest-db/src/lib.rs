//! Storage layer for SkillQuest.
//!
//! All persistence goes through the [`Store`] trait. Two implementations
//! exist:
//!
//! ```text
//! Store (trait)
//!     |
//!     +-- PgStore      PostgreSQL, one transaction per operation
//!     |     |-- CharacterStore  (users, characters, titles)
//!     |     |-- CatalogStore    (equipment, inventories, achievements)
//!     |     |-- QuestStore      (quests, assignments)
//!     |     |-- ProgressStore   (start, submit, grade, complete, sweep)
//!     |     +-- SocialStore     (leaderboards, notifications, groups)
//!     |
//!     +-- MemoryStore  process memory, one RwLock write guard per operation
//! ```
//!
//! Both call the same `skillquest-progression` functions to decide what a
//! grade, completion or XP grant changes, so they cannot drift apart.

pub mod catalog_store;
pub mod character_store;
mod convert;
pub mod error;
pub mod memory;
mod notices;
pub mod pg_store;
pub mod postgres;
pub mod progress_store;
pub mod quest_store;
mod rows;
pub mod social_store;
pub mod store;

pub use error::DbError;
pub use memory::MemoryStore;
pub use pg_store::PgStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::{
    AssignmentTarget, CompletionOutcome, DEFAULT_LEADERBOARD_LIMIT, GradeOutcome,
    MAX_LEADERBOARD_LIMIT, NOTIFICATION_LIMIT, NewAchievement, NewCharacter, NewEquipment,
    NewGroup, NewQuest, NewUser, QuestPatch, STARTING_TITLE, Store, Submission, SweepReport,
    UnlockReport, XpGrant, leaderboard_limit,
};
