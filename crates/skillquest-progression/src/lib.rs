//! Progression engine for SkillQuest.
//!
//! Pure, synchronous rules for how characters grow. Nothing in this crate
//! performs I/O; the stores call into it inside their transactions so every
//! storage backend applies exactly the same rules.
//!
//! # Modules
//!
//! - [`curve`] -- XP threshold per level and the level cap
//! - [`scaling`] -- Suggested quest XP from difficulty and minimum level
//! - [`award`] -- The award operation (attribute clamp, level-up loop, cap)
//! - [`lifecycle`] -- Quest status state machine
//! - [`grading`] -- Settlement of grades and direct completions
//! - [`achievements`] -- Achievement unlock evaluation
//! - [`schedule`] -- Repeat schedules for recurring quests
//! - [`error`] -- Shared error type

pub mod achievements;
pub mod award;
pub mod curve;
pub mod error;
pub mod grading;
pub mod lifecycle;
pub mod scaling;
pub mod schedule;

pub use achievements::{CharacterStats, UnlockOutcome, evaluate_unlocks};
pub use award::{AwardOutcome, MAX_ATTRIBUTE, apply_award, increase_attribute, starting_state};
pub use curve::{MAX_LEVEL, next_level_threshold};
pub use error::ProgressionError;
pub use grading::{GradeRequest, Settlement, settle_completion, settle_grade};
pub use lifecycle::{QuestAction, transition};
pub use scaling::{resolve_quest_xp, scaled_xp};
pub use schedule::ValidSchedule;
