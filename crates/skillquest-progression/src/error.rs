//! Error types for the skillquest-progression crate.
//!
//! Every rule the engine enforces fails with a typed [`ProgressionError`]
//! instead of panicking. The stores propagate these unchanged and the API
//! maps each variant to an HTTP status.

use skillquest_types::QuestStatus;

use crate::lifecycle::QuestAction;

/// Errors raised by progression rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressionError {
    /// The quest status does not allow the requested action.
    #[error("cannot {action} a quest that is {from}")]
    InvalidTransition {
        /// Current status of the progress row.
        from: QuestStatus,
        /// The action that was refused.
        action: QuestAction,
    },

    /// The submission already carries a grade.
    #[error("submission has already been graded")]
    AlreadyGraded,

    /// A rejection was sent without feedback.
    #[error("feedback is required when rejecting a submission")]
    MissingFeedback,

    /// A fixed-XP quest was created without a positive XP value.
    #[error("xp_reward must be a positive number for fixed XP quests")]
    MissingFixedXp,

    /// A repeat schedule is incomplete or out of range.
    #[error("invalid repeat schedule: {reason}")]
    InvalidSchedule {
        /// What is wrong with the schedule.
        reason: String,
    },

    /// The character's level is below the quest's minimum.
    #[error("character level {actual} is below the required level {required}")]
    LevelTooLow {
        /// Minimum level of the quest.
        required: u32,
        /// Current level of the character.
        actual: u32,
    },
}
