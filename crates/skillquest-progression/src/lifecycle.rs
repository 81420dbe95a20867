//! Quest lifecycle state machine.
//!
//! Every status change of a character's quest progress goes through
//! [`transition`]. The table below is the complete set of legal moves;
//! anything else is [`ProgressionError::InvalidTransition`].
//!
//! | Action | From | To |
//! |--------|------|----|
//! | `start` | available, in progress, rejected | in progress |
//! | `submit` | in progress, rejected | submitted |
//! | `approve` | submitted | completed |
//! | `reject` | submitted | rejected |
//! | `complete` | available, in progress | completed |
//! | `expire` | in progress, submitted | failed |
//! | `reopen` | completed, rejected, failed | available |
//!
//! Approve and complete are the only moves that grant rewards. Since both
//! leave the row in `completed`, and nothing but `reopen` leaves
//! `completed`, a submission can be rewarded at most once per cycle.

use chrono::{DateTime, Utc};
use skillquest_types::{GradeDecision, QuestStatus};

use crate::error::ProgressionError;

/// Something that can happen to a character's quest progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestAction {
    /// The character begins or resumes work.
    Start,
    /// The character hands in work.
    Submit,
    /// The instructor accepts the submission.
    Approve,
    /// The instructor refuses the submission.
    Reject,
    /// The character finishes a quest that needs no grading.
    Complete,
    /// The deadline passed.
    Expire,
    /// A repeatable quest becomes available again.
    Reopen,
}

impl QuestAction {
    /// Lowercase verb used in messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Complete => "complete",
            Self::Expire => "expire",
            Self::Reopen => "reopen",
        }
    }

    /// The grading action matching an instructor's decision.
    pub const fn from_grade(decision: GradeDecision) -> Self {
        match decision {
            GradeDecision::Approved => Self::Approve,
            GradeDecision::Rejected => Self::Reject,
        }
    }
}

impl core::fmt::Display for QuestAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status reached by applying `action` to a row in status `from`.
pub const fn transition(
    from: QuestStatus,
    action: QuestAction,
) -> Result<QuestStatus, ProgressionError> {
    use QuestAction as A;
    use QuestStatus as S;

    match (from, action) {
        (S::Available | S::InProgress | S::Rejected, A::Start) => Ok(S::InProgress),
        (S::InProgress | S::Rejected, A::Submit) => Ok(S::Submitted),
        (S::Submitted, A::Approve) | (S::Available | S::InProgress, A::Complete) => {
            Ok(S::Completed)
        }
        (S::Submitted, A::Reject) => Ok(S::Rejected),
        (S::InProgress | S::Submitted, A::Expire) => Ok(S::Failed),
        (S::Completed | S::Rejected | S::Failed, A::Reopen) => Ok(S::Available),
        _ => Err(ProgressionError::InvalidTransition { from, action }),
    }
}

/// Refuse a level below the quest's minimum.
pub const fn ensure_level(level: u32, min_level: u32) -> Result<(), ProgressionError> {
    if level < min_level {
        return Err(ProgressionError::LevelTooLow {
            required: min_level,
            actual: level,
        });
    }
    Ok(())
}

/// Refuse a submission that already carries a grade.
pub const fn ensure_ungraded(grade: Option<GradeDecision>) -> Result<(), ProgressionError> {
    if grade.is_some() {
        return Err(ProgressionError::AlreadyGraded);
    }
    Ok(())
}

/// Whether a deadline has passed at `now`.
pub fn is_overdue(due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    due_date.is_some_and(|due| due < now)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [QuestAction; 7] = [
        QuestAction::Start,
        QuestAction::Submit,
        QuestAction::Approve,
        QuestAction::Reject,
        QuestAction::Complete,
        QuestAction::Expire,
        QuestAction::Reopen,
    ];

    #[test]
    fn happy_path_through_grading() {
        let started = transition(QuestStatus::Available, QuestAction::Start);
        assert_eq!(started, Ok(QuestStatus::InProgress));
        let submitted = transition(QuestStatus::InProgress, QuestAction::Submit);
        assert_eq!(submitted, Ok(QuestStatus::Submitted));
        let approved = transition(QuestStatus::Submitted, QuestAction::Approve);
        assert_eq!(approved, Ok(QuestStatus::Completed));
    }

    #[test]
    fn rejected_work_can_be_resubmitted() {
        assert_eq!(
            transition(QuestStatus::Rejected, QuestAction::Submit),
            Ok(QuestStatus::Submitted)
        );
        assert_eq!(
            transition(QuestStatus::Rejected, QuestAction::Start),
            Ok(QuestStatus::InProgress)
        );
    }

    #[test]
    fn completed_only_leaves_through_reopen() {
        for action in ALL_ACTIONS {
            let result = transition(QuestStatus::Completed, action);
            if action == QuestAction::Reopen {
                assert_eq!(result, Ok(QuestStatus::Available));
            } else {
                assert!(result.is_err(), "{action} from completed");
            }
        }
    }

    #[test]
    fn grading_requires_a_submission() {
        for from in QuestStatus::ALL {
            for action in [QuestAction::Approve, QuestAction::Reject] {
                let result = transition(*from, action);
                assert_eq!(result.is_ok(), *from == QuestStatus::Submitted, "{action} from {from}");
            }
        }
    }

    #[test]
    fn regrading_is_refused() {
        let err = transition(QuestStatus::Completed, QuestAction::Approve);
        assert_eq!(
            err,
            Err(ProgressionError::InvalidTransition {
                from: QuestStatus::Completed,
                action: QuestAction::Approve,
            })
        );
        assert_eq!(
            ensure_ungraded(Some(GradeDecision::Rejected)),
            Err(ProgressionError::AlreadyGraded)
        );
        assert_eq!(ensure_ungraded(None), Ok(()));
    }

    #[test]
    fn direct_completion_skips_grading() {
        assert_eq!(
            transition(QuestStatus::Available, QuestAction::Complete),
            Ok(QuestStatus::Completed)
        );
        assert!(transition(QuestStatus::Submitted, QuestAction::Complete).is_err());
        assert!(transition(QuestStatus::Failed, QuestAction::Complete).is_err());
    }

    #[test]
    fn expiry_applies_to_open_work_only() {
        assert_eq!(
            transition(QuestStatus::Submitted, QuestAction::Expire),
            Ok(QuestStatus::Failed)
        );
        assert!(transition(QuestStatus::Available, QuestAction::Expire).is_err());
        assert!(transition(QuestStatus::Completed, QuestAction::Expire).is_err());
    }

    #[test]
    fn level_gate() {
        assert_eq!(ensure_level(5, 5), Ok(()));
        assert_eq!(
            ensure_level(4, 5),
            Err(ProgressionError::LevelTooLow {
                required: 5,
                actual: 4
            })
        );
    }

    #[test]
    fn overdue_compares_strictly() {
        let now = Utc::now();
        assert!(!is_overdue(None, now));
        assert!(!is_overdue(Some(now), now));
        assert!(is_overdue(Some(now - chrono::Duration::minutes(1)), now));
    }

    #[test]
    fn error_message_names_action_and_status() {
        let err = transition(QuestStatus::Failed, QuestAction::Submit);
        let message = err.err().map(|e| e.to_string());
        assert_eq!(message.as_deref(), Some("cannot submit a quest that is failed"));
    }
}
