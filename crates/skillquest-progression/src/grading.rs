//! Reward settlement for grading and direct completion.
//!
//! These functions decide everything a grade or completion changes, without
//! touching storage. The stores call them inside one transaction and write
//! the returned [`Settlement`] back, so the decision logic is identical for
//! `PostgreSQL` and the in-memory store.

use chrono::{DateTime, Utc};
use skillquest_types::{
    EquipmentId, GradeDecision, GrantedRewards, ProgressionState, QuestStatus, RewardBundle,
};

use crate::award::{AwardOutcome, apply_award};
use crate::error::ProgressionError;
use crate::lifecycle::{QuestAction, ensure_ungraded, transition};

/// An instructor's grade for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeRequest {
    /// Approve or reject.
    pub decision: GradeDecision,
    /// Feedback text. Mandatory for rejections.
    pub feedback: Option<String>,
}

impl GradeRequest {
    /// Check the request before any state is read.
    ///
    /// A rejection with missing or whitespace-only feedback is refused.
    pub fn validate(&self) -> Result<(), ProgressionError> {
        if self.decision == GradeDecision::Rejected && self.trimmed_feedback().is_none() {
            return Err(ProgressionError::MissingFeedback);
        }
        Ok(())
    }

    /// Feedback without surrounding whitespace, `None` when blank.
    pub fn trimmed_feedback(&self) -> Option<&str> {
        self.feedback
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

/// Everything a grade or completion writes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// New status of the progress row.
    pub status: QuestStatus,
    /// The award applied to the character. `None` for rejections.
    pub award: Option<AwardOutcome>,
    /// Title to grant and activate.
    pub title: Option<String>,
    /// Equipment to grant, unequipped, if not yet owned.
    pub equipment_id: Option<EquipmentId>,
    /// Completion time to record. `None` for rejections.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Settlement {
    /// Whether the character row has to be written.
    pub const fn touches_character(&self) -> bool {
        self.award.is_some()
    }

    /// The rewards summary returned to the caller.
    pub fn granted(&self, rewards: &RewardBundle) -> Option<GrantedRewards> {
        let award = self.award.as_ref()?;
        Some(GrantedRewards {
            xp: rewards.xp_reward,
            attributes: rewards.attribute_rewards,
            title: self.title.clone(),
            equipment_id: self.equipment_id,
            levels_gained: award.levels_gained,
        })
    }
}

/// Settle a grade on a submission.
///
/// The row must be `submitted` and carry no grade. Approval applies the
/// reward bundle; rejection leaves the character untouched.
pub fn settle_grade(
    status: QuestStatus,
    current_grade: Option<GradeDecision>,
    request: &GradeRequest,
    character: &ProgressionState,
    rewards: &RewardBundle,
    now: DateTime<Utc>,
) -> Result<Settlement, ProgressionError> {
    request.validate()?;
    ensure_ungraded(current_grade)?;
    let next = transition(status, QuestAction::from_grade(request.decision))?;

    match request.decision {
        GradeDecision::Approved => Ok(reward(next, character, rewards, now)),
        GradeDecision::Rejected => Ok(Settlement {
            status: next,
            award: None,
            title: None,
            equipment_id: None,
            completed_at: None,
        }),
    }
}

/// Settle a direct completion of a quest that needs no grading.
pub fn settle_completion(
    status: QuestStatus,
    character: &ProgressionState,
    rewards: &RewardBundle,
    now: DateTime<Utc>,
) -> Result<Settlement, ProgressionError> {
    let next = transition(status, QuestAction::Complete)?;
    Ok(reward(next, character, rewards, now))
}

fn reward(
    status: QuestStatus,
    character: &ProgressionState,
    rewards: &RewardBundle,
    now: DateTime<Utc>,
) -> Settlement {
    Settlement {
        status,
        award: Some(apply_award(
            character,
            rewards.xp_reward,
            &rewards.attribute_rewards,
        )),
        title: rewards.granted_title().map(str::to_owned),
        equipment_id: rewards.equipment_reward_id,
        completed_at: Some(now),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skillquest_types::Attributes;

    use super::*;
    use crate::award::starting_state;

    fn bundle() -> RewardBundle {
        RewardBundle {
            xp_reward: 400,
            attribute_rewards: Attributes {
                networking: 5,
                ..Attributes::default()
            },
            is_title_quest: true,
            title_reward: Some(String::from("Netzwerk-Guru")),
            equipment_reward_id: Some(EquipmentId::new()),
        }
    }

    fn approve() -> GradeRequest {
        GradeRequest {
            decision: GradeDecision::Approved,
            feedback: None,
        }
    }

    fn reject(feedback: Option<&str>) -> GradeRequest {
        GradeRequest {
            decision: GradeDecision::Rejected,
            feedback: feedback.map(str::to_owned),
        }
    }

    #[test]
    fn approval_grants_the_whole_bundle() {
        let rewards = bundle();
        let now = Utc::now();
        let settled = settle_grade(
            QuestStatus::Submitted,
            None,
            &approve(),
            &starting_state(),
            &rewards,
            now,
        )
        .unwrap();
        assert_eq!(settled.status, QuestStatus::Completed);
        assert_eq!(settled.completed_at, Some(now));
        assert_eq!(settled.title.as_deref(), Some("Netzwerk-Guru"));
        assert_eq!(settled.equipment_id, rewards.equipment_reward_id);

        let award = settled.award.map(|a| a.state);
        assert_eq!(award.map(|s| s.level), Some(3));
        assert_eq!(award.map(|s| s.xp), Some(150));
        assert_eq!(award.map(|s| s.attributes.networking), Some(15));

        let granted = settled.granted(&rewards);
        assert_eq!(granted.as_ref().map(|g| g.xp), Some(400));
        assert_eq!(granted.map(|g| g.levels_gained), Some(2));
    }

    #[test]
    fn rejection_leaves_character_untouched() {
        let settled = settle_grade(
            QuestStatus::Submitted,
            None,
            &reject(Some("Bitte Screenshots ergänzen")),
            &starting_state(),
            &bundle(),
            Utc::now(),
        );
        let settled = settled.ok();
        assert_eq!(settled.as_ref().map(|s| s.status), Some(QuestStatus::Rejected));
        assert_eq!(settled.as_ref().map(Settlement::touches_character), Some(false));
        assert_eq!(settled.and_then(|s| s.granted(&bundle())), None);
    }

    #[test]
    fn rejection_without_feedback_is_refused() {
        for feedback in [None, Some(""), Some("   \n")] {
            let result = settle_grade(
                QuestStatus::Submitted,
                None,
                &reject(feedback),
                &starting_state(),
                &bundle(),
                Utc::now(),
            );
            assert_eq!(result, Err(ProgressionError::MissingFeedback));
        }
    }

    #[test]
    fn missing_feedback_wins_over_wrong_status() {
        let result = settle_grade(
            QuestStatus::Completed,
            Some(GradeDecision::Approved),
            &reject(None),
            &starting_state(),
            &bundle(),
            Utc::now(),
        );
        assert_eq!(result, Err(ProgressionError::MissingFeedback));
    }

    #[test]
    fn second_grade_is_refused() {
        let result = settle_grade(
            QuestStatus::Completed,
            Some(GradeDecision::Approved),
            &approve(),
            &starting_state(),
            &bundle(),
            Utc::now(),
        );
        assert_eq!(result, Err(ProgressionError::AlreadyGraded));

        let result = settle_grade(
            QuestStatus::Completed,
            None,
            &approve(),
            &starting_state(),
            &bundle(),
            Utc::now(),
        );
        assert!(matches!(
            result,
            Err(ProgressionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn title_needs_the_title_flag() {
        let mut rewards = bundle();
        rewards.is_title_quest = false;
        let settled = settle_completion(
            QuestStatus::InProgress,
            &starting_state(),
            &rewards,
            Utc::now(),
        );
        assert_eq!(settled.ok().and_then(|s| s.title), None);
    }

    #[test]
    fn completion_from_submitted_is_refused() {
        let result = settle_completion(
            QuestStatus::Submitted,
            &starting_state(),
            &bundle(),
            Utc::now(),
        );
        assert!(result.is_err());
    }
}
