//! Achievement unlock evaluation.
//!
//! An achievement unlocks once the character statistic named by its
//! requirement reaches the threshold. Unlocking grants the achievement's XP
//! through [`apply_award`], which can raise the level far enough to unlock a
//! level achievement in turn, so evaluation repeats until nothing new
//! qualifies.

use std::collections::BTreeSet;

use skillquest_types::{Achievement, AchievementId, Attributes, ProgressionState, RequirementKind};

use crate::award::{AwardOutcome, apply_award};

/// Character statistics achievements are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterStats {
    /// Level and attributes.
    pub progression: ProgressionState,
    /// Number of completed quests.
    pub completed_quests: u64,
    /// Number of owned equipment items.
    pub owned_equipment: u64,
}

impl CharacterStats {
    /// The value a requirement of `kind` is compared with.
    pub fn value_for(&self, kind: RequirementKind) -> u64 {
        match kind {
            RequirementKind::Level => u64::from(self.progression.level),
            RequirementKind::Stat => u64::from(self.progression.attributes.highest()),
            RequirementKind::QuestCount => self.completed_quests,
            RequirementKind::EquipmentCount => self.owned_equipment,
        }
    }

    /// Whether `achievement`'s threshold is reached.
    pub fn meets(&self, achievement: &Achievement) -> bool {
        self.value_for(achievement.requirement_kind) >= u64::from(achievement.requirement_value)
    }
}

/// Result of an unlock evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockOutcome<'a> {
    /// Newly unlocked achievements, in unlock order.
    pub unlocked: Vec<&'a Achievement>,
    /// The award of all unlocked XP combined. `None` when nothing unlocked.
    pub award: Option<AwardOutcome>,
}

impl UnlockOutcome<'_> {
    /// Total XP granted by the unlocks.
    pub fn xp_granted(&self) -> u64 {
        self.unlocked
            .iter()
            .map(|a| u64::from(a.xp_reward))
            .fold(0, u64::saturating_add)
    }
}

/// Find every achievement the character newly qualifies for.
///
/// `already_unlocked` holds the IDs the character owns. XP of each round of
/// unlocks is applied before the next round is evaluated.
pub fn evaluate_unlocks<'a>(
    stats: &CharacterStats,
    catalogue: &'a [Achievement],
    already_unlocked: &BTreeSet<AchievementId>,
) -> UnlockOutcome<'a> {
    let mut owned = already_unlocked.clone();
    let mut current = *stats;
    let mut unlocked = Vec::new();
    let mut award: Option<AwardOutcome> = None;

    loop {
        let round: Vec<&Achievement> = catalogue
            .iter()
            .filter(|a| !owned.contains(&a.id) && current.meets(a))
            .collect();
        if round.is_empty() {
            break;
        }

        let mut state = current.progression;
        for achievement in &round {
            owned.insert(achievement.id);
            let outcome = apply_award(&state, achievement.xp_reward, &Attributes::default());
            state = outcome.state;
            award = Some(merge(award, outcome));
        }
        current.progression = state;
        unlocked.extend(round);
    }

    UnlockOutcome { unlocked, award }
}

fn merge(previous: Option<AwardOutcome>, next: AwardOutcome) -> AwardOutcome {
    match previous {
        None => next,
        Some(prev) => AwardOutcome {
            state: next.state,
            levels_gained: prev.levels_gained.saturating_add(next.levels_gained),
            xp_discarded: prev.xp_discarded.saturating_add(next.xp_discarded),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::award::starting_state;

    fn achievement(kind: RequirementKind, value: u32, xp: u32) -> Achievement {
        Achievement {
            id: AchievementId::new(),
            name: format!("{kind} {value}"),
            description: String::new(),
            icon: None,
            category: String::from("progress"),
            xp_reward: xp,
            requirement_kind: kind,
            requirement_value: value,
        }
    }

    fn stats() -> CharacterStats {
        CharacterStats {
            progression: starting_state(),
            completed_quests: 0,
            owned_equipment: 0,
        }
    }

    #[test]
    fn stat_requirement_uses_highest_attribute() {
        let mut s = stats();
        s.progression.attributes.security = 50;
        assert!(s.meets(&achievement(RequirementKind::Stat, 50, 0)));
        assert!(!s.meets(&achievement(RequirementKind::Stat, 51, 0)));
    }

    #[test]
    fn counts_are_compared_with_thresholds() {
        let mut s = stats();
        s.completed_quests = 10;
        s.owned_equipment = 2;
        assert!(s.meets(&achievement(RequirementKind::QuestCount, 10, 0)));
        assert!(!s.meets(&achievement(RequirementKind::EquipmentCount, 3, 0)));
    }

    #[test]
    fn owned_achievements_are_skipped() {
        let first = achievement(RequirementKind::Level, 1, 10);
        let owned = BTreeSet::from([first.id]);
        let catalogue = vec![first];
        let outcome = evaluate_unlocks(&stats(), &catalogue, &owned);
        assert!(outcome.unlocked.is_empty());
        assert_eq!(outcome.award, None);
    }

    #[test]
    fn unlock_xp_goes_through_the_award_loop() {
        let catalogue = vec![achievement(RequirementKind::QuestCount, 1, 250)];
        let mut s = stats();
        s.completed_quests = 1;
        let outcome = evaluate_unlocks(&s, &catalogue, &BTreeSet::new());
        assert_eq!(outcome.unlocked.len(), 1);
        assert_eq!(outcome.xp_granted(), 250);
        let state = outcome.award.map(|a| a.state);
        assert_eq!(state.map(|st| st.level), Some(3));
        assert_eq!(state.map(|st| st.xp), Some(0));
    }

    #[test]
    fn level_ups_from_unlocks_cascade() {
        let catalogue = vec![
            achievement(RequirementKind::Level, 2, 0),
            achievement(RequirementKind::QuestCount, 1, 100),
        ];
        let mut s = stats();
        s.completed_quests = 1;
        let outcome = evaluate_unlocks(&s, &catalogue, &BTreeSet::new());
        assert_eq!(outcome.unlocked.len(), 2);
        assert_eq!(
            outcome.unlocked.last().map(|a| a.requirement_kind),
            Some(RequirementKind::Level)
        );
        assert_eq!(outcome.award.map(|a| a.levels_gained), Some(1));
    }
}
