//! Scaled quest XP.
//!
//! When an instructor picks scaled XP, the suggestion depends on the quest's
//! difficulty tier and minimum level:
//!
//! | Tier | Base | Share of the flat level cost |
//! |------|------|------------------------------|
//! | easy | 50 | 5% |
//! | medium | 100 | 10% |
//! | hard | 200 | 20% |
//!
//! Below level 10 the base grows by a quarter per level above 1, i.e.
//! `floor(base * (min_level + 3) / 4)`. From level 10 on the reward is the
//! tier's share of [`FLAT_THRESHOLD`], which keeps quests meaningful once
//! level costs stop growing.

use skillquest_types::{Difficulty, XpScaling};

use crate::curve::{FLAT_FROM_LEVEL, FLAT_THRESHOLD};
use crate::error::ProgressionError;

/// XP base of a tier below level 10.
pub const fn base_xp(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 50,
        Difficulty::Medium => 100,
        Difficulty::Hard => 200,
    }
}

/// Percentage of the flat level cost a tier grants from level 10 on.
pub const fn flat_share_percent(difficulty: Difficulty) -> u32 {
    match difficulty {
        Difficulty::Easy => 5,
        Difficulty::Medium => 10,
        Difficulty::Hard => 20,
    }
}

/// Suggested XP for a quest of the given tier and minimum level.
pub const fn scaled_xp(difficulty: Difficulty, min_level: u32) -> u32 {
    if min_level >= FLAT_FROM_LEVEL {
        return FLAT_THRESHOLD.saturating_mul(flat_share_percent(difficulty)) / 100;
    }
    let quarters = min_level.saturating_sub(1).saturating_add(4);
    base_xp(difficulty).saturating_mul(quarters) / 4
}

/// Decide the XP stored on a new quest.
///
/// - `fixed` needs an explicit positive `xp_reward`.
/// - `scaled` uses an explicit positive `xp_reward` when one is given and
///   the computed suggestion otherwise.
pub fn resolve_quest_xp(
    scaling: XpScaling,
    explicit: Option<u32>,
    difficulty: Difficulty,
    min_level: u32,
) -> Result<u32, ProgressionError> {
    let explicit = explicit.filter(|xp| *xp > 0);
    match scaling {
        XpScaling::Fixed => explicit.ok_or(ProgressionError::MissingFixedXp),
        XpScaling::Scaled => Ok(explicit.unwrap_or_else(|| scaled_xp(difficulty, min_level))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Below level 10
    // -----------------------------------------------------------------------

    #[test]
    fn level_one_pays_the_base() {
        assert_eq!(scaled_xp(Difficulty::Easy, 1), 50);
        assert_eq!(scaled_xp(Difficulty::Medium, 1), 100);
        assert_eq!(scaled_xp(Difficulty::Hard, 1), 200);
    }

    #[test]
    fn each_level_adds_a_quarter_of_the_base() {
        assert_eq!(scaled_xp(Difficulty::Medium, 5), 200);
        assert_eq!(scaled_xp(Difficulty::Easy, 2), 62);
        assert_eq!(scaled_xp(Difficulty::Hard, 9), 600);
        assert_eq!(scaled_xp(Difficulty::Easy, 9), 150);
    }

    #[test]
    fn level_zero_is_treated_as_level_one() {
        assert_eq!(scaled_xp(Difficulty::Hard, 0), 200);
    }

    // -----------------------------------------------------------------------
    // From level 10
    // -----------------------------------------------------------------------

    #[test]
    fn high_levels_pay_a_share_of_the_flat_cost() {
        assert_eq!(scaled_xp(Difficulty::Easy, 10), 200);
        assert_eq!(scaled_xp(Difficulty::Medium, 12), 400);
        assert_eq!(scaled_xp(Difficulty::Hard, 50), 800);
    }

    #[test]
    fn unknown_tier_uses_easy_base() {
        assert_eq!(scaled_xp(Difficulty::from_label("epic"), 1), 50);
        assert_eq!(scaled_xp(Difficulty::from_label("HARD"), 1), 200);
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    #[test]
    fn fixed_requires_positive_xp() {
        assert_eq!(
            resolve_quest_xp(XpScaling::Fixed, None, Difficulty::Easy, 1),
            Err(ProgressionError::MissingFixedXp)
        );
        assert_eq!(
            resolve_quest_xp(XpScaling::Fixed, Some(0), Difficulty::Easy, 1),
            Err(ProgressionError::MissingFixedXp)
        );
        assert_eq!(
            resolve_quest_xp(XpScaling::Fixed, Some(75), Difficulty::Hard, 20),
            Ok(75)
        );
    }

    #[test]
    fn scaled_prefers_explicit_override() {
        assert_eq!(
            resolve_quest_xp(XpScaling::Scaled, Some(999), Difficulty::Easy, 1),
            Ok(999)
        );
        assert_eq!(
            resolve_quest_xp(XpScaling::Scaled, None, Difficulty::Medium, 5),
            Ok(200)
        );
        assert_eq!(
            resolve_quest_xp(XpScaling::Scaled, Some(0), Difficulty::Hard, 10),
            Ok(800)
        );
    }
}
