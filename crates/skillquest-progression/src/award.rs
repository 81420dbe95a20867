//! The award operation: the only way XP and quest attributes reach a character.
//!
//! Grading, direct completion, direct XP grants and achievement rewards all
//! call [`apply_award`], so the attribute clamp, the level-up loop and the
//! level cap apply identically on every path.
//!
//! # Algorithm
//!
//! 1. Add each attribute gain, clamping the result at [`MAX_ATTRIBUTE`].
//! 2. Add the XP gain to the banked XP.
//! 3. While the banked XP covers the current threshold and the level is
//!    below [`MAX_LEVEL`], pay the threshold, gain a level and look up the
//!    next threshold.
//! 4. At [`MAX_LEVEL`], clamp banked XP to one below the threshold and
//!    report the rest as discarded.
//!
//! XP is accumulated in `u64`, so no gain representable as `u32` overflows.

use skillquest_types::{Attribute, Attributes, ProgressionState};

use crate::curve::{MAX_LEVEL, STARTING_LEVEL, next_level_threshold};

/// Upper bound of every attribute.
pub const MAX_ATTRIBUTE: u32 = 100;

/// Result of one award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardOutcome {
    /// The character's state after the award.
    pub state: ProgressionState,
    /// Number of levels gained.
    pub levels_gained: u32,
    /// XP dropped because the character is at the level cap.
    pub xp_discarded: u64,
}

/// Progression state of a freshly created character.
pub const fn starting_state() -> ProgressionState {
    ProgressionState {
        level: STARTING_LEVEL,
        xp: 0,
        xp_to_next_level: next_level_threshold(STARTING_LEVEL),
        attributes: Attributes::starting(),
    }
}

/// Add `gain` to `current`, clamped at [`MAX_ATTRIBUTE`].
pub const fn clamped_attribute(current: u32, gain: u32) -> u32 {
    let raised = current.saturating_add(gain);
    if raised > MAX_ATTRIBUTE {
        MAX_ATTRIBUTE
    } else {
        raised
    }
}

/// Add every gain in `gains` to `attributes`, clamping each at 100.
pub fn add_attributes(attributes: &Attributes, gains: &Attributes) -> Attributes {
    let mut raised = *attributes;
    for (attribute, gain) in gains.iter() {
        raised.set(attribute, clamped_attribute(attributes.get(attribute), gain));
    }
    raised
}

/// Raise a single attribute by `amount`, clamping at 100.
pub fn increase_attribute(attributes: &Attributes, attribute: Attribute, amount: u32) -> Attributes {
    let mut raised = *attributes;
    raised.set(attribute, clamped_attribute(attributes.get(attribute), amount));
    raised
}

/// Apply an XP gain and attribute gains to a progression state.
///
/// Never fails and never panics. A stored threshold of zero is treated as
/// missing and replaced by the curve's value for the current level.
pub fn apply_award(
    state: &ProgressionState,
    xp_gain: u32,
    attribute_gains: &Attributes,
) -> AwardOutcome {
    let attributes = add_attributes(&state.attributes, attribute_gains);

    let start_level = state.level.clamp(STARTING_LEVEL, MAX_LEVEL);
    let mut level = start_level;
    let mut to_next = match state.xp_to_next_level {
        0 => next_level_threshold(level),
        stored => stored,
    };
    let mut xp = u64::from(state.xp).saturating_add(u64::from(xp_gain));

    while xp >= u64::from(to_next) && level < MAX_LEVEL {
        xp = xp.saturating_sub(u64::from(to_next));
        level = level.saturating_add(1);
        to_next = next_level_threshold(level);
    }

    let mut xp_discarded = 0;
    if level >= MAX_LEVEL {
        let cap = u64::from(to_next.saturating_sub(1));
        if xp > cap {
            xp_discarded = xp.saturating_sub(cap);
            xp = cap;
        }
    }

    // Below the cap the loop leaves xp < to_next; at the cap xp <= to_next - 1.
    let banked = u32::try_from(xp).unwrap_or(to_next.saturating_sub(1));

    AwardOutcome {
        state: ProgressionState {
            level,
            xp: banked,
            xp_to_next_level: to_next,
            attributes,
        },
        levels_gained: level.saturating_sub(start_level),
        xp_discarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(level: u32, xp: u32) -> ProgressionState {
        ProgressionState {
            level,
            xp,
            xp_to_next_level: next_level_threshold(level),
            attributes: Attributes::starting(),
        }
    }

    // -----------------------------------------------------------------------
    // Level-up loop
    // -----------------------------------------------------------------------

    #[test]
    fn new_character_defaults() {
        let s = starting_state();
        assert_eq!(s.level, 1);
        assert_eq!(s.xp, 0);
        assert_eq!(s.xp_to_next_level, 100);
        assert_eq!(s.attributes, Attributes::uniform(10));
    }

    #[test]
    fn small_gain_banks_without_level_up() {
        let outcome = apply_award(&state(1, 0), 50, &Attributes::default());
        assert_eq!(outcome.state.level, 1);
        assert_eq!(outcome.state.xp, 50);
        assert_eq!(outcome.levels_gained, 0);
    }

    #[test]
    fn exact_threshold_levels_up_with_zero_remainder() {
        let outcome = apply_award(&state(1, 0), 100, &Attributes::default());
        assert_eq!(outcome.state.level, 2);
        assert_eq!(outcome.state.xp, 0);
        assert_eq!(outcome.state.xp_to_next_level, 150);
    }

    #[test]
    fn large_gain_levels_up_multiple_times() {
        let outcome = apply_award(&state(1, 0), 400, &Attributes::default());
        assert_eq!(outcome.state.level, 3);
        assert_eq!(outcome.state.xp, 150);
        assert_eq!(outcome.state.xp_to_next_level, 225);
        assert_eq!(outcome.levels_gained, 2);
    }

    #[test]
    fn banked_xp_counts_toward_the_threshold() {
        let outcome = apply_award(&state(9, 2500), 100, &Attributes::default());
        assert_eq!(outcome.state.level, 10);
        assert_eq!(outcome.state.xp, 38);
        assert_eq!(outcome.state.xp_to_next_level, 4000);
    }

    #[test]
    fn xp_stays_below_threshold_after_any_award() {
        for gain in [0, 1, 99, 100, 101, 5_000, 60_000, 1_000_000] {
            let outcome = apply_award(&state(1, 0), gain, &Attributes::default());
            let s = outcome.state;
            assert!(s.xp < s.xp_to_next_level, "gain {gain}");
            assert!(s.level <= MAX_LEVEL);
        }
    }

    #[test]
    fn zero_stored_threshold_is_recomputed() {
        let mut s = state(2, 0);
        s.xp_to_next_level = 0;
        let outcome = apply_award(&s, 149, &Attributes::default());
        assert_eq!(outcome.state.level, 2);
        assert_eq!(outcome.state.xp, 149);
        assert_eq!(outcome.state.xp_to_next_level, 150);
    }

    // -----------------------------------------------------------------------
    // Level cap
    // -----------------------------------------------------------------------

    #[test]
    fn level_cap_discards_overflow() {
        let outcome = apply_award(&state(49, 0), 10_000, &Attributes::default());
        assert_eq!(outcome.state.level, 50);
        assert_eq!(outcome.state.xp, 3999);
        assert_eq!(outcome.state.xp_to_next_level, 4000);
        assert_eq!(outcome.xp_discarded, 2001);
    }

    #[test]
    fn crossing_the_cap_many_times_over_stops_below_the_last_threshold() {
        let start = state(49, 3999);
        for gain in [1, 4_001, 12_000, 1_000_000, u32::MAX] {
            let outcome = apply_award(&start, gain, &Attributes::default());
            let s = outcome.state;
            assert_eq!(s.level, MAX_LEVEL, "gain {gain}");
            assert!(s.xp < s.xp_to_next_level, "gain {gain}");
            assert_eq!(outcome.levels_gained, 1, "gain {gain}");
        }

        let outcome = apply_award(&start, 12_000, &Attributes::default());
        assert_eq!(outcome.state.xp, 3999);
        assert_eq!(outcome.xp_discarded, 8000);
    }

    #[test]
    fn award_at_cap_never_raises_level() {
        let outcome = apply_award(&state(50, 3999), u32::MAX, &Attributes::default());
        assert_eq!(outcome.state.level, 50);
        assert_eq!(outcome.state.xp, 3999);
        assert_eq!(outcome.levels_gained, 0);
    }

    #[test]
    fn out_of_range_level_is_clamped() {
        let mut s = state(50, 0);
        s.level = 77;
        let outcome = apply_award(&s, 10, &Attributes::default());
        assert_eq!(outcome.state.level, 50);
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    #[test]
    fn attributes_clamp_at_one_hundred() {
        let mut current = state(1, 0);
        current.attributes.programming = 95;
        let gains = Attributes {
            programming: 10,
            security: 5,
            ..Attributes::default()
        };
        let outcome = apply_award(&current, 0, &gains);
        assert_eq!(outcome.state.attributes.programming, 100);
        assert_eq!(outcome.state.attributes.security, 15);
        assert_eq!(outcome.state.attributes.networking, 10);
    }

    #[test]
    fn clamp_holds_for_every_starting_value() {
        for start in 0..=100 {
            let mut current = state(1, 0);
            current.attributes = Attributes::uniform(start);
            let once = apply_award(&current, 0, &Attributes::uniform(u32::MAX));
            assert_eq!(once.state.attributes, Attributes::uniform(100), "start {start}");

            let twice = apply_award(&once.state, 0, &Attributes::uniform(u32::MAX));
            assert_eq!(twice.state.attributes, Attributes::uniform(100), "start {start}");

            let modest = apply_award(&current, 0, &Attributes::uniform(7));
            assert_eq!(
                modest.state.attributes,
                Attributes::uniform(start.saturating_add(7).min(100)),
                "start {start}"
            );
        }
    }

    #[test]
    fn attribute_gain_saturates_instead_of_overflowing() {
        let raised = increase_attribute(&Attributes::starting(), Attribute::Hardware, u32::MAX);
        assert_eq!(raised.hardware, 100);
        assert_eq!(raised.databases, 10);
    }

    #[test]
    fn zero_award_is_identity_below_cap() {
        let before = state(7, 321);
        let outcome = apply_award(&before, 0, &Attributes::default());
        assert_eq!(outcome.state, before);
    }
}
