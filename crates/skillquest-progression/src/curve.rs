//! Level-up curve.
//!
//! Below level 10 the cost of a level grows by half with every step:
//! `floor(100 * 1.5^(level - 1))`. From level 10 on every level costs a flat
//! 4000 XP. The threshold stored on a character is the cost of leaving its
//! current level.
//!
//! The growth term is evaluated as `100 * 3^n / 2^n` in integers. Both powers
//! stay far below `u32::MAX` for `n <= 8`, so the result is the exact floor.

/// Level every character starts at.
pub const STARTING_LEVEL: u32 = 1;

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 50;

/// Cost of leaving level 1.
pub const BASE_THRESHOLD: u32 = 100;

/// First level whose cost is flat.
pub const FLAT_FROM_LEVEL: u32 = 10;

/// Cost of every level from [`FLAT_FROM_LEVEL`] on.
pub const FLAT_THRESHOLD: u32 = 4000;

/// XP required to advance from `level` to `level + 1`.
///
/// Total over all inputs. Level 0 is treated like level 1.
pub const fn next_level_threshold(level: u32) -> u32 {
    if level >= FLAT_FROM_LEVEL {
        return FLAT_THRESHOLD;
    }
    let steps = level.saturating_sub(1);
    let numerator = 3_u32.saturating_pow(steps).saturating_mul(BASE_THRESHOLD);
    let denominator = 2_u32.saturating_pow(steps);
    match numerator.checked_div(denominator) {
        Some(threshold) => threshold,
        None => FLAT_THRESHOLD,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_below_ten_follow_the_growth_table() {
        let expected = [100, 150, 225, 337, 506, 759, 1139, 1708, 2562];
        for (level, want) in (1_u32..).zip(expected) {
            assert_eq!(next_level_threshold(level), want, "level {level}");
        }
    }

    #[test]
    fn thresholds_from_ten_are_flat() {
        for level in [10, 11, 25, 49, 50, 1000, u32::MAX] {
            assert_eq!(next_level_threshold(level), 4000);
        }
    }

    #[test]
    fn level_zero_costs_like_level_one() {
        assert_eq!(next_level_threshold(0), 100);
    }

    #[test]
    fn thresholds_never_decrease() {
        let mut previous = 0;
        for level in 1..=MAX_LEVEL {
            let current = next_level_threshold(level);
            assert!(current >= previous, "level {level}");
            previous = current;
        }
    }
}
