//! Fixed rules tables for encounter math.
//!
//! XP thresholds per character level and difficulty, the challenge
//! rating to XP mapping, and the encounter-size multipliers. Values are
//! the standard 5e tables; unknown inputs degrade to zero contribution
//! rather than erroring, so one odd enemy line never sinks a whole
//! encounter.

use loreforge_types::Difficulty;

/// XP thresholds per character level: `[easy, medium, hard, deadly]`.
/// Index 0 is level 1.
const XP_THRESHOLDS: [[u32; 4]; 20] = [
    [25, 50, 75, 100],
    [50, 100, 150, 200],
    [75, 150, 225, 400],
    [125, 250, 375, 500],
    [250, 500, 750, 1_100],
    [300, 600, 900, 1_400],
    [350, 750, 1_100, 1_700],
    [450, 900, 1_400, 2_100],
    [550, 1_100, 1_600, 2_400],
    [600, 1_200, 1_900, 2_800],
    [800, 1_600, 2_400, 3_600],
    [1_000, 2_000, 3_000, 4_500],
    [1_100, 2_200, 3_400, 5_100],
    [1_250, 2_500, 3_800, 5_700],
    [1_400, 2_800, 4_300, 6_400],
    [1_600, 3_200, 4_800, 7_200],
    [2_000, 3_900, 5_900, 8_800],
    [2_100, 4_200, 6_300, 9_500],
    [2_400, 4_900, 7_300, 10_900],
    [2_800, 5_700, 8_500, 12_700],
];

/// Challenge rating to XP value. Ratings up to 20; anything else
/// contributes zero.
const CR_XP: &[(&str, u32)] = &[
    ("0", 10),
    ("1/8", 25),
    ("1/4", 50),
    ("1/2", 100),
    ("1", 200),
    ("2", 450),
    ("3", 700),
    ("4", 1_100),
    ("5", 1_800),
    ("6", 2_300),
    ("7", 2_900),
    ("8", 3_900),
    ("9", 5_000),
    ("10", 5_900),
    ("11", 7_200),
    ("12", 8_400),
    ("13", 10_000),
    ("14", 11_500),
    ("15", 13_000),
    ("16", 15_000),
    ("17", 18_000),
    ("18", 20_000),
    ("19", 22_000),
    ("20", 25_000),
];

/// Per-character XP threshold for a level and difficulty.
///
/// Levels are clamped into `1..=20`.
pub fn xp_threshold(party_level: u32, difficulty: Difficulty) -> u32 {
    let level_index = party_level.clamp(1, 20).saturating_sub(1) as usize;
    let difficulty_index = match difficulty {
        Difficulty::Easy => 0,
        Difficulty::Medium => 1,
        Difficulty::Hard => 2,
        Difficulty::Deadly => 3,
    };
    XP_THRESHOLDS
        .get(level_index)
        .and_then(|row| row.get(difficulty_index))
        .copied()
        .unwrap_or(0)
}

/// Whole-party XP budget: the per-character threshold times party size.
pub fn xp_budget(party_level: u32, difficulty: Difficulty, party_size: u32) -> u32 {
    xp_threshold(party_level, difficulty).saturating_mul(party_size)
}

/// XP value of a challenge rating. Unknown ratings are worth zero.
pub fn cr_to_xp(cr: &str) -> u32 {
    let trimmed = cr.trim();
    // Accept decimal spellings of the fractional ratings.
    let canonical = match trimmed {
        "0.125" => "1/8",
        "0.25" => "1/4",
        "0.5" => "1/2",
        other => other,
    };
    CR_XP
        .iter()
        .find(|(rating, _)| *rating == canonical)
        .map(|(_, xp)| *xp)
        .unwrap_or(0)
}

/// Numeric value of a challenge rating, for averaging. Unknown ratings
/// count as zero.
pub fn cr_numeric(cr: &str) -> f64 {
    let trimmed = cr.trim();
    match trimmed {
        "1/8" => 0.125,
        "1/4" => 0.25,
        "1/2" => 0.5,
        other => other.parse().unwrap_or(0.0),
    }
}

/// Encounter multiplier for the number of enemies.
pub const fn group_multiplier(enemy_count: u32) -> f64 {
    match enemy_count {
        0 | 1 => 1.0,
        2 => 1.5,
        3..=6 => 2.0,
        7..=10 => 2.5,
        11..=14 => 3.0,
        _ => 4.0,
    }
}

/// Adjustment for unusually small or large parties.
pub const fn party_size_modifier(party_size: u32) -> f64 {
    if party_size < 3 {
        1.5
    } else if party_size > 5 {
        0.5
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medium_budget_for_level_five_party_of_four() {
        assert_eq!(xp_threshold(5, Difficulty::Medium), 500);
        assert_eq!(xp_budget(5, Difficulty::Medium, 4), 2_000);
    }

    #[test]
    fn budgets_clamp_out_of_range_levels() {
        assert_eq!(xp_threshold(0, Difficulty::Easy), 25);
        assert_eq!(xp_threshold(99, Difficulty::Deadly), 12_700);
    }

    #[test]
    fn cr_table_values() {
        assert_eq!(cr_to_xp("0"), 10);
        assert_eq!(cr_to_xp("1/8"), 25);
        assert_eq!(cr_to_xp("1/2"), 100);
        assert_eq!(cr_to_xp("1"), 200);
        assert_eq!(cr_to_xp("2"), 450);
        assert_eq!(cr_to_xp("20"), 25_000);
    }

    #[test]
    fn decimal_fractions_are_accepted() {
        assert_eq!(cr_to_xp("0.5"), 100);
        assert_eq!(cr_to_xp("0.25"), 50);
        assert_eq!(cr_to_xp(" 1/8 "), 25);
    }

    #[test]
    fn unknown_ratings_contribute_zero() {
        assert_eq!(cr_to_xp("21"), 0);
        assert_eq!(cr_to_xp("boss"), 0);
        assert!((cr_numeric("boss") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cr_numeric_parses_fractions_and_integers() {
        assert!((cr_numeric("1/2") - 0.5).abs() < f64::EPSILON);
        assert!((cr_numeric("3") - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn multiplier_bands() {
        assert!((group_multiplier(1) - 1.0).abs() < f64::EPSILON);
        assert!((group_multiplier(2) - 1.5).abs() < f64::EPSILON);
        assert!((group_multiplier(3) - 2.0).abs() < f64::EPSILON);
        assert!((group_multiplier(6) - 2.0).abs() < f64::EPSILON);
        assert!((group_multiplier(7) - 2.5).abs() < f64::EPSILON);
        assert!((group_multiplier(10) - 2.5).abs() < f64::EPSILON);
        assert!((group_multiplier(11) - 3.0).abs() < f64::EPSILON);
        assert!((group_multiplier(14) - 3.0).abs() < f64::EPSILON);
        assert!((group_multiplier(15) - 4.0).abs() < f64::EPSILON);
        assert!((group_multiplier(40) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn party_size_bands() {
        assert!((party_size_modifier(1) - 1.5).abs() < f64::EPSILON);
        assert!((party_size_modifier(2) - 1.5).abs() < f64::EPSILON);
        assert!((party_size_modifier(3) - 1.0).abs() < f64::EPSILON);
        assert!((party_size_modifier(5) - 1.0).abs() < f64::EPSILON);
        assert!((party_size_modifier(6) - 0.5).abs() < f64::EPSILON);
    }
}
