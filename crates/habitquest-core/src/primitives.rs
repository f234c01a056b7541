//! # Economy Primitives
//!
//! Hardcoded constants for the HabitQuest progression engine.
//!
//! HabitQuest starts every profile from the same fixed rules.
//! These primitives are compiled into the binary and are immutable at runtime.
//!
//! ## Primitives
//!
//! 1. **Leveling Curve**: `round(BASE_XP * (3/2)^(level - 1))`.
//! 2. **Gate Economy**: analysis/refresh costs, active gate cap, clear payout floor.
//! 3. **Profile Defaults**: the starting title and job.

// =============================================================================
// LEVELING CURVE
// =============================================================================

/// Experience needed to leave level 1.
pub const BASE_XP: u64 = 100;

/// Numerator of the per-level growth factor (1.5 = 3/2).
pub const XP_GROWTH_NUMERATOR: u128 = 3;

/// Denominator of the per-level growth factor (1.5 = 3/2).
///
/// The threshold computation relies on this being 2: the fractional part of the
/// running product is tracked as a binary fraction.
pub const XP_GROWTH_DENOMINATOR: u128 = 2;

/// Saturation value for thresholds that no longer fit the experience counter.
pub const MAX_THRESHOLD: u64 = u64::MAX;

// =============================================================================
// PROFILE DEFAULTS
// =============================================================================

/// Title given to a freshly created profile.
pub const DEFAULT_TITLE: &str = "Novice";

/// Job given to a freshly created profile.
pub const DEFAULT_JOB: &str = "Unspecialized";

/// Level at which an unspecialized profile receives its first job.
pub const AWAKENING_LEVEL: u32 = 20;

/// Job assigned at [`AWAKENING_LEVEL`].
pub const AWAKENED_JOB: &str = "Hunter - Awakened";

/// Titles granted when a level is reached during a level-up.
pub const LEVEL_TITLES: &[(u32, &str)] = &[
    (5, "E-Rank Hunter"),
    (10, "Wolf Slayer"),
    (20, "D-Rank Hunter"),
    (30, "Naga Hunter"),
    (50, "C-Rank Hunter"),
];

// =============================================================================
// GATE ECONOMY
// =============================================================================

/// Mana crystals spent to analyze a Locked gate.
pub const ANALYSIS_COST: u64 = 10;

/// Mana crystals spent to refresh a Locked gate.
pub const REFRESH_LOCKED_COST: u64 = 2;

/// Mana crystals spent to refresh an Analyzed gate.
pub const REFRESH_ANALYZED_COST: u64 = 5;

/// Maximum number of gates that are not yet Cleared.
///
/// Spawning never pushes the active count above this value.
pub const MAX_ACTIVE_GATES: usize = 3;

/// Minimum mana paid out on a successful clear, regardless of the generated reward.
pub const MIN_CLEAR_PAYOUT: u64 = 50;

/// Chance (1 in N) that a generated reward also carries a title.
pub const REWARD_TITLE_ODDS: u32 = 5;

// =============================================================================
// FIXED-POINT SCALES
// =============================================================================

/// Stat ratios are expressed in tenths (0.7 = 7).
pub const RATIO_SCALE: i64 = 10;

/// Artifact boost magnitudes are stored in thousandths (1.5 = 1500).
pub const MAGNITUDE_SCALE: i64 = 1000;

/// Progress fractions are reported in thousandths.
pub const PER_MILLE: u64 = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_costs_are_ordered() {
        assert!(REFRESH_LOCKED_COST < REFRESH_ANALYZED_COST);
        assert!(REFRESH_ANALYZED_COST < ANALYSIS_COST);
    }

    #[test]
    fn level_titles_sorted() {
        assert!(LEVEL_TITLES.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
