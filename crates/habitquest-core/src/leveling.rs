//! # Leveling Engine
//!
//! Pure leveling-curve math and multi-level-up resolution.
//!
//! The curve is `round(BASE_XP * 1.5^(level - 1))` with a floor of 1, saturating at
//! [`MAX_THRESHOLD`]. It is evaluated exactly with integers: the running product is
//! split into a whole part and a binary fraction, so rounding matches the real-valued
//! formula at every level.

use crate::primitives::{
    AWAKENED_JOB, AWAKENING_LEVEL, BASE_XP, DEFAULT_JOB, LEVEL_TITLES, MAX_THRESHOLD, PER_MILLE,
    XP_GROWTH_DENOMINATOR, XP_GROWTH_NUMERATOR,
};
use crate::{EssenceState, GateRank, Profile};
use serde::{Deserialize, Serialize};

/// Progress through the current level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub current_xp: u64,
    pub needed_xp: u64,
    /// Clamped `current_xp / needed_xp`, in thousandths (0..=1000).
    pub per_mille: u64,
}

/// Stateless leveling rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelingEngine;

impl LevelingEngine {
    /// Create a leveling engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Experience needed to advance from `level` to `level + 1`.
    ///
    /// Levels below 1 are treated as level 1.
    #[must_use]
    pub fn threshold(&self, level: u32) -> u64 {
        let steps = level.saturating_sub(1);
        let mut whole = u128::from(BASE_XP);
        // Fractional part of the product, as a numerator over 2^k after k steps.
        let mut fraction: u128 = 0;

        for k in 0..steps {
            let scaled = whole * XP_GROWTH_NUMERATOR;
            let carried_half = (scaled % XP_GROWTH_DENOMINATOR) << k;
            let next_fraction = carried_half + fraction * XP_GROWTH_NUMERATOR;
            whole = scaled / XP_GROWTH_DENOMINATOR + (next_fraction >> (k + 1));
            fraction = next_fraction & ((1u128 << (k + 1)) - 1);

            if whole > u128::from(MAX_THRESHOLD) {
                return MAX_THRESHOLD;
            }
        }

        // Round half away from zero.
        if steps > 0 && fraction >= (1u128 << (steps - 1)) {
            whole += 1;
        }

        u64::try_from(whole).unwrap_or(MAX_THRESHOLD).max(1)
    }

    /// Add experience and resolve every level-up it pays for.
    ///
    /// Returns the final level if at least one level-up happened. A non-positive
    /// amount is a no-op. Titles and the awakening job are applied per level crossed;
    /// the profile is only written once all levels are resolved.
    pub fn add_xp(&self, profile: &mut Profile, amount: i64) -> Option<u32> {
        if amount <= 0 {
            return None;
        }

        let mut next = profile.clone();
        next.xp = next.xp.saturating_add(amount.unsigned_abs());
        let starting_level = next.level;

        let mut needed = self.threshold(next.level);
        while next.xp >= needed && needed > 0 {
            next.xp -= needed;
            next.level = next.level.saturating_add(1);
            tracing::debug!(level = next.level, remaining_xp = next.xp, "level up");
            self.apply_level_rewards(&mut next);

            if next.level == u32::MAX {
                break;
            }
            needed = self.threshold(next.level);
        }

        let leveled_up = next.level > starting_level;
        *profile = next;

        if leveled_up {
            tracing::info!(
                from = starting_level,
                to = profile.level,
                title = %profile.title,
                "profile leveled up"
            );
            Some(profile.level)
        } else {
            None
        }
    }

    /// Read-only progress toward the next level.
    #[must_use]
    pub fn progress(&self, profile: &Profile) -> LevelProgress {
        let needed_xp = self.threshold(profile.level);
        let current_xp = profile.xp;

        let per_mille = if needed_xp == 0 {
            if current_xp > 0 { PER_MILLE } else { 0 }
        } else {
            let scaled = u128::from(current_xp) * u128::from(PER_MILLE) / u128::from(needed_xp);
            u64::try_from(scaled).unwrap_or(PER_MILLE).min(PER_MILLE)
        };

        LevelProgress {
            current_xp,
            needed_xp,
            per_mille,
        }
    }

    /// Essence intensity derived from level progress.
    ///
    /// Bright above one half, Dim above one tenth, otherwise Off.
    #[must_use]
    pub fn essence_state(&self, profile: &Profile) -> EssenceState {
        let current = u128::from(profile.xp);
        let needed = u128::from(self.threshold(profile.level));

        if current * 2 > needed {
            EssenceState::Bright
        } else if current * 10 > needed {
            EssenceState::Dim
        } else {
            EssenceState::Off
        }
    }

    /// Display rank of the hunter at the profile's level.
    #[must_use]
    pub fn hunter_rank(&self, profile: &Profile) -> GateRank {
        GateRank::for_level(profile.level)
    }

    fn apply_level_rewards(&self, profile: &mut Profile) {
        if let Some((_, title)) = LEVEL_TITLES.iter().find(|(lvl, _)| *lvl == profile.level) {
            profile.title = (*title).to_string();
            tracing::debug!(level = profile.level, title, "title granted");
        }

        if profile.level == AWAKENING_LEVEL && profile.job == DEFAULT_JOB {
            profile.job = AWAKENED_JOB.to_string();
            tracing::debug!(job = AWAKENED_JOB, "job assigned");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
