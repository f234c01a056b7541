//! # Condition / Reward Language
//!
//! Gates carry a structured clear condition and reward from the moment they are
//! analyzed. Text is a presentation concern only (`Display`); legacy text is decoded
//! once at the store boundary by [`crate::formats::legacy`].

use crate::primitives::MIN_CLEAR_PAYOUT;
use crate::stats::StatsSnapshot;
use crate::{Profile, StatCategory};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A predicate over the profile and a stats snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Profile level is at least `n`.
    ReachLevel(u32),
    /// Overall streak is at least `n` days.
    OverallStreak(u32),
    /// At least `count` completions of habits in `category`.
    CategoryCompletions { category: StatCategory, count: u64 },
    /// Some scored category has a streak of at least `n` days.
    AnyCategoryStreak(u32),
    /// At least `n` completions in total.
    TotalCompletionsAcrossCategories(u64),
    /// Lifetime mana spent is at least `n`.
    ManaSpent(u64),
    /// Decoded from legacy text that matched no known phrasing. Never met.
    Unrecognized,
}

impl Condition {
    /// Evaluate the condition. Pure; no side effects.
    #[must_use]
    pub fn is_met(&self, profile: &Profile, stats: &StatsSnapshot) -> bool {
        match self {
            Condition::ReachLevel(n) => profile.level >= *n,
            Condition::OverallStreak(n) => stats.overall_streak >= *n,
            Condition::CategoryCompletions { category, count } => {
                stats.category_completions(*category) >= *count
            }
            Condition::AnyCategoryStreak(n) => stats.best_category_streak() >= *n,
            Condition::TotalCompletionsAcrossCategories(n) => stats.total_completions >= *n,
            Condition::ManaSpent(n) => profile.total_mana_spent >= *n,
            Condition::Unrecognized => false,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::ReachLevel(n) => write!(f, "Reach Level {n}"),
            Condition::OverallStreak(n) => write!(f, "Maintain an overall streak of {n} days"),
            Condition::CategoryCompletions { category, count } => {
                write!(f, "Complete {count} {category} habits")
            }
            Condition::AnyCategoryStreak(n) => {
                write!(f, "Maintain a {n}-day streak in any category")
            }
            Condition::TotalCompletionsAcrossCategories(n) => {
                write!(f, "Complete {n} habits across all categories")
            }
            Condition::ManaSpent(n) => write!(f, "Spend {n} Mana Crystals"),
            Condition::Unrecognized => f.write_str("Unreadable condition"),
        }
    }
}

/// What clearing a gate pays out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reward {
    pub xp: u64,
    pub mana_crystals: u64,
    pub title: Option<String>,
}

impl Reward {
    /// Mana actually paid on clear: never below [`MIN_CLEAR_PAYOUT`].
    #[must_use]
    pub fn payout_mana(&self) -> u64 {
        self.mana_crystals.max(MIN_CLEAR_PAYOUT)
    }
}

impl fmt::Display for Reward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} XP, {} Mana Crystals", self.xp, self.mana_crystals)?;
        if let Some(title) = &self.title {
            write!(f, ", Title: {title}")?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_at(level: u32) -> Profile {
        Profile {
            level,
            ..Profile::default()
        }
    }

    #[test]
    fn reach_level_boundary() {
        let condition = Condition::ReachLevel(10);
        let stats = StatsSnapshot::default();
        assert!(condition.is_met(&profile_at(10), &stats));
        assert!(!condition.is_met(&profile_at(9), &stats));
    }

    #[test]
    fn category_completions_read_snapshot() {
        let mut stats = StatsSnapshot::default();
        stats.category_completions.insert(StatCategory::Body, 5);

        let met = Condition::CategoryCompletions {
            category: StatCategory::Body,
            count: 5,
        };
        let unmet = Condition::CategoryCompletions {
            category: StatCategory::Mind,
            count: 1,
        };
        assert!(met.is_met(&profile_at(1), &stats));
        assert!(!unmet.is_met(&profile_at(1), &stats));
    }

    #[test]
    fn any_category_streak_uses_best() {
        let mut stats = StatsSnapshot::default();
        stats.category_streaks.insert(StatCategory::Skill, 2);
        stats.category_streaks.insert(StatCategory::Wellbeing, 6);

        assert!(Condition::AnyCategoryStreak(6).is_met(&profile_at(1), &stats));
        assert!(!Condition::AnyCategoryStreak(7).is_met(&profile_at(1), &stats));
    }

    #[test]
    fn mana_spent_reads_lifetime_total() {
        let mut profile = profile_at(1);
        profile.total_mana_spent = 40;
        let stats = StatsSnapshot::default();
        assert!(Condition::ManaSpent(40).is_met(&profile, &stats));
        assert!(!Condition::ManaSpent(50).is_met(&profile, &stats));
    }

    #[test]
    fn unrecognized_never_met() {
        let mut profile = profile_at(500);
        profile.total_mana_spent = u64::MAX;
        let stats = StatsSnapshot {
            overall_streak: u32::MAX,
            total_completions: u64::MAX,
            ..StatsSnapshot::default()
        };
        assert!(!Condition::Unrecognized.is_met(&profile, &stats));
    }

    #[test]
    fn payout_has_floor() {
        let small = Reward {
            xp: 0,
            mana_crystals: 20,
            title: None,
        };
        let large = Reward {
            xp: 0,
            mana_crystals: 120,
            title: None,
        };
        assert_eq!(small.payout_mana(), MIN_CLEAR_PAYOUT);
        assert_eq!(large.payout_mana(), 120);
        assert_eq!(Reward::default().payout_mana(), MIN_CLEAR_PAYOUT);
    }

    #[test]
    fn reward_display_lists_title_last() {
        let reward = Reward {
            xp: 120,
            mana_crystals: 40,
            title: Some("Gate Breaker".to_string()),
        };
        assert_eq!(
            reward.to_string(),
            "120 XP, 40 Mana Crystals, Title: Gate Breaker"
        );
    }
}
