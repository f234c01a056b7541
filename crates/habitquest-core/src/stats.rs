//! # Stats Aggregator
//!
//! Streaks, completion counts and the five-attribute stat sheet, all derived from
//! habit and completion history. Nothing here is stored; every value is recomputed
//! from the inputs.
//!
//! ## Calendar Days
//!
//! Completions are timestamped in UTC and bucketed into local calendar days using a
//! fixed UTC offset supplied by the caller's clock.
//!
//! ## Stat Points
//!
//! 1. Per log, each attribute of the habit's category accrues `floor(xp * ratio)`.
//! 2. Equipped artifacts with a boost category add `round(sum * ratio)` per attribute,
//!    where `sum` is the total magnitude for that category.
//! 3. Totals are clamped at 0.

use crate::primitives::{MAGNITUDE_SCALE, RATIO_SCALE};
use crate::{
    Artifact, ArtifactId, Attribute, CompletionLog, Habit, HabitId, OwnedArtifact, StatCategory,
};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Point-in-time aggregate used to evaluate gate conditions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub overall_streak: u32,
    /// Streak per scored category. Missing categories read as 0.
    pub category_streaks: BTreeMap<StatCategory, u32>,
    /// Completion count per category. Missing categories read as 0.
    pub category_completions: BTreeMap<StatCategory, u64>,
    pub total_completions: u64,
}

impl StatsSnapshot {
    #[must_use]
    pub fn category_completions(&self, category: StatCategory) -> u64 {
        self.category_completions
            .get(&category)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn category_streak(&self, category: StatCategory) -> u32 {
        self.category_streaks.get(&category).copied().unwrap_or(0)
    }

    /// Longest current streak over the scored categories.
    #[must_use]
    pub fn best_category_streak(&self) -> u32 {
        StatCategory::SCORED
            .iter()
            .map(|c| self.category_streak(*c))
            .max()
            .unwrap_or(0)
    }
}

// =============================================================================
// STAT SHEET
// =============================================================================

/// Points per attribute. Every attribute is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSheet {
    points: BTreeMap<Attribute, u64>,
}

impl StatSheet {
    fn from_signed(raw: &BTreeMap<Attribute, i64>) -> Self {
        let points = Attribute::ALL
            .into_iter()
            .map(|attr| {
                let value = raw.get(&attr).copied().unwrap_or(0).max(0);
                (attr, value.unsigned_abs())
            })
            .collect();
        Self { points }
    }

    /// Points for one attribute.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> u64 {
        self.points.get(&attribute).copied().unwrap_or(0)
    }

    /// Iterate in sheet order (STR, AGI, VIT, INT, PER).
    pub fn iter(&self) -> impl Iterator<Item = (Attribute, u64)> + '_ {
        self.points.iter().map(|(a, p)| (*a, *p))
    }

    /// Sum over all attributes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.points.values().fold(0u64, |acc, p| acc.saturating_add(*p))
    }
}

impl Default for StatSheet {
    fn default() -> Self {
        Self::from_signed(&BTreeMap::new())
    }
}

// =============================================================================
// AGGREGATOR
// =============================================================================

/// Derives streaks and stat points from history.
#[derive(Debug, Clone, Copy)]
pub struct StatsAggregator {
    offset: FixedOffset,
}

impl StatsAggregator {
    /// Aggregate with calendar days in the given UTC offset.
    #[must_use]
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Aggregate with UTC calendar days.
    #[must_use]
    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Local calendar day of a UTC timestamp.
    #[must_use]
    pub fn local_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    /// Consecutive days with at least one completion, ending today or yesterday.
    #[must_use]
    pub fn overall_streak(&self, logs: &[CompletionLog], today: NaiveDate) -> u32 {
        let days: BTreeSet<NaiveDate> = logs
            .iter()
            .map(|l| self.local_day(l.completed_at))
            .collect();
        streak_from(&days, today)
    }

    /// Streak restricted to completions of habits in `category`.
    #[must_use]
    pub fn category_streak(
        &self,
        category: StatCategory,
        habits: &[Habit],
        logs: &[CompletionLog],
        today: NaiveDate,
    ) -> u32 {
        let days = self.category_days(habits, logs).remove(&category).unwrap_or_default();
        streak_from(&days, today)
    }

    /// Best current streak over the scored categories.
    #[must_use]
    pub fn any_category_streak(
        &self,
        habits: &[Habit],
        logs: &[CompletionLog],
        today: NaiveDate,
    ) -> u32 {
        let days = self.category_days(habits, logs);
        StatCategory::SCORED
            .iter()
            .filter_map(|c| days.get(c))
            .map(|d| streak_from(d, today))
            .max()
            .unwrap_or(0)
    }

    /// Number of completions of habits in `category`.
    ///
    /// Logs whose habit no longer exists are not attributed to any category.
    #[must_use]
    pub fn category_completions(
        &self,
        category: StatCategory,
        habits: &[Habit],
        logs: &[CompletionLog],
    ) -> u64 {
        let categories = category_index(habits);
        let count = logs
            .iter()
            .filter(|l| categories.get(&l.habit_id) == Some(&category))
            .count();
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    /// Number of completions in total, orphaned logs included.
    #[must_use]
    pub fn total_completions(&self, logs: &[CompletionLog]) -> u64 {
        u64::try_from(logs.len()).unwrap_or(u64::MAX)
    }

    /// Bundle every aggregate a gate condition can ask about.
    #[must_use]
    pub fn snapshot(
        &self,
        habits: &[Habit],
        logs: &[CompletionLog],
        today: NaiveDate,
    ) -> StatsSnapshot {
        let categories = category_index(habits);
        let mut category_completions = BTreeMap::new();
        for log in logs {
            if let Some(category) = categories.get(&log.habit_id) {
                let count: &mut u64 = category_completions.entry(*category).or_default();
                *count = count.saturating_add(1);
            }
        }

        let days = self.category_days(habits, logs);
        let category_streaks = StatCategory::SCORED
            .into_iter()
            .map(|c| (c, days.get(&c).map_or(0, |d| streak_from(d, today))))
            .collect();

        StatsSnapshot {
            overall_streak: self.overall_streak(logs, today),
            category_streaks,
            category_completions,
            total_completions: self.total_completions(logs),
        }
    }

    /// Stat sheet from completion history plus equipped artifact boosts.
    #[must_use]
    pub fn stat_points(
        &self,
        habits: &[Habit],
        logs: &[CompletionLog],
        owned: &[OwnedArtifact],
        catalog: &[Artifact],
    ) -> StatSheet {
        let mut raw: BTreeMap<Attribute, i64> = BTreeMap::new();

        // Step 1: per-log truncation.
        let by_id: BTreeMap<HabitId, &Habit> = habits.iter().map(|h| (h.id, h)).collect();
        for log in logs {
            let Some(habit) = by_id.get(&log.habit_id) else {
                continue;
            };
            let xp = i64::try_from(habit.xp_value).unwrap_or(i64::MAX);
            for (attr, tenths) in habit.category.distribution() {
                let points = xp.saturating_mul(*tenths) / RATIO_SCALE;
                let slot = raw.entry(*attr).or_default();
                *slot = slot.saturating_add(points);
            }
        }

        // Step 2: per-category magnitude sums, rounded once per attribute.
        let artifacts: BTreeMap<ArtifactId, &Artifact> =
            catalog.iter().map(|a| (a.id, a)).collect();
        let mut boosts: BTreeMap<StatCategory, i64> = BTreeMap::new();
        for entry in owned.iter().filter(|o| o.equipped) {
            let Some(artifact) = artifacts.get(&entry.artifact_id) else {
                tracing::warn!(
                    artifact = %entry.artifact_id,
                    "owned artifact missing from catalog"
                );
                continue;
            };
            let Some(category) = artifact.boost_category else {
                continue;
            };
            if artifact.boost_magnitude.is_zero() {
                continue;
            }
            let sum = boosts.entry(category).or_default();
            *sum = sum.saturating_add(artifact.boost_magnitude.thousandths());
        }
        for (category, thousandths) in &boosts {
            for (attr, tenths) in category.distribution() {
                let points = round_half_away(
                    i128::from(*thousandths) * i128::from(*tenths),
                    i128::from(RATIO_SCALE) * i128::from(MAGNITUDE_SCALE),
                );
                let slot = raw.entry(*attr).or_default();
                *slot = slot.saturating_add(points);
            }
        }

        StatSheet::from_signed(&raw)
    }

    fn category_days(
        &self,
        habits: &[Habit],
        logs: &[CompletionLog],
    ) -> BTreeMap<StatCategory, BTreeSet<NaiveDate>> {
        let categories = category_index(habits);
        let mut days: BTreeMap<StatCategory, BTreeSet<NaiveDate>> = BTreeMap::new();
        for log in logs {
            if let Some(category) = categories.get(&log.habit_id) {
                days.entry(*category)
                    .or_default()
                    .insert(self.local_day(log.completed_at));
            }
        }
        days
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::utc()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn category_index(habits: &[Habit]) -> BTreeMap<HabitId, StatCategory> {
    habits.iter().map(|h| (h.id, h.category)).collect()
}

/// Count back from today, or from yesterday when today has no completion.
fn streak_from(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let start = if days.contains(&today) {
        Some(today)
    } else {
        today.pred_opt().filter(|y| days.contains(y))
    };

    let mut streak = 0u32;
    let mut cursor = start;
    while let Some(day) = cursor {
        if !days.contains(&day) {
            break;
        }
        streak = streak.saturating_add(1);
        cursor = day.pred_opt();
    }
    streak
}

/// `numerator / denominator` rounded half away from zero. `denominator` must be positive.
fn round_half_away(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    };
    i64::try_from(rounded).unwrap_or(if rounded > 0 { i64::MAX } else { i64::MIN })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoostMagnitude, CompletionId, Frequency, NewHabit, ProfileId, Rarity};
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().expect("ts")
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn habit(id: u64, category: StatCategory, xp: u64) -> Habit {
        Habit::from_new(
            HabitId(id),
            NewHabit {
                name: format!("habit {id}"),
                category,
                xp_value: xp,
                frequency: Frequency::Daily,
            },
            at(2025, 1, 1, 0),
        )
        .expect("habit")
    }

    fn log(id: u64, habit: u64, when: DateTime<Utc>) -> CompletionLog {
        CompletionLog {
            id: CompletionId(id),
            habit_id: HabitId(habit),
            completed_at: when,
        }
    }

    fn artifact(id: u64, category: Option<StatCategory>, thousandths: i64) -> Artifact {
        Artifact {
            id: ArtifactId(id),
            name: format!("artifact {id}"),
            description: String::new(),
            rarity: Rarity::Common,
            boost_category: category,
            boost_magnitude: BoostMagnitude::from_thousandths(thousandths),
        }
    }

    fn owned(id: u64, equipped: bool) -> OwnedArtifact {
        OwnedArtifact {
            profile_id: ProfileId::DEVICE,
            artifact_id: ArtifactId(id),
            equipped,
            acquired_at: at(2025, 1, 1, 0),
        }
    }

    #[test]
    fn streak_counts_consecutive_days_through_today() {
        let stats = StatsAggregator::utc();
        let logs = vec![
            log(1, 1, at(2025, 4, 10, 9)),
            log(2, 1, at(2025, 4, 9, 9)),
            log(3, 1, at(2025, 4, 9, 20)),
            log(4, 1, at(2025, 4, 8, 9)),
            log(5, 1, at(2025, 4, 6, 9)),
        ];
        assert_eq!(stats.overall_streak(&logs, day(2025, 4, 10)), 3);
    }

    #[test]
    fn streak_survives_until_end_of_today() {
        let stats = StatsAggregator::utc();
        let logs = vec![log(1, 1, at(2025, 4, 9, 9)), log(2, 1, at(2025, 4, 8, 9))];
        assert_eq!(stats.overall_streak(&logs, day(2025, 4, 10)), 2);
        assert_eq!(stats.overall_streak(&logs, day(2025, 4, 11)), 0);
    }

    #[test]
    fn empty_history_has_no_streak() {
        let stats = StatsAggregator::utc();
        assert_eq!(stats.overall_streak(&[], day(2025, 4, 10)), 0);
    }

    #[test]
    fn days_follow_local_offset() {
        // 23:00 UTC on the 9th is already the 10th at UTC+2.
        let east = StatsAggregator::new(FixedOffset::east_opt(2 * 3600).expect("offset"));
        let logs = vec![log(1, 1, at(2025, 4, 9, 23))];
        assert_eq!(east.local_day(logs[0].completed_at), day(2025, 4, 10));
        assert_eq!(east.overall_streak(&logs, day(2025, 4, 10)), 1);
        assert_eq!(StatsAggregator::utc().overall_streak(&logs, day(2025, 4, 11)), 0);
    }

    #[test]
    fn category_streak_ignores_other_categories() {
        let stats = StatsAggregator::utc();
        let habits = vec![habit(1, StatCategory::Body, 10), habit(2, StatCategory::Mind, 10)];
        let logs = vec![
            log(1, 1, at(2025, 4, 10, 9)),
            log(2, 2, at(2025, 4, 9, 9)),
            log(3, 1, at(2025, 4, 8, 9)),
        ];
        let today = day(2025, 4, 10);
        assert_eq!(stats.category_streak(StatCategory::Body, &habits, &logs, today), 1);
        assert_eq!(stats.category_streak(StatCategory::Mind, &habits, &logs, today), 1);
        assert_eq!(stats.overall_streak(&logs, today), 3);
        assert_eq!(stats.any_category_streak(&habits, &logs, today), 1);
    }

    #[test]
    fn snapshot_counts_completions() {
        let stats = StatsAggregator::utc();
        let habits = vec![habit(1, StatCategory::Body, 10), habit(2, StatCategory::Other, 5)];
        let logs = vec![
            log(1, 1, at(2025, 4, 10, 9)),
            log(2, 1, at(2025, 4, 9, 9)),
            log(3, 2, at(2025, 4, 9, 9)),
            // Habit 9 was deleted.
            log(4, 9, at(2025, 4, 9, 9)),
        ];
        let snapshot = stats.snapshot(&habits, &logs, day(2025, 4, 10));

        assert_eq!(snapshot.total_completions, 4);
        assert_eq!(snapshot.category_completions(StatCategory::Body), 2);
        assert_eq!(snapshot.category_completions(StatCategory::Other), 1);
        assert_eq!(snapshot.category_completions(StatCategory::Mind), 0);
        assert_eq!(snapshot.category_streak(StatCategory::Body), 2);
        assert_eq!(snapshot.best_category_streak(), 2);
        assert_eq!(snapshot.overall_streak, 2);
    }

    #[test]
    fn body_completion_splits_into_str_and_agi() {
        let stats = StatsAggregator::utc();
        let habits = vec![habit(1, StatCategory::Body, 10)];
        let logs = vec![log(1, 1, at(2025, 4, 10, 9))];

        let sheet = stats.stat_points(&habits, &logs, &[], &[]);
        assert_eq!(sheet.get(Attribute::Str), 6);
        assert_eq!(sheet.get(Attribute::Agi), 4);
        assert_eq!(sheet.get(Attribute::Vit), 0);
        assert_eq!(sheet.get(Attribute::Int), 0);
        assert_eq!(sheet.get(Attribute::Per), 0);
    }

    #[test]
    fn habit_points_truncate_per_log() {
        let stats = StatsAggregator::utc();
        // 0.7 * 5 = 3.5 and 0.3 * 5 = 1.5, truncated per log.
        let habits = vec![habit(1, StatCategory::Mind, 5)];
        let logs = vec![log(1, 1, at(2025, 4, 9, 9)), log(2, 1, at(2025, 4, 10, 9))];

        let sheet = stats.stat_points(&habits, &logs, &[], &[]);
        assert_eq!(sheet.get(Attribute::Int), 6);
        assert_eq!(sheet.get(Attribute::Per), 2);
    }

    #[test]
    fn other_category_contributes_nothing() {
        let stats = StatsAggregator::utc();
        let habits = vec![habit(1, StatCategory::Other, 50)];
        let logs = vec![log(1, 1, at(2025, 4, 10, 9))];
        assert_eq!(stats.stat_points(&habits, &logs, &[], &[]).total(), 0);
    }

    #[test]
    fn equipped_boosts_round_per_category_sum() {
        let stats = StatsAggregator::utc();
        let catalog = vec![
            artifact(1, Some(StatCategory::Mind), 5000),
            artifact(2, Some(StatCategory::Body), 1000),
            artifact(3, Some(StatCategory::Body), 1500),
            artifact(4, None, 0),
        ];
        let owned = vec![owned(1, false), owned(2, true), owned(3, true), owned(4, true)];

        let sheet = stats.stat_points(&[], &[], &owned, &catalog);
        // Body sum 2.5: STR 1.5 -> 2, AGI 1.0 -> 1.
        assert_eq!(sheet.get(Attribute::Str), 2);
        assert_eq!(sheet.get(Attribute::Agi), 1);
        // Mind artifact is not equipped.
        assert_eq!(sheet.get(Attribute::Int), 0);
    }

    #[test]
    fn negative_boosts_clamp_at_zero() {
        let stats = StatsAggregator::utc();
        let habits = vec![habit(1, StatCategory::Body, 10)];
        let logs = vec![log(1, 1, at(2025, 4, 10, 9))];
        let catalog = vec![artifact(1, Some(StatCategory::Body), -20_000)];

        let sheet = stats.stat_points(&habits, &logs, &[owned(1, true)], &catalog);
        assert_eq!(sheet.get(Attribute::Str), 0);
        assert_eq!(sheet.get(Attribute::Agi), 0);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_half_away(15, 10), 2);
        assert_eq!(round_half_away(14, 10), 1);
        assert_eq!(round_half_away(-15, 10), -2);
        assert_eq!(round_half_away(-14, 10), -1);
    }
}
