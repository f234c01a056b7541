//! # Core Type Definitions
//!
//! This module contains the data model shared by every engine:
//! - Identifiers (`ProfileId`, `HabitId`, `CompletionId`, `GateId`, `ArtifactId`)
//! - Classification tags (`StatCategory`, `Attribute`, `Frequency`, `GateRank`, ...)
//! - Entities (`Profile`, `Habit`, `CompletionLog`, `Gate`, `Artifact`, `OwnedArtifact`)
//! - Error types (`ProgressionError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they key a `BTreeMap`/`BTreeSet`
//! - Use saturating arithmetic for counters to prevent overflow

use crate::gate::{Condition, Reward};
use crate::primitives::{DEFAULT_JOB, DEFAULT_TITLE, MAGNITUDE_SCALE};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of the (single) device profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub u64);

impl ProfileId {
    /// The one profile that exists on a device.
    pub const DEVICE: ProfileId = ProfileId(1);
}

/// Identifier of a habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HabitId(pub u64);

/// Identifier of an appended completion log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompletionId(pub u64);

/// Identifier of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GateId(pub u64);

/// Identifier of a catalog artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub u64);

macro_rules! display_id {
    ($($ty:ident),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

display_id!(ProfileId, HabitId, CompletionId, GateId, ArtifactId);

// =============================================================================
// STAT CATEGORY
// =============================================================================

/// Classification tag of a habit.
///
/// Five real categories feed attributes; `Other` is tracked but distributes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatCategory {
    Mind,
    Body,
    Skill,
    Discipline,
    Wellbeing,
    Other,
}

impl StatCategory {
    /// Every category, `Other` included.
    pub const ALL: [StatCategory; 6] = [
        StatCategory::Mind,
        StatCategory::Body,
        StatCategory::Skill,
        StatCategory::Discipline,
        StatCategory::Wellbeing,
        StatCategory::Other,
    ];

    /// The five categories that distribute into attributes.
    pub const SCORED: [StatCategory; 5] = [
        StatCategory::Mind,
        StatCategory::Body,
        StatCategory::Skill,
        StatCategory::Discipline,
        StatCategory::Wellbeing,
    ];

    /// Get the category name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StatCategory::Mind => "Mind",
            StatCategory::Body => "Body",
            StatCategory::Skill => "Skill",
            StatCategory::Discipline => "Discipline",
            StatCategory::Wellbeing => "Wellbeing",
            StatCategory::Other => "Other",
        }
    }

    /// Attribute split of this category as `(attribute, ratio in tenths)` pairs.
    ///
    /// Both halves apply to the full amount; they are not a partition of it.
    #[must_use]
    pub fn distribution(&self) -> &'static [(Attribute, i64)] {
        match self {
            StatCategory::Mind => &[(Attribute::Int, 7), (Attribute::Per, 3)],
            StatCategory::Body => &[(Attribute::Str, 6), (Attribute::Agi, 4)],
            StatCategory::Skill => &[(Attribute::Agi, 8), (Attribute::Int, 2)],
            StatCategory::Discipline => &[(Attribute::Vit, 7), (Attribute::Str, 3)],
            StatCategory::Wellbeing => &[(Attribute::Per, 6), (Attribute::Vit, 4)],
            StatCategory::Other => &[],
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatCategory {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatCategory::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ProgressionError::InvalidInput(format!("unknown stat category '{s}'")))
    }
}

// =============================================================================
// ATTRIBUTE
// =============================================================================

/// One of the five derived character attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Str,
    Agi,
    Vit,
    Int,
    Per,
}

impl Attribute {
    /// Every attribute in sheet order.
    pub const ALL: [Attribute; 5] = [
        Attribute::Str,
        Attribute::Agi,
        Attribute::Vit,
        Attribute::Int,
        Attribute::Per,
    ];

    /// Short code shown on the stat sheet.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Attribute::Str => "STR",
            Attribute::Agi => "AGI",
            Attribute::Vit => "VIT",
            Attribute::Int => "INT",
            Attribute::Per => "PER",
        }
    }

    /// Full attribute name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Attribute::Str => "Strength",
            Attribute::Agi => "Agility",
            Attribute::Vit => "Vitality",
            Attribute::Int => "Intelligence",
            Attribute::Per => "Perception",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// Derived cosmetic indicator of level-progress intensity. Not authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EssenceState {
    Off,
    Dim,
    Bright,
}

impl fmt::Display for EssenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EssenceState::Off => "Off",
            EssenceState::Dim => "Dim",
            EssenceState::Bright => "Bright",
        };
        f.write_str(name)
    }
}

/// The device profile.
///
/// `xp` is always below `threshold(level)` once a level-up has settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub level: u32,
    pub xp: u64,
    pub mana_crystals: u64,
    /// Monotonically non-decreasing total of every mana debit.
    pub total_mana_spent: u64,
    pub title: String,
    pub job: String,
    pub essence_state: EssenceState,
}

impl Profile {
    /// Create the first-run profile.
    #[must_use]
    pub fn new(id: ProfileId) -> Self {
        Self {
            id,
            level: 1,
            xp: 0,
            mana_crystals: 0,
            total_mana_spent: 0,
            title: DEFAULT_TITLE.to_string(),
            job: DEFAULT_JOB.to_string(),
            essence_state: EssenceState::Off,
        }
    }

    /// Debit mana after a sufficiency check.
    ///
    /// The debit is also credited to `total_mana_spent`.
    pub fn spend_mana(&mut self, cost: u64) -> Result<(), ProgressionError> {
        if self.mana_crystals < cost {
            return Err(ProgressionError::InsufficientResources {
                required: cost,
                available: self.mana_crystals,
            });
        }
        self.mana_crystals -= cost;
        self.total_mana_spent = self.total_mana_spent.saturating_add(cost);
        Ok(())
    }

    /// Credit mana crystals.
    pub fn grant_mana(&mut self, amount: u64) {
        self.mana_crystals = self.mana_crystals.saturating_add(amount);
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(ProfileId::DEVICE)
    }
}

// =============================================================================
// HABIT
// =============================================================================

/// How often a habit is expected to be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
}

impl FromStr for Frequency {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            other => Err(ProgressionError::InvalidInput(format!(
                "unknown frequency '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => f.write_str("Daily"),
            Frequency::Weekly => f.write_str("Weekly"),
        }
    }
}

/// Fields supplied by the caller when creating a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHabit {
    pub name: String,
    pub category: StatCategory,
    pub xp_value: u64,
    pub frequency: Frequency,
}

/// A tracked habit. Mutated on each completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    pub category: StatCategory,
    /// Experience granted per completion. Always > 0.
    pub xp_value: u64,
    pub frequency: Frequency,
    pub streak: u32,
    /// Local calendar day of the most recent completion.
    pub last_completed: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Build a habit from caller input, rejecting a zero xp value.
    pub fn from_new(
        id: HabitId,
        new: NewHabit,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProgressionError> {
        if new.xp_value == 0 {
            return Err(ProgressionError::InvalidInput(
                "habit xp value must be greater than zero".to_string(),
            ));
        }
        if new.name.trim().is_empty() {
            return Err(ProgressionError::InvalidInput(
                "habit name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            name: new.name.trim().to_string(),
            category: new.category,
            xp_value: new.xp_value,
            frequency: new.frequency,
            streak: 0,
            last_completed: None,
            created_at,
        })
    }

    /// Update the per-habit streak for a completion on `today`.
    ///
    /// Yesterday continues the streak, anything older restarts it at 1,
    /// and a second completion on the same day is rejected.
    pub fn record_completion(&mut self, today: NaiveDate) -> Result<u32, ProgressionError> {
        let streak = match self.last_completed {
            Some(last) if last == today => {
                return Err(ProgressionError::AlreadyCompleted(self.id));
            }
            Some(last) if today.pred_opt() == Some(last) => self.streak.saturating_add(1),
            _ => 1,
        };
        self.streak = streak;
        self.last_completed = Some(today);
        Ok(streak)
    }

    /// Check whether the habit is due on `today`.
    ///
    /// Daily habits are due unless completed today; weekly habits are due
    /// unless completed in the current ISO week.
    #[must_use]
    pub fn is_due(&self, today: NaiveDate) -> bool {
        let Some(last) = self.last_completed else {
            return true;
        };
        match self.frequency {
            Frequency::Daily => last != today,
            Frequency::Weekly => last.iso_week() != today.iso_week(),
        }
    }
}

/// Append-only record of one completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionLog {
    pub id: CompletionId,
    pub habit_id: HabitId,
    pub completed_at: DateTime<Utc>,
}

// =============================================================================
// GATES
// =============================================================================

/// Ordinal quality tier of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GateRank {
    E,
    D,
    C,
    B,
    A,
    S,
}

impl GateRank {
    /// Every rank, lowest first.
    pub const ALL: [GateRank; 6] = [
        GateRank::E,
        GateRank::D,
        GateRank::C,
        GateRank::B,
        GateRank::A,
        GateRank::S,
    ];

    /// Level at which this rank becomes available for spawning.
    #[must_use]
    pub fn unlock_level(&self) -> u32 {
        match self {
            GateRank::E => 1,
            GateRank::D => 10,
            GateRank::C => 25,
            GateRank::B => 45,
            GateRank::A => 70,
            GateRank::S => 100,
        }
    }

    /// Highest rank whose unlock level is at or below `level`.
    #[must_use]
    pub fn for_level(level: u32) -> GateRank {
        GateRank::ALL
            .into_iter()
            .rev()
            .find(|rank| level >= rank.unlock_level())
            .unwrap_or(GateRank::E)
    }

    /// Ranks available for spawning at `level`.
    #[must_use]
    pub fn unlocked_at(level: u32) -> Vec<GateRank> {
        GateRank::ALL
            .into_iter()
            .filter(|rank| level >= rank.unlock_level())
            .collect()
    }

    /// Multiplier applied to generated rewards.
    #[must_use]
    pub fn reward_factor(&self) -> u64 {
        match self {
            GateRank::E => 1,
            GateRank::D => 2,
            GateRank::C => 3,
            GateRank::B => 4,
            GateRank::A => 6,
            GateRank::S => 10,
        }
    }
}

impl fmt::Display for GateRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for GateRank {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let letter = trimmed
            .strip_prefix("Rank ")
            .or_else(|| trimmed.strip_suffix("-Rank"))
            .unwrap_or(trimmed);
        GateRank::ALL
            .into_iter()
            .find(|rank| rank.to_string().eq_ignore_ascii_case(letter))
            .ok_or_else(|| ProgressionError::MalformedEncoding(format!("unknown gate rank '{s}'")))
    }
}

/// Cosmetic gate variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    Standard,
    Red,
}

impl GateKind {
    /// Both variants.
    pub const ALL: [GateKind; 2] = [GateKind::Standard, GateKind::Red];
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateKind::Standard => f.write_str("Standard"),
            GateKind::Red => f.write_str("Red"),
        }
    }
}

/// Lifecycle status of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateStatus {
    Locked,
    Analyzed,
    /// Terminal. Kept for history, no longer actionable.
    Cleared,
}

impl GateStatus {
    /// A gate counts against the active cap until it is cleared.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, GateStatus::Cleared)
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateStatus::Locked => f.write_str("Locked"),
            GateStatus::Analyzed => f.write_str("Analyzed"),
            GateStatus::Cleared => f.write_str("Cleared"),
        }
    }
}

/// Rank and kind chosen for a gate that the store has yet to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSpawn {
    pub rank: GateRank,
    pub kind: GateKind,
}

/// A procedurally generated quest.
///
/// `condition` and `reward` are present only once the gate is Analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub id: GateId,
    pub rank: GateRank,
    pub kind: GateKind,
    pub status: GateStatus,
    pub condition: Option<Condition>,
    pub reward: Option<Reward>,
    pub status_changed_at: DateTime<Utc>,
}

impl Gate {
    /// Create a fresh Locked gate.
    #[must_use]
    pub fn locked(id: GateId, spawn: GateSpawn, at: DateTime<Utc>) -> Self {
        Self {
            id,
            rank: spawn.rank,
            kind: spawn.kind,
            status: GateStatus::Locked,
            condition: None,
            reward: None,
            status_changed_at: at,
        }
    }
}

// =============================================================================
// ARTIFACTS
// =============================================================================

/// Catalog rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Real-valued artifact boost stored as fixed-point thousandths.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct BoostMagnitude(pub i64);

impl BoostMagnitude {
    /// Magnitude of exactly `whole` points.
    #[must_use]
    pub const fn from_whole(whole: i64) -> Self {
        Self(whole.saturating_mul(MAGNITUDE_SCALE))
    }

    /// Magnitude from raw thousandths.
    #[must_use]
    pub const fn from_thousandths(thousandths: i64) -> Self {
        Self(thousandths)
    }

    /// Get the raw thousandths.
    #[must_use]
    pub const fn thousandths(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for BoostMagnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = MAGNITUDE_SCALE.unsigned_abs();
        write!(f, "{}{}.{:03}", sign, abs / scale, abs % scale)
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub boost_category: Option<StatCategory>,
    pub boost_magnitude: BoostMagnitude,
}

/// Catalog fields before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub boost_category: Option<StatCategory>,
    pub boost_magnitude: BoostMagnitude,
}

/// An artifact the profile has earned. Never duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedArtifact {
    pub profile_id: ProfileId,
    pub artifact_id: ArtifactId,
    pub equipped: bool,
    pub acquired_at: DateTime<Utc>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the progression engine.
///
/// - No silent failures
/// - Use `Result<T, ProgressionError>` for fallible operations
/// - The engine never panics; all errors are recoverable and never retried
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
    /// Mana crystals are below a required cost.
    #[error("Insufficient resources: need {required} mana crystals, have {available}")]
    InsufficientResources { required: u64, available: u64 },

    /// The gate is not in the status the operation requires.
    #[error("Invalid state transition: cannot {operation} gate {gate} while {status}")]
    InvalidStateTransition {
        gate: GateId,
        status: GateStatus,
        operation: &'static str,
    },

    /// A clear was attempted before its condition holds.
    #[error("Condition not met: {0}")]
    ConditionNotMet(String),

    /// A required profile, habit, gate or artifact is absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Legacy text did not parse into a known variant.
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// The habit already has a completion on the current local day.
    #[error("Habit {0} already completed today")]
    AlreadyCompleted(HabitId),

    /// Caller-supplied values are out of range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The store failed to read or write.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// File system access outside the store failed (config, import files).
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn habit(frequency: Frequency) -> Habit {
        let created = Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).single().expect("ts");
        Habit::from_new(
            HabitId(1),
            NewHabit {
                name: "Read".to_string(),
                category: StatCategory::Mind,
                xp_value: 10,
                frequency,
            },
            created,
        )
        .expect("habit")
    }

    #[test]
    fn spend_mana_checks_balance_first() {
        let mut profile = Profile::default();
        profile.grant_mana(5);

        let result = profile.spend_mana(10);
        assert!(matches!(
            result,
            Err(ProgressionError::InsufficientResources {
                required: 10,
                available: 5
            })
        ));
        assert_eq!(profile.mana_crystals, 5);
        assert_eq!(profile.total_mana_spent, 0);

        profile.spend_mana(3).expect("spend");
        assert_eq!(profile.mana_crystals, 2);
        assert_eq!(profile.total_mana_spent, 3);
    }

    #[test]
    fn habit_streak_continues_from_yesterday() {
        let mut h = habit(Frequency::Daily);
        assert_eq!(h.record_completion(day(2025, 4, 1)).expect("first"), 1);
        assert_eq!(h.record_completion(day(2025, 4, 2)).expect("second"), 2);
        assert_eq!(h.record_completion(day(2025, 4, 5)).expect("gap"), 1);
    }

    #[test]
    fn habit_rejects_same_day_completion() {
        let mut h = habit(Frequency::Daily);
        h.record_completion(day(2025, 4, 1)).expect("first");
        let again = h.record_completion(day(2025, 4, 1));
        assert_eq!(again, Err(ProgressionError::AlreadyCompleted(HabitId(1))));
        assert_eq!(h.streak, 1);
    }

    #[test]
    fn weekly_habit_due_once_per_iso_week() {
        let mut h = habit(Frequency::Weekly);
        // 2025-04-07 is a Monday
        h.record_completion(day(2025, 4, 7)).expect("complete");
        assert!(!h.is_due(day(2025, 4, 9)));
        assert!(h.is_due(day(2025, 4, 14)));
    }

    #[test]
    fn zero_xp_habit_rejected() {
        let created = Utc.with_ymd_and_hms(2025, 4, 1, 8, 0, 0).single().expect("ts");
        let result = Habit::from_new(
            HabitId(1),
            NewHabit {
                name: "Nothing".to_string(),
                category: StatCategory::Other,
                xp_value: 0,
                frequency: Frequency::Daily,
            },
            created,
        );
        assert!(matches!(result, Err(ProgressionError::InvalidInput(_))));
    }

    #[test]
    fn rank_unlocks_follow_level() {
        assert_eq!(GateRank::unlocked_at(1), vec![GateRank::E]);
        assert_eq!(GateRank::unlocked_at(25), vec![GateRank::E, GateRank::D, GateRank::C]);
        assert_eq!(GateRank::unlocked_at(100).len(), 6);
        assert_eq!(GateRank::for_level(69), GateRank::B);
    }

    #[test]
    fn rank_parses_legacy_labels() {
        assert_eq!("Rank C".parse::<GateRank>().expect("rank"), GateRank::C);
        assert_eq!("s".parse::<GateRank>().expect("rank"), GateRank::S);
        assert!("Rank Z".parse::<GateRank>().is_err());
    }

    #[test]
    fn magnitude_display_is_fixed_point() {
        assert_eq!(BoostMagnitude::from_whole(5).to_string(), "5.000");
        assert_eq!(BoostMagnitude::from_thousandths(-1250).to_string(), "-1.250");
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!("body".parse::<StatCategory>().expect("cat"), StatCategory::Body);
        assert!("Cardio".parse::<StatCategory>().is_err());
    }
}
