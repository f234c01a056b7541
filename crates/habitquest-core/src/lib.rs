//! # habitquest-core
//!
//! The progression engine for HabitQuest - THE RULES.
//!
//! This crate turns habit completions into experience, character level, a randomized
//! gate (quest) economy and a derived five-attribute stat sheet.
//!
//! ## Components
//!
//! - `leveling`: leveling curve and multi-level-up resolution
//! - `gate`: gate lifecycle, condition/reward language, spawn economy
//! - `stats`: streaks, completion counts and the stat sheet
//! - `artifacts`: seed catalog and award rules
//! - `templates`: predefined habits
//! - `progression`: the facade sequencing the engines over a store
//!
//! ## Architectural Constraints
//!
//! - Integer arithmetic only; ratios and magnitudes are fixed-point
//! - Randomness and time are injected (`rand::Rng`, `Clock`)
//! - Every facade mutation is one store transaction
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod artifacts;
pub mod clock;
pub mod events;
pub mod formats;
pub mod gate;
pub mod leveling;
pub mod primitives;
pub mod progression;
pub mod stats;
pub mod storage;
pub mod templates;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Artifact, ArtifactEntry, ArtifactId, Attribute, BoostMagnitude, CompletionId, CompletionLog,
    EssenceState, Frequency, Gate, GateId, GateKind, GateRank, GateSpawn, GateStatus, Habit,
    HabitId, NewHabit, OwnedArtifact, Profile, ProfileId, ProgressionError, Rarity, StatCategory,
};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use artifacts::{AWARD_RULES, AwardCriterion, AwardRule, evaluate_awards, seed_catalog};
pub use gate::{ClearOutcome, Condition, GateEngine, RefreshOutcome, Reward, UnlockReport};
pub use leveling::{LevelProgress, LevelingEngine};
pub use stats::{StatSheet, StatsAggregator, StatsSnapshot};
pub use templates::{HABIT_TEMPLATES, HabitTemplate, find_template};

// =============================================================================
// RE-EXPORTS: Facade, Storage and Collaborators
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use events::{EventBus, GateChange, ProgressionEvent};
pub use formats::{LegacyGateRecord, LegacyParser, MAX_LEGACY_IMPORT_SIZE};
pub use progression::{CompletionOutcome, ImportReport, Progression};
pub use storage::{MemoryStore, ProgressionState, ProgressionStore, RedbStore};
