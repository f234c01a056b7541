//! # Artifacts
//!
//! The seed catalog and the rules that award artifacts after a completion.
//!
//! Awards are idempotent: an artifact that is already owned is never awarded again,
//! so evaluating the rules repeatedly against the same state yields nothing new.

use crate::stats::StatsSnapshot;
use crate::{
    Artifact, ArtifactEntry, ArtifactId, BoostMagnitude, OwnedArtifact, Profile, Rarity,
    StatCategory,
};
use std::collections::BTreeSet;

/// What must hold for an artifact to be awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardCriterion {
    /// At least this many completions in total.
    TotalCompletions(u64),
    /// At least `count` completions of habits in `category`.
    CategoryCompletions { category: StatCategory, count: u64 },
    /// Profile level is at least this.
    ReachLevel(u32),
}

impl AwardCriterion {
    #[must_use]
    pub fn is_met(&self, profile: &Profile, stats: &StatsSnapshot) -> bool {
        match self {
            AwardCriterion::TotalCompletions(n) => stats.total_completions >= *n,
            AwardCriterion::CategoryCompletions { category, count } => {
                stats.category_completions(*category) >= *count
            }
            AwardCriterion::ReachLevel(level) => profile.level >= *level,
        }
    }
}

/// A catalog entry together with how it is earned.
#[derive(Debug, Clone, Copy)]
pub struct AwardRule {
    pub name: &'static str,
    pub description: &'static str,
    pub rarity: Rarity,
    pub boost_category: Option<StatCategory>,
    pub boost_thousandths: i64,
    pub criterion: AwardCriterion,
}

impl AwardRule {
    /// Catalog row to insert when seeding.
    #[must_use]
    pub fn entry(&self) -> ArtifactEntry {
        ArtifactEntry {
            name: self.name.to_string(),
            description: self.description.to_string(),
            rarity: self.rarity,
            boost_category: self.boost_category,
            boost_magnitude: BoostMagnitude::from_thousandths(self.boost_thousandths),
        }
    }
}

/// Every artifact in the game and its award rule.
pub const AWARD_RULES: &[AwardRule] = &[
    AwardRule {
        name: "Stone of Minor Vigor",
        description: "A rough, heavy stone that slightly enhances physical resilience.",
        rarity: Rarity::Common,
        boost_category: Some(StatCategory::Body),
        boost_thousandths: 1000,
        criterion: AwardCriterion::CategoryCompletions {
            category: StatCategory::Body,
            count: 5,
        },
    },
    AwardRule {
        name: "Adept's Training Band",
        description: "A worn leather band that seems to improve technique.",
        rarity: Rarity::Uncommon,
        boost_category: Some(StatCategory::Skill),
        boost_thousandths: 2000,
        criterion: AwardCriterion::CategoryCompletions {
            category: StatCategory::Skill,
            count: 10,
        },
    },
    AwardRule {
        name: "Circlet of Clarity",
        description: "A simple circlet that helps focus the mind.",
        rarity: Rarity::Rare,
        boost_category: Some(StatCategory::Mind),
        boost_thousandths: 5000,
        criterion: AwardCriterion::ReachLevel(10),
    },
    AwardRule {
        name: "Badge of the Initiate",
        description: "Proof of taking the first steps on the path.",
        rarity: Rarity::Common,
        boost_category: None,
        boost_thousandths: 0,
        criterion: AwardCriterion::TotalCompletions(1),
    },
];

/// Catalog rows to insert into an empty catalog.
#[must_use]
pub fn seed_catalog() -> Vec<ArtifactEntry> {
    AWARD_RULES.iter().map(AwardRule::entry).collect()
}

/// Catalog artifacts whose rule holds and that the profile does not own yet.
///
/// Rules are matched to catalog entries by name; a rule with no catalog entry is skipped.
#[must_use]
pub fn evaluate_awards(
    profile: &Profile,
    stats: &StatsSnapshot,
    catalog: &[Artifact],
    owned: &[OwnedArtifact],
) -> Vec<ArtifactId> {
    let owned_ids: BTreeSet<ArtifactId> = owned
        .iter()
        .filter(|o| o.profile_id == profile.id)
        .map(|o| o.artifact_id)
        .collect();

    AWARD_RULES
        .iter()
        .filter(|rule| rule.criterion.is_met(profile, stats))
        .filter_map(|rule| {
            let artifact = catalog.iter().find(|a| a.name == rule.name);
            if artifact.is_none() {
                tracing::warn!(artifact = rule.name, "award rule has no catalog entry");
            }
            artifact
        })
        .map(|a| a.id)
        .filter(|id| !owned_ids.contains(id))
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
