//! # Legacy Gate Text
//!
//! Earlier releases stored gate conditions and rewards as display text. This module
//! decodes that text once, at import, into [`Condition`] and [`Reward`]. Text is never
//! produced again; `Display` on the structured types is presentation only.
//!
//! Decoding is conservative: unreadable condition text becomes
//! [`Condition::Unrecognized`] (never met) and unreadable reward text becomes a zero
//! reward, which still pays the minimum clear payout.
//!
//! Reward text is a comma separated list whose parts may appear in any order. Numbers
//! are attributed by their unit suffix (`XP`, `Mana Crystals`), never by position.

use crate::gate::{Condition, Reward};
use crate::{Gate, GateId, GateKind, GateRank, GateStatus, ProgressionError, StatCategory};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum size of a legacy import file.
///
/// Validated before deserialization.
pub const MAX_LEGACY_IMPORT_SIZE: usize = 4 * 1024 * 1024;

// =============================================================================
// PARSER
// =============================================================================

/// Compiled patterns for the legacy phrasings.
#[derive(Debug, Clone)]
pub struct LegacyParser {
    reach_level: Regex,
    overall_streak: Regex,
    total_completions: Regex,
    category_completions: Regex,
    any_category_streak: Regex,
    mana_spent: Regex,
    reward_xp: Regex,
    reward_mana: Regex,
    reward_title: Regex,
}

fn pattern(source: &str) -> Result<Regex, ProgressionError> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .map_err(|e| ProgressionError::MalformedEncoding(format!("invalid pattern: {e}")))
}

fn number(text: &str, raw: &str) -> Result<u64, ProgressionError> {
    raw.parse::<u64>()
        .map_err(|_| {
            ProgressionError::MalformedEncoding(format!("number out of range in '{text}'"))
        })
}

impl LegacyParser {
    pub fn new() -> Result<Self, ProgressionError> {
        Ok(Self {
            reach_level: pattern(r"^reach level (\d+)$")?,
            overall_streak: pattern(r"^maintain an overall streak of (\d+) days?$")?,
            total_completions: pattern(r"^complete (\d+) habits? across all categories$")?,
            category_completions: pattern(r"^complete (\d+) ([a-z]+)(?:-based)? habits?$")?,
            any_category_streak: pattern(r"^maintain an? (\d+)-day streak in any category$")?,
            mana_spent: pattern(r"^spend (\d+) mana crystals?$")?,
            reward_xp: pattern(r"^(\d+)\s*xp$")?,
            reward_mana: pattern(r"^(\d+)\s*mana crystals?$")?,
            reward_title: pattern(r"^title:\s*(.+)$")?,
        })
    }

    /// Decode condition text. Unknown phrasings are `MalformedEncoding`.
    pub fn parse_condition(&self, text: &str) -> Result<Condition, ProgressionError> {
        let trimmed = text.trim().trim_end_matches('.');

        if let Some(caps) = self.reach_level.captures(trimmed) {
            let level = u32::try_from(number(text, &caps[1])?).map_err(|_| {
                ProgressionError::MalformedEncoding(format!("level out of range in '{text}'"))
            })?;
            return Ok(Condition::ReachLevel(level));
        }
        if let Some(caps) = self.overall_streak.captures(trimmed) {
            return Ok(Condition::OverallStreak(days(text, &caps[1])?));
        }
        // Checked before the category pattern, which would also accept "habits".
        if let Some(caps) = self.total_completions.captures(trimmed) {
            return Ok(Condition::TotalCompletionsAcrossCategories(number(
                text, &caps[1],
            )?));
        }
        if let Some(caps) = self.category_completions.captures(trimmed) {
            let count = number(text, &caps[1])?;
            let category = caps[2].parse::<StatCategory>().map_err(|_| {
                ProgressionError::MalformedEncoding(format!("unknown category in '{text}'"))
            })?;
            return Ok(Condition::CategoryCompletions { category, count });
        }
        if let Some(caps) = self.any_category_streak.captures(trimmed) {
            return Ok(Condition::AnyCategoryStreak(days(text, &caps[1])?));
        }
        if let Some(caps) = self.mana_spent.captures(trimmed) {
            return Ok(Condition::ManaSpent(number(text, &caps[1])?));
        }

        Err(ProgressionError::MalformedEncoding(format!(
            "unrecognized condition '{text}'"
        )))
    }

    /// Decode reward text such as `120 XP, 40 Mana Crystals, Title: Gate Breaker`.
    pub fn parse_reward(&self, text: &str) -> Result<Reward, ProgressionError> {
        let mut reward = Reward::default();
        let mut matched = false;

        for part in text.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if let Some(caps) = self.reward_title.captures(part) {
                reward.title = Some(caps[1].trim().to_string());
            } else if let Some(caps) = self.reward_xp.captures(part) {
                reward.xp = reward.xp.saturating_add(number(text, &caps[1])?);
            } else if let Some(caps) = self.reward_mana.captures(part) {
                reward.mana_crystals = reward.mana_crystals.saturating_add(number(text, &caps[1])?);
            } else {
                return Err(ProgressionError::MalformedEncoding(format!(
                    "unrecognized reward part '{part}'"
                )));
            }
            matched = true;
        }

        if matched {
            Ok(reward)
        } else {
            Err(ProgressionError::MalformedEncoding(format!(
                "empty reward '{text}'"
            )))
        }
    }
}

fn days(text: &str, raw: &str) -> Result<u32, ProgressionError> {
    u32::try_from(number(text, raw)?)
        .map_err(|_| {
            ProgressionError::MalformedEncoding(format!("day count out of range in '{text}'"))
        })
}

// =============================================================================
// LEGACY RECORDS
// =============================================================================

/// A gate as exported by earlier releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyGateRecord {
    pub gate_rank: String,
    #[serde(default)]
    pub gate_type: Option<String>,
    pub status: String,
    #[serde(default)]
    pub clear_condition_description: Option<String>,
    #[serde(default)]
    pub reward_description: Option<String>,
    #[serde(default)]
    pub status_change_date: Option<DateTime<Utc>>,
}

impl LegacyParser {
    /// Convert a legacy record into a gate with the given id.
    ///
    /// Rank and status must be readable; condition and reward text fall back to the
    /// conservative variants with a warning.
    pub fn decode_gate(
        &self,
        id: GateId,
        record: &LegacyGateRecord,
        now: DateTime<Utc>,
    ) -> Result<Gate, ProgressionError> {
        let rank: GateRank = record.gate_rank.parse()?;
        let status = parse_status(&record.status)?;
        let kind = match record.gate_type.as_deref().map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("red") => GateKind::Red,
            _ => GateKind::Standard,
        };

        let (condition, reward) = if status == GateStatus::Locked {
            (None, None)
        } else {
            let condition = record
                .clear_condition_description
                .as_deref()
                .map_or(Ok(Condition::Unrecognized), |t| self.parse_condition(t))
                .unwrap_or_else(|e| {
                    tracing::warn!(
                        gate = %id,
                        error = %e,
                        "unreadable legacy condition, gate cannot be cleared"
                    );
                    Condition::Unrecognized
                });
            let reward = record
                .reward_description
                .as_deref()
                .map_or(Ok(Reward::default()), |t| self.parse_reward(t))
                .unwrap_or_else(|e| {
                    tracing::warn!(
                        gate = %id,
                        error = %e,
                        "unreadable legacy reward, using zero reward"
                    );
                    Reward::default()
                });
            (Some(condition), Some(reward))
        };

        Ok(Gate {
            id,
            rank,
            kind,
            status,
            condition,
            reward,
            status_changed_at: record.status_change_date.unwrap_or(now),
        })
    }
}

fn parse_status(text: &str) -> Result<GateStatus, ProgressionError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "locked" => Ok(GateStatus::Locked),
        "analyzed" => Ok(GateStatus::Analyzed),
        "cleared" => Ok(GateStatus::Cleared),
        _ => Err(ProgressionError::MalformedEncoding(format!(
            "unknown gate status '{text}'"
        ))),
    }
}

// =============================================================================
// TESTS
// =============================================================================
