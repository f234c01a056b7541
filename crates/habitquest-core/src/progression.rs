//! # Progression Facade
//!
//! The only entry point external callers use. It owns the store, the engines, the
//! clock and the event bus, and sequences them:
//!
//! ```text
//! complete_habit:
//!   record completion -> stats snapshot -> add xp -> artifact awards -> check unlocks
//!   -> commit -> emit events
//! ```
//!
//! Every mutating operation runs inside a store transaction: commit on success,
//! rollback on any error. Events are emitted only after a successful commit, so
//! subscribers never observe state that was rolled back.
//!
//! Mutating operations take `&mut self`, which serializes writers per profile.

use crate::artifacts::{evaluate_awards, seed_catalog};
use crate::clock::Clock;
use crate::events::{EventBus, GateChange, ProgressionEvent};
use crate::formats::legacy::{LegacyGateRecord, LegacyParser};
use crate::gate::{ClearOutcome, GateEngine, RefreshOutcome, UnlockReport};
use crate::leveling::{LevelProgress, LevelingEngine};
use crate::primitives::MAX_ACTIVE_GATES;
use crate::stats::{StatSheet, StatsAggregator, StatsSnapshot};
use crate::storage::ProgressionStore;
use crate::{
    Artifact, ArtifactId, CompletionLog, Gate, GateId, GateKind, GateRank, GateSpawn, Habit,
    HabitId, NewHabit, OwnedArtifact, Profile, ProfileId, ProgressionError, StatCategory,
};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Receiver;

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of completing a habit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub habit: Habit,
    pub log: CompletionLog,
    pub xp_awarded: u64,
    pub new_level: Option<u32>,
    pub awarded: Vec<Artifact>,
    pub spawned: Option<GateId>,
}

/// Result of a legacy gate import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: Vec<GateId>,
    pub skipped: usize,
}

// =============================================================================
// FACADE
// =============================================================================

/// Progression facade over a store `S`, random source `R` and clock `C`.
pub struct Progression<S, R, C> {
    store: S,
    gates: GateEngine<R>,
    leveling: LevelingEngine,
    clock: C,
    events: EventBus,
    profile_id: ProfileId,
}

impl<S, R, C> std::fmt::Debug for Progression<S, R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progression")
            .field("profile_id", &self.profile_id)
            .field("subscribers", &self.events.subscriber_count())
            .finish_non_exhaustive()
    }
}

impl<S: ProgressionStore, R: Rng, C: Clock> Progression<S, R, C> {
    /// Open the facade: create the profile on first run, seed the artifact catalog
    /// and make sure a Locked gate exists.
    pub fn open(store: S, rng: R, clock: C) -> Result<Self, ProgressionError> {
        let mut progression = Self {
            store,
            gates: GateEngine::new(rng),
            leveling: LevelingEngine::new(),
            clock,
            events: EventBus::new(),
            profile_id: ProfileId::DEVICE,
        };

        progression.transact(|p, events| {
            if p.store.profile(p.profile_id)?.is_none() {
                let mut profile = Profile::new(p.profile_id);
                p.settle(&mut profile);
                p.store.put_profile(&profile)?;
                tracing::info!(profile = %profile.id, "created profile");
                events.push(ProgressionEvent::ProfileChanged(profile));
            }

            if p.store.artifacts()?.is_empty() {
                for entry in seed_catalog() {
                    p.store.create_artifact(entry)?;
                }
                tracing::info!("seeded artifact catalog");
            }

            p.bootstrap_gate(events)?;
            Ok(())
        })?;

        Ok(progression)
    }

    /// Register a new event subscriber.
    pub fn subscribe(&mut self) -> Receiver<ProgressionEvent> {
        self.events.subscribe()
    }

    /// Borrow the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // PROFILE
    // =========================================================================

    /// The committed profile.
    pub fn profile(&self) -> Result<Profile, ProgressionError> {
        self.store
            .profile(self.profile_id)?
            .ok_or_else(|| ProgressionError::NotFound(format!("profile {}", self.profile_id)))
    }

    pub fn progress(&self) -> Result<LevelProgress, ProgressionError> {
        Ok(self.leveling.progress(&self.profile()?))
    }

    /// Display rank for the profile's level.
    pub fn hunter_rank(&self) -> Result<GateRank, ProgressionError> {
        Ok(self.leveling.hunter_rank(&self.profile()?))
    }

    /// Debug grant of mana crystals.
    pub fn add_mana(&mut self, amount: u64) -> Result<Profile, ProgressionError> {
        self.transact(|p, events| {
            let mut profile = p.profile()?;
            profile.grant_mana(amount);
            p.store.put_profile(&profile)?;
            tracing::debug!(amount, total = profile.mana_crystals, "mana granted");
            events.push(ProgressionEvent::ProfileChanged(profile.clone()));
            Ok(profile)
        })
    }

    /// Start over: default profile, no history, no gates, zeroed habit streaks.
    ///
    /// Habits, owned artifacts and lifetime mana spent are kept. A fresh gate is
    /// bootstrapped.
    pub fn reset(&mut self) -> Result<Profile, ProgressionError> {
        self.transact(|p, events| {
            let previous = p.profile()?;
            let mut profile = Profile::new(previous.id);
            profile.total_mana_spent = previous.total_mana_spent;
            p.settle(&mut profile);
            p.store.put_profile(&profile)?;

            p.store.clear_completions()?;
            for gate in p.store.gates()? {
                events.push(ProgressionEvent::GateChanged {
                    gate: gate.id,
                    change: GateChange::Removed,
                });
            }
            p.store.clear_gates()?;
            for mut habit in p.store.habits()? {
                habit.streak = 0;
                habit.last_completed = None;
                p.store.put_habit(&habit)?;
            }

            tracing::info!("progression reset");
            events.push(ProgressionEvent::ProfileChanged(profile.clone()));
            p.bootstrap_gate(events)?;
            Ok(profile)
        })
    }

    // =========================================================================
    // HABITS
    // =========================================================================

    pub fn add_habit(&mut self, new: NewHabit) -> Result<Habit, ProgressionError> {
        let now = self.clock.now();
        self.transact(|p, _| {
            let habit = p.store.create_habit(new, now)?;
            tracing::debug!(habit = %habit.id, name = %habit.name, "habit added");
            Ok(habit)
        })
    }

    /// Delete a habit. Its completion logs stay in the history.
    pub fn delete_habit(&mut self, id: HabitId) -> Result<(), ProgressionError> {
        self.transact(|p, _| {
            if !p.store.delete_habit(id)? {
                return Err(ProgressionError::NotFound(format!("habit {id}")));
            }
            tracing::debug!(habit = %id, "habit deleted");
            Ok(())
        })
    }

    pub fn habits(&self) -> Result<Vec<Habit>, ProgressionError> {
        self.store.habits()
    }

    /// Habits not yet completed in their current period.
    pub fn due_habits(&self) -> Result<Vec<Habit>, ProgressionError> {
        let today = self.clock.today();
        self.store.habits_where(&|h| h.is_due(today))
    }

    /// Complete a habit for the current local day.
    pub fn complete_habit(&mut self, id: HabitId) -> Result<CompletionOutcome, ProgressionError> {
        let now = self.clock.now();
        let today = self.clock.local_date(now);

        self.transact(|p, events| {
            let mut habit = p
                .store
                .habit(id)?
                .ok_or_else(|| ProgressionError::NotFound(format!("habit {id}")))?;
            let streak = habit.record_completion(today)?;
            p.store.put_habit(&habit)?;
            let log = p.store.append_completion(id, now)?;

            let mut profile = p.profile()?;
            let amount = i64::try_from(habit.xp_value).unwrap_or(i64::MAX);
            let new_level = p.leveling.add_xp(&mut profile, amount);
            p.settle(&mut profile);
            p.store.put_profile(&profile)?;

            events.push(ProgressionEvent::HabitCompleted {
                habit: id,
                streak,
                xp: habit.xp_value,
            });
            if let Some(level) = new_level {
                events.push(ProgressionEvent::LevelUp { level });
            }
            events.push(ProgressionEvent::ProfileChanged(profile.clone()));

            let snapshot = p.snapshot_at(now)?;
            let awarded = p.award_artifacts(&profile, &snapshot, now, events)?;
            let spawned = p.bootstrap_gate(events)?;

            tracing::info!(
                habit = %id,
                streak,
                xp = habit.xp_value,
                level = profile.level,
                "habit completed"
            );

            Ok(CompletionOutcome {
                habit,
                log,
                xp_awarded: amount.unsigned_abs(),
                new_level,
                awarded,
                spawned,
            })
        })
    }

    // =========================================================================
    // GATES
    // =========================================================================

    pub fn gates(&self) -> Result<Vec<Gate>, ProgressionError> {
        self.store.gates()
    }

    /// Pay the analysis cost and reveal a gate's condition and reward.
    pub fn analyze_gate(&mut self, id: GateId) -> Result<Gate, ProgressionError> {
        let now = self.clock.now();
        self.transact(|p, events| {
            let mut gate = p.require_gate(id)?;
            let mut profile = p.profile()?;
            p.gates.analyze(&mut gate, &mut profile, now)?;

            p.store.put_gate(&gate)?;
            p.store.put_profile(&profile)?;
            events.push(ProgressionEvent::GateChanged {
                gate: id,
                change: GateChange::Analyzed,
            });
            events.push(ProgressionEvent::ProfileChanged(profile));
            Ok(gate)
        })
    }

    /// Clear an Analyzed gate whose condition holds.
    pub fn clear_gate(&mut self, id: GateId) -> Result<ClearOutcome, ProgressionError> {
        let now = self.clock.now();
        self.transact(|p, events| {
            let mut gate = p.require_gate(id)?;
            let mut profile = p.profile()?;
            let all = p.store.gates()?;
            let snapshot = p.snapshot_at(now)?;

            let outcome = p
                .gates
                .attempt_clear(&mut gate, &mut profile, &snapshot, &all, now)?;
            p.settle(&mut profile);
            p.store.put_gate(&gate)?;
            p.store.put_profile(&profile)?;

            events.push(ProgressionEvent::GateChanged {
                gate: id,
                change: GateChange::Cleared,
            });
            if let Some(level) = outcome.new_level {
                events.push(ProgressionEvent::LevelUp { level });
            }
            events.push(ProgressionEvent::ProfileChanged(profile.clone()));

            p.create_spawn(outcome.replacement, now, events)?;
            if outcome.new_level.is_some() {
                p.award_artifacts(&profile, &snapshot, now, events)?;
            }
            Ok(outcome)
        })
    }

    /// Pay to replace a Locked or Analyzed gate with a fresh Locked one.
    pub fn refresh_gate(&mut self, id: GateId) -> Result<RefreshOutcome, ProgressionError> {
        let now = self.clock.now();
        self.transact(|p, events| {
            let gate = p.require_gate(id)?;
            let mut profile = p.profile()?;
            let all = p.store.gates()?;

            let outcome = p.gates.refresh(&gate, &mut profile, &all)?;
            p.store.delete_gate(id)?;
            p.store.put_profile(&profile)?;

            events.push(ProgressionEvent::GateChanged {
                gate: id,
                change: GateChange::Removed,
            });
            events.push(ProgressionEvent::ProfileChanged(profile));
            p.create_spawn(outcome.replacement, now, events)?;
            Ok(outcome)
        })
    }

    /// Ensure a Locked gate exists and report the ranks on offer.
    pub fn check_unlocks(&mut self) -> Result<UnlockReport, ProgressionError> {
        let now = self.clock.now();
        self.transact(|p, events| {
            let profile = p.profile()?;
            let all = p.store.gates()?;
            let report = p.gates.check_unlocks(&all, &profile);
            p.create_spawn(report.spawned, now, events)?;
            Ok(report)
        })
    }

    /// Import gates exported by earlier releases.
    ///
    /// Records with an unreadable rank or status are skipped, as are active gates
    /// beyond the active cap. Cleared gates are always kept as history.
    pub fn import_legacy_gates(
        &mut self,
        records: &[LegacyGateRecord],
    ) -> Result<ImportReport, ProgressionError> {
        let parser = LegacyParser::new()?;
        let now = self.clock.now();

        self.transact(|p, events| {
            let mut report = ImportReport::default();
            let mut active = p.store.count_gates_where(&|g| g.status.is_active())?;

            for (index, record) in records.iter().enumerate() {
                // Reserve an id; the placeholder is replaced or removed below.
                let placeholder = p.store.create_gate(
                    GateSpawn {
                        rank: GateRank::E,
                        kind: GateKind::Standard,
                    },
                    now,
                )?;

                let gate = match parser.decode_gate(placeholder.id, record, now) {
                    Ok(gate) if gate.status.is_active() && active >= MAX_ACTIVE_GATES => {
                        tracing::warn!(index, "active gate cap reached, legacy gate skipped");
                        None
                    }
                    Ok(gate) => Some(gate),
                    Err(e) => {
                        tracing::warn!(index, error = %e, "legacy gate skipped");
                        None
                    }
                };

                match gate {
                    Some(gate) => {
                        if gate.status.is_active() {
                            active += 1;
                        }
                        p.store.put_gate(&gate)?;
                        events.push(ProgressionEvent::GateChanged {
                            gate: gate.id,
                            change: GateChange::Spawned,
                        });
                        report.imported.push(gate.id);
                    }
                    None => {
                        p.store.delete_gate(placeholder.id)?;
                        report.skipped += 1;
                    }
                }
            }

            tracing::info!(
                imported = report.imported.len(),
                skipped = report.skipped,
                "legacy gates imported"
            );
            Ok(report)
        })
    }

    // =========================================================================
    // STATS
    // =========================================================================

    fn aggregator(&self) -> StatsAggregator {
        StatsAggregator::new(self.clock.offset())
    }

    pub fn stat_points(&self) -> Result<StatSheet, ProgressionError> {
        Ok(self.aggregator().stat_points(
            &self.store.habits()?,
            &self.store.completions()?,
            &self.store.owned_artifacts()?,
            &self.store.artifacts()?,
        ))
    }

    pub fn overall_streak(&self) -> Result<u32, ProgressionError> {
        Ok(self
            .aggregator()
            .overall_streak(&self.store.completions()?, self.clock.today()))
    }

    pub fn category_streak(&self, category: StatCategory) -> Result<u32, ProgressionError> {
        Ok(self.aggregator().category_streak(
            category,
            &self.store.habits()?,
            &self.store.completions()?,
            self.clock.today(),
        ))
    }

    pub fn snapshot(&self) -> Result<StatsSnapshot, ProgressionError> {
        self.snapshot_at(self.clock.now())
    }

    fn snapshot_at(&self, now: DateTime<Utc>) -> Result<StatsSnapshot, ProgressionError> {
        Ok(self.aggregator().snapshot(
            &self.store.habits()?,
            &self.store.completions()?,
            self.clock.local_date(now),
        ))
    }

    // =========================================================================
    // ARTIFACTS
    // =========================================================================

    pub fn catalog(&self) -> Result<Vec<Artifact>, ProgressionError> {
        self.store.artifacts()
    }

    pub fn owned_artifacts(&self) -> Result<Vec<OwnedArtifact>, ProgressionError> {
        self.store.owned_artifacts()
    }

    /// Equip or unequip an owned artifact.
    pub fn equip_artifact(
        &mut self,
        artifact: ArtifactId,
        equipped: bool,
    ) -> Result<OwnedArtifact, ProgressionError> {
        self.transact(|p, events| {
            let mut owned = p
                .store
                .owned_artifact(artifact)?
                .ok_or_else(|| ProgressionError::NotFound(format!("owned artifact {artifact}")))?;
            owned.equipped = equipped;
            p.store.put_owned_artifact(&owned)?;
            tracing::debug!(artifact = %artifact, equipped, "artifact equip toggled");
            events.push(ProgressionEvent::ProfileChanged(p.profile()?));
            Ok(owned)
        })
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Run `op` as one transaction and emit its events after commit.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Self, &mut Vec<ProgressionEvent>) -> Result<T, ProgressionError>,
    ) -> Result<T, ProgressionError> {
        let mut events = Vec::new();
        let result = op(self, &mut events).and_then(|value| {
            self.store.commit()?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                self.events.emit_all(&events);
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(error = %e, "operation rolled back");
                if let Err(rollback) = self.store.rollback() {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    fn settle(&self, profile: &mut Profile) {
        profile.essence_state = self.leveling.essence_state(profile);
    }

    fn require_gate(&self, id: GateId) -> Result<Gate, ProgressionError> {
        self.store
            .gate(id)?
            .ok_or_else(|| ProgressionError::NotFound(format!("gate {id}")))
    }

    fn bootstrap_gate(
        &mut self,
        events: &mut Vec<ProgressionEvent>,
    ) -> Result<Option<GateId>, ProgressionError> {
        let profile = self.profile()?;
        let all = self.store.gates()?;
        let report = self.gates.check_unlocks(&all, &profile);
        self.create_spawn(report.spawned, self.clock.now(), events)
    }

    fn create_spawn(
        &mut self,
        spawn: Option<GateSpawn>,
        now: DateTime<Utc>,
        events: &mut Vec<ProgressionEvent>,
    ) -> Result<Option<GateId>, ProgressionError> {
        let Some(spawn) = spawn else {
            return Ok(None);
        };
        let gate = self.store.create_gate(spawn, now)?;
        tracing::debug!(gate = %gate.id, rank = %gate.rank, kind = %gate.kind, "gate spawned");
        events.push(ProgressionEvent::GateChanged {
            gate: gate.id,
            change: GateChange::Spawned,
        });
        Ok(Some(gate.id))
    }

    fn award_artifacts(
        &mut self,
        profile: &Profile,
        snapshot: &StatsSnapshot,
        now: DateTime<Utc>,
        events: &mut Vec<ProgressionEvent>,
    ) -> Result<Vec<Artifact>, ProgressionError> {
        let catalog = self.store.artifacts()?;
        let owned = self.store.owned_artifacts()?;
        let mut awarded = Vec::new();

        for id in evaluate_awards(profile, snapshot, &catalog, &owned) {
            let Some(artifact) = catalog.iter().find(|a| a.id == id) else {
                continue;
            };
            self.store.put_owned_artifact(&OwnedArtifact {
                profile_id: profile.id,
                artifact_id: id,
                equipped: false,
                acquired_at: now,
            })?;
            tracing::info!(artifact = %artifact.name, "artifact awarded");
            events.push(ProgressionEvent::ArtifactAwarded {
                artifact: id,
                name: artifact.name.clone(),
            });
            awarded.push(artifact.clone());
        }
        Ok(awarded)
    }
}

// =============================================================================
// TESTS
// =============================================================================
