//! In-memory progression state and the volatile store built on it.

use super::ProgressionStore;
use crate::{
    Artifact, ArtifactEntry, ArtifactId, CompletionId, CompletionLog, Gate, GateId, GateSpawn,
    Habit, HabitId, NewHabit, OwnedArtifact, Profile, ProfileId, ProgressionError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Next id to hand out per record kind. Ids start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounters {
    pub habit: u64,
    pub completion: u64,
    pub gate: u64,
    pub artifact: u64,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            habit: 1,
            completion: 1,
            gate: 1,
            artifact: 1,
        }
    }
}

fn take_id(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter = counter.saturating_add(1);
    id
}

/// Every progression record, keyed for deterministic iteration.
///
/// Owned artifacts are keyed by artifact id: a device has one profile and an artifact
/// is owned at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub profiles: BTreeMap<ProfileId, Profile>,
    pub habits: BTreeMap<HabitId, Habit>,
    pub completions: BTreeMap<CompletionId, CompletionLog>,
    pub gates: BTreeMap<GateId, Gate>,
    pub artifacts: BTreeMap<ArtifactId, Artifact>,
    pub owned: BTreeMap<ArtifactId, OwnedArtifact>,
    pub counters: IdCounters,
}

impl ProgressionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_habit(
        &mut self,
        new: NewHabit,
        created_at: DateTime<Utc>,
    ) -> Result<Habit, ProgressionError> {
        // Validate before consuming an id.
        let habit = Habit::from_new(HabitId(self.counters.habit), new, created_at)?;
        take_id(&mut self.counters.habit);
        self.habits.insert(habit.id, habit.clone());
        Ok(habit)
    }

    pub fn insert_completion(
        &mut self,
        habit_id: HabitId,
        completed_at: DateTime<Utc>,
    ) -> CompletionLog {
        let log = CompletionLog {
            id: CompletionId(take_id(&mut self.counters.completion)),
            habit_id,
            completed_at,
        };
        self.completions.insert(log.id, log.clone());
        log
    }

    pub fn insert_gate(&mut self, spawn: GateSpawn, at: DateTime<Utc>) -> Gate {
        let gate = Gate::locked(GateId(take_id(&mut self.counters.gate)), spawn, at);
        self.gates.insert(gate.id, gate.clone());
        gate
    }

    /// Store a gate under its own id, keeping the counter ahead of it.
    pub fn upsert_gate(&mut self, gate: &Gate) {
        if gate.id.0 >= self.counters.gate {
            self.counters.gate = gate.id.0.saturating_add(1);
        }
        self.gates.insert(gate.id, gate.clone());
    }

    pub fn insert_artifact(&mut self, entry: ArtifactEntry) -> Artifact {
        let artifact = Artifact {
            id: ArtifactId(take_id(&mut self.counters.artifact)),
            name: entry.name,
            description: entry.description,
            rarity: entry.rarity,
            boost_category: entry.boost_category,
            boost_magnitude: entry.boost_magnitude,
        };
        self.artifacts.insert(artifact.id, artifact.clone());
        artifact
    }

    fn require_habit(&self, id: HabitId) -> Result<(), ProgressionError> {
        if self.habits.contains_key(&id) {
            Ok(())
        } else {
            Err(ProgressionError::NotFound(format!("habit {id}")))
        }
    }

    fn require_artifact(&self, id: ArtifactId) -> Result<(), ProgressionError> {
        if self.artifacts.contains_key(&id) {
            Ok(())
        } else {
            Err(ProgressionError::NotFound(format!("artifact {id}")))
        }
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Volatile store. `rollback` restores the last committed state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: ProgressionState,
    committed: ProgressionState,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose committed state is `state`.
    #[must_use]
    pub fn with_state(state: ProgressionState) -> Self {
        Self {
            committed: state.clone(),
            state,
        }
    }

    /// Current (possibly staged) state.
    #[must_use]
    pub fn state(&self) -> &ProgressionState {
        &self.state
    }
}

impl ProgressionStore for MemoryStore {
    fn profile(&self, id: ProfileId) -> Result<Option<Profile>, ProgressionError> {
        Ok(self.state.profiles.get(&id).cloned())
    }

    fn put_profile(&mut self, profile: &Profile) -> Result<(), ProgressionError> {
        self.state.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    fn habits(&self) -> Result<Vec<Habit>, ProgressionError> {
        Ok(self.state.habits.values().cloned().collect())
    }

    fn habit(&self, id: HabitId) -> Result<Option<Habit>, ProgressionError> {
        Ok(self.state.habits.get(&id).cloned())
    }

    fn create_habit(
        &mut self,
        new: NewHabit,
        created_at: DateTime<Utc>,
    ) -> Result<Habit, ProgressionError> {
        self.state.insert_habit(new, created_at)
    }

    fn put_habit(&mut self, habit: &Habit) -> Result<(), ProgressionError> {
        self.state.require_habit(habit.id)?;
        self.state.habits.insert(habit.id, habit.clone());
        Ok(())
    }

    fn delete_habit(&mut self, id: HabitId) -> Result<bool, ProgressionError> {
        Ok(self.state.habits.remove(&id).is_some())
    }

    fn completions(&self) -> Result<Vec<CompletionLog>, ProgressionError> {
        Ok(self.state.completions.values().cloned().collect())
    }

    fn append_completion(
        &mut self,
        habit_id: HabitId,
        completed_at: DateTime<Utc>,
    ) -> Result<CompletionLog, ProgressionError> {
        self.state.require_habit(habit_id)?;
        Ok(self.state.insert_completion(habit_id, completed_at))
    }

    fn clear_completions(&mut self) -> Result<(), ProgressionError> {
        self.state.completions.clear();
        Ok(())
    }

    fn gates(&self) -> Result<Vec<Gate>, ProgressionError> {
        Ok(self.state.gates.values().cloned().collect())
    }

    fn gate(&self, id: GateId) -> Result<Option<Gate>, ProgressionError> {
        Ok(self.state.gates.get(&id).cloned())
    }

    fn create_gate(
        &mut self,
        spawn: GateSpawn,
        at: DateTime<Utc>,
    ) -> Result<Gate, ProgressionError> {
        Ok(self.state.insert_gate(spawn, at))
    }

    fn put_gate(&mut self, gate: &Gate) -> Result<(), ProgressionError> {
        self.state.upsert_gate(gate);
        Ok(())
    }

    fn delete_gate(&mut self, id: GateId) -> Result<bool, ProgressionError> {
        Ok(self.state.gates.remove(&id).is_some())
    }

    fn clear_gates(&mut self) -> Result<(), ProgressionError> {
        self.state.gates.clear();
        Ok(())
    }

    fn artifacts(&self) -> Result<Vec<Artifact>, ProgressionError> {
        Ok(self.state.artifacts.values().cloned().collect())
    }

    fn create_artifact(&mut self, entry: ArtifactEntry) -> Result<Artifact, ProgressionError> {
        Ok(self.state.insert_artifact(entry))
    }

    fn owned_artifacts(&self) -> Result<Vec<OwnedArtifact>, ProgressionError> {
        Ok(self.state.owned.values().cloned().collect())
    }

    fn put_owned_artifact(&mut self, owned: &OwnedArtifact) -> Result<(), ProgressionError> {
        self.state.require_artifact(owned.artifact_id)?;
        self.state.owned.insert(owned.artifact_id, owned.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ProgressionError> {
        self.committed = self.state.clone();
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ProgressionError> {
        self.state = self.committed.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Frequency, GateKind, GateRank, StatCategory};

    fn new_habit(name: &str) -> NewHabit {
        NewHabit {
            name: name.to_string(),
            category: StatCategory::Body,
            xp_value: 10,
            frequency: Frequency::Daily,
        }
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        let a = store.create_habit(new_habit("Run"), now).expect("habit");
        let b = store.create_habit(new_habit("Lift"), now).expect("habit");
        assert_eq!(a.id, HabitId(1));
        assert_eq!(b.id, HabitId(2));
    }

    #[test]
    fn rejected_habit_does_not_consume_id() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        let mut bad = new_habit("Nothing");
        bad.xp_value = 0;
        assert!(store.create_habit(bad, now).is_err());
        let ok = store.create_habit(new_habit("Run"), now).expect("habit");
        assert_eq!(ok.id, HabitId(1));
    }

    #[test]
    fn rollback_restores_committed_state() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        store.put_profile(&Profile::default()).expect("profile");
        store.commit().expect("commit");

        let spawn = GateSpawn {
            rank: GateRank::E,
            kind: GateKind::Red,
        };
        store.create_gate(spawn, now).expect("gate");
        let mut profile = Profile::default();
        profile.grant_mana(99);
        store.put_profile(&profile).expect("profile");

        store.rollback().expect("rollback");
        assert!(store.gates().expect("gates").is_empty());
        assert_eq!(
            store
                .profile(ProfileId::DEVICE)
                .expect("read")
                .map(|p| p.mana_crystals),
            Some(0)
        );
    }

    #[test]
    fn completion_requires_known_habit() {
        let mut store = MemoryStore::new();
        let result = store.append_completion(HabitId(7), Utc::now());
        assert!(matches!(result, Err(ProgressionError::NotFound(_))));
    }

    #[test]
    fn count_gates_where_filters() {
        let mut store = MemoryStore::new();
        let now = Utc::now();
        let spawn = GateSpawn {
            rank: GateRank::E,
            kind: GateKind::Standard,
        };
        let mut first = store.create_gate(spawn, now).expect("gate");
        store.create_gate(spawn, now).expect("gate");
        first.status = crate::GateStatus::Cleared;
        store.put_gate(&first).expect("put");

        let active = store
            .count_gates_where(&|g| g.status.is_active())
            .expect("count");
        assert_eq!(active, 1);
    }
}
