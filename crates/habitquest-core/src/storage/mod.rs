//! # Storage Module
//!
//! The `ProgressionStore` trait and its two backends:
//! - `MemoryStore`: volatile, for tests and dry runs
//! - `RedbStore`: disk-backed ACID storage using redb
//!
//! Both stage writes in memory. `commit` makes every staged write durable at once and
//! `rollback` discards everything staged since the last commit.

mod memory;
mod redb_store;

pub use memory::{IdCounters, MemoryStore, ProgressionState};
pub use redb_store::RedbStore;

use crate::{
    Artifact, ArtifactEntry, ArtifactId, CompletionLog, Gate, GateId, GateSpawn, Habit, HabitId,
    NewHabit, OwnedArtifact, Profile, ProfileId, ProgressionError,
};
use chrono::{DateTime, Utc};

/// Persistence collaborator of the progression facade.
///
/// Reads see staged writes. Nothing is durable until `commit`.
pub trait ProgressionStore {
    // --- profile ---
    fn profile(&self, id: ProfileId) -> Result<Option<Profile>, ProgressionError>;
    fn put_profile(&mut self, profile: &Profile) -> Result<(), ProgressionError>;

    // --- habits ---
    fn habits(&self) -> Result<Vec<Habit>, ProgressionError>;
    fn habit(&self, id: HabitId) -> Result<Option<Habit>, ProgressionError>;
    fn create_habit(
        &mut self,
        new: NewHabit,
        created_at: DateTime<Utc>,
    ) -> Result<Habit, ProgressionError>;
    fn put_habit(&mut self, habit: &Habit) -> Result<(), ProgressionError>;
    /// Returns false if the habit did not exist.
    fn delete_habit(&mut self, id: HabitId) -> Result<bool, ProgressionError>;

    // --- completions ---
    fn completions(&self) -> Result<Vec<CompletionLog>, ProgressionError>;
    fn append_completion(
        &mut self,
        habit_id: HabitId,
        completed_at: DateTime<Utc>,
    ) -> Result<CompletionLog, ProgressionError>;
    fn clear_completions(&mut self) -> Result<(), ProgressionError>;

    // --- gates ---
    fn gates(&self) -> Result<Vec<Gate>, ProgressionError>;
    fn gate(&self, id: GateId) -> Result<Option<Gate>, ProgressionError>;
    fn create_gate(&mut self, spawn: GateSpawn, at: DateTime<Utc>)
    -> Result<Gate, ProgressionError>;
    /// Insert or replace a gate under its own id.
    fn put_gate(&mut self, gate: &Gate) -> Result<(), ProgressionError>;
    fn delete_gate(&mut self, id: GateId) -> Result<bool, ProgressionError>;
    fn clear_gates(&mut self) -> Result<(), ProgressionError>;

    // --- artifacts ---
    fn artifacts(&self) -> Result<Vec<Artifact>, ProgressionError>;
    fn create_artifact(&mut self, entry: ArtifactEntry) -> Result<Artifact, ProgressionError>;
    fn owned_artifacts(&self) -> Result<Vec<OwnedArtifact>, ProgressionError>;
    fn put_owned_artifact(&mut self, owned: &OwnedArtifact) -> Result<(), ProgressionError>;

    // --- transactions ---
    fn commit(&mut self) -> Result<(), ProgressionError>;
    fn rollback(&mut self) -> Result<(), ProgressionError>;

    // --- provided queries ---

    fn count_gates_where(
        &self,
        predicate: &dyn Fn(&Gate) -> bool,
    ) -> Result<usize, ProgressionError> {
        Ok(self.gates()?.iter().filter(|g| predicate(g)).count())
    }

    fn habits_where(
        &self,
        predicate: &dyn Fn(&Habit) -> bool,
    ) -> Result<Vec<Habit>, ProgressionError> {
        Ok(self.habits()?.into_iter().filter(|h| predicate(h)).collect())
    }

    fn owned_artifact(
        &self,
        artifact_id: ArtifactId,
    ) -> Result<Option<OwnedArtifact>, ProgressionError> {
        Ok(self
            .owned_artifacts()?
            .into_iter()
            .find(|o| o.artifact_id == artifact_id))
    }
}
