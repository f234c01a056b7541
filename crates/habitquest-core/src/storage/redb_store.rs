//! # redb-backed Progression Storage
//!
//! A disk-backed store using the redb embedded database.
//!
//! The full state is loaded into memory on open. Writes are staged in memory and
//! tracked per record; `commit` flushes every touched record plus the id counters in
//! a single redb write transaction, so a facade operation is either fully durable or
//! not at all. `rollback` reloads the last committed state from disk.
//!
//! Records are postcard-encoded and keyed by their numeric id.

use super::ProgressionStore;
use super::memory::{IdCounters, ProgressionState};
use crate::{
    Artifact, ArtifactEntry, ArtifactId, CompletionId, CompletionLog, Gate, GateId, GateSpawn,
    Habit, HabitId, NewHabit, OwnedArtifact, Profile, ProfileId, ProgressionError,
};
use chrono::{DateTime, Utc};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table,
    TableDefinition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Table for profiles: ProfileId(u64) -> serialized Profile bytes
const PROFILES: TableDefinition<u64, &[u8]> = TableDefinition::new("profiles");

/// Table for habits: HabitId(u64) -> serialized Habit bytes
const HABITS: TableDefinition<u64, &[u8]> = TableDefinition::new("habits");

/// Table for completion logs: CompletionId(u64) -> serialized CompletionLog bytes
const COMPLETIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("completions");

/// Table for gates: GateId(u64) -> serialized Gate bytes
const GATES: TableDefinition<u64, &[u8]> = TableDefinition::new("gates");

/// Table for the artifact catalog: ArtifactId(u64) -> serialized Artifact bytes
const ARTIFACTS: TableDefinition<u64, &[u8]> = TableDefinition::new("artifacts");

/// Table for owned artifacts: ArtifactId(u64) -> serialized OwnedArtifact bytes
const OWNED: TableDefinition<u64, &[u8]> = TableDefinition::new("owned_artifacts");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_HABIT_ID: &str = "next_habit_id";
const NEXT_COMPLETION_ID: &str = "next_completion_id";
const NEXT_GATE_ID: &str = "next_gate_id";
const NEXT_ARTIFACT_ID: &str = "next_artifact_id";

/// A record touched since the last commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RecordKey {
    Profile(u64),
    Habit(u64),
    Completion(u64),
    Gate(u64),
    Artifact(u64),
    Owned(u64),
}

/// Disk-backed progression store.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// Working copy of every record, including staged writes.
    state: ProgressionState,
    /// Records written or deleted since the last commit.
    dirty: BTreeSet<RecordKey>,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("habits", &self.state.habits.len())
            .field("gates", &self.state.gates.len())
            .field("dirty", &self.dirty.len())
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a progression database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProgressionError> {
        let db = Database::create(path.as_ref())
            .map_err(|e| ProgressionError::StorageError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            for table in [PROFILES, HABITS, COMPLETIONS, GATES, ARTIFACTS, OWNED] {
                let _ = write_txn
                    .open_table(table)
                    .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            }
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
        }

        let state = Self::load(&db)?;
        tracing::debug!(
            habits = state.habits.len(),
            completions = state.completions.len(),
            gates = state.gates.len(),
            "progression database opened"
        );

        Ok(Self {
            db,
            state,
            dirty: BTreeSet::new(),
        })
    }

    /// Number of completion logs stored on disk, ignoring staged writes.
    pub fn durable_completion_count(&self) -> Result<u64, ProgressionError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
        let table = read_txn
            .open_table(COMPLETIONS)
            .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
        table
            .len()
            .map_err(|e| ProgressionError::StorageError(e.to_string()))
    }

    /// Compact the database file, reclaiming pages freed by deletes and resets.
    ///
    /// Staged writes stay staged.
    pub fn compact(&mut self) -> Result<(), ProgressionError> {
        self.db
            .compact()
            .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
        Ok(())
    }

    fn load(db: &Database) -> Result<ProgressionState, ProgressionError> {
        let read_txn = db
            .begin_read()
            .map_err(|e| ProgressionError::StorageError(e.to_string()))?;

        let counters = {
            let table = read_txn
                .open_table(METADATA)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            let read = |key: &str| -> Result<u64, ProgressionError> {
                Ok(table
                    .get(key)
                    .map_err(|e| ProgressionError::StorageError(e.to_string()))?
                    .map(|v| v.value())
                    .unwrap_or(1))
            };
            IdCounters {
                habit: read(NEXT_HABIT_ID)?,
                completion: read(NEXT_COMPLETION_ID)?,
                gate: read(NEXT_GATE_ID)?,
                artifact: read(NEXT_ARTIFACT_ID)?,
            }
        };

        Ok(ProgressionState {
            profiles: load_records(&read_txn, PROFILES, ProfileId)?,
            habits: load_records(&read_txn, HABITS, HabitId)?,
            completions: load_records(&read_txn, COMPLETIONS, CompletionId)?,
            gates: load_records(&read_txn, GATES, GateId)?,
            artifacts: load_records(&read_txn, ARTIFACTS, ArtifactId)?,
            owned: load_records(&read_txn, OWNED, ArtifactId)?,
            counters,
        })
    }

    fn touch(&mut self, key: RecordKey) {
        self.dirty.insert(key);
    }
}

fn load_records<K: Ord, T: DeserializeOwned>(
    txn: &ReadTransaction,
    definition: TableDefinition<'static, u64, &'static [u8]>,
    key: fn(u64) -> K,
) -> Result<BTreeMap<K, T>, ProgressionError> {
    let table = txn
        .open_table(definition)
        .map_err(|e| ProgressionError::StorageError(e.to_string()))?;

    let mut records = BTreeMap::new();
    for entry in table
        .iter()
        .map_err(|e| ProgressionError::StorageError(e.to_string()))?
    {
        let (id, value) = entry.map_err(|e| ProgressionError::StorageError(e.to_string()))?;
        let record: T = postcard::from_bytes(value.value())
            .map_err(|e| ProgressionError::SerializationError(e.to_string()))?;
        records.insert(key(id.value()), record);
    }
    Ok(records)
}

/// Write `record` under `id`, or delete `id` if the record is gone.
fn write_record<T: Serialize>(
    table: &mut Table<'_, u64, &'static [u8]>,
    id: u64,
    record: Option<&T>,
) -> Result<(), ProgressionError> {
    match record {
        Some(record) => {
            let bytes = postcard::to_allocvec(record)
                .map_err(|e| ProgressionError::SerializationError(e.to_string()))?;
            table
                .insert(id, bytes.as_slice())
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
        }
        None => {
            table
                .remove(id)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
        }
    }
    Ok(())
}

// =============================================================================
// PROGRESSIONSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl ProgressionStore for RedbStore {
    fn profile(&self, id: ProfileId) -> Result<Option<Profile>, ProgressionError> {
        Ok(self.state.profiles.get(&id).cloned())
    }

    fn put_profile(&mut self, profile: &Profile) -> Result<(), ProgressionError> {
        self.state.profiles.insert(profile.id, profile.clone());
        self.touch(RecordKey::Profile(profile.id.0));
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
        let habit = self.state.insert_habit(new, created_at)?;
        self.touch(RecordKey::Habit(habit.id.0));
        Ok(habit)
    }

    fn put_habit(&mut self, habit: &Habit) -> Result<(), ProgressionError> {
        if !self.state.habits.contains_key(&habit.id) {
            return Err(ProgressionError::NotFound(format!("habit {}", habit.id)));
        }
        self.state.habits.insert(habit.id, habit.clone());
        self.touch(RecordKey::Habit(habit.id.0));
        Ok(())
    }

    fn delete_habit(&mut self, id: HabitId) -> Result<bool, ProgressionError> {
        let removed = self.state.habits.remove(&id).is_some();
        if removed {
            self.touch(RecordKey::Habit(id.0));
        }
        Ok(removed)
    }

    fn completions(&self) -> Result<Vec<CompletionLog>, ProgressionError> {
        Ok(self.state.completions.values().cloned().collect())
    }

    fn append_completion(
        &mut self,
        habit_id: HabitId,
        completed_at: DateTime<Utc>,
    ) -> Result<CompletionLog, ProgressionError> {
        if !self.state.habits.contains_key(&habit_id) {
            return Err(ProgressionError::NotFound(format!("habit {habit_id}")));
        }
        let log = self.state.insert_completion(habit_id, completed_at);
        self.touch(RecordKey::Completion(log.id.0));
        Ok(log)
    }

    fn clear_completions(&mut self) -> Result<(), ProgressionError> {
        let ids: Vec<u64> = self.state.completions.keys().map(|id| id.0).collect();
        for id in ids {
            self.touch(RecordKey::Completion(id));
        }
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
        let gate = self.state.insert_gate(spawn, at);
        self.touch(RecordKey::Gate(gate.id.0));
        Ok(gate)
    }

    fn put_gate(&mut self, gate: &Gate) -> Result<(), ProgressionError> {
        self.state.upsert_gate(gate);
        self.touch(RecordKey::Gate(gate.id.0));
        Ok(())
    }

    fn delete_gate(&mut self, id: GateId) -> Result<bool, ProgressionError> {
        let removed = self.state.gates.remove(&id).is_some();
        if removed {
            self.touch(RecordKey::Gate(id.0));
        }
        Ok(removed)
    }

    fn clear_gates(&mut self) -> Result<(), ProgressionError> {
        let ids: Vec<u64> = self.state.gates.keys().map(|id| id.0).collect();
        for id in ids {
            self.touch(RecordKey::Gate(id));
        }
        self.state.gates.clear();
        Ok(())
    }

    fn artifacts(&self) -> Result<Vec<Artifact>, ProgressionError> {
        Ok(self.state.artifacts.values().cloned().collect())
    }

    fn create_artifact(&mut self, entry: ArtifactEntry) -> Result<Artifact, ProgressionError> {
        let artifact = self.state.insert_artifact(entry);
        self.touch(RecordKey::Artifact(artifact.id.0));
        Ok(artifact)
    }

    fn owned_artifacts(&self) -> Result<Vec<OwnedArtifact>, ProgressionError> {
        Ok(self.state.owned.values().cloned().collect())
    }

    fn put_owned_artifact(&mut self, owned: &OwnedArtifact) -> Result<(), ProgressionError> {
        if !self.state.artifacts.contains_key(&owned.artifact_id) {
            return Err(ProgressionError::NotFound(format!(
                "artifact {}",
                owned.artifact_id
            )));
        }
        self.state.owned.insert(owned.artifact_id, owned.clone());
        self.touch(RecordKey::Owned(owned.artifact_id.0));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ProgressionError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ProgressionError::StorageError(e.to_string()))?;

        {
            let mut profiles = write_txn
                .open_table(PROFILES)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            let mut habits = write_txn
                .open_table(HABITS)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            let mut completions = write_txn
                .open_table(COMPLETIONS)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            let mut gates = write_txn
                .open_table(GATES)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            let mut artifacts = write_txn
                .open_table(ARTIFACTS)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            let mut owned = write_txn
                .open_table(OWNED)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            let mut meta = write_txn
                .open_table(METADATA)
                .map_err(|e| ProgressionError::StorageError(e.to_string()))?;

            for key in &self.dirty {
                match *key {
                    RecordKey::Profile(id) => write_record(
                        &mut profiles,
                        id,
                        self.state.profiles.get(&ProfileId(id)),
                    )?,
                    RecordKey::Habit(id) => {
                        write_record(&mut habits, id, self.state.habits.get(&HabitId(id)))?;
                    }
                    RecordKey::Completion(id) => write_record(
                        &mut completions,
                        id,
                        self.state.completions.get(&CompletionId(id)),
                    )?,
                    RecordKey::Gate(id) => {
                        write_record(&mut gates, id, self.state.gates.get(&GateId(id)))?;
                    }
                    RecordKey::Artifact(id) => write_record(
                        &mut artifacts,
                        id,
                        self.state.artifacts.get(&ArtifactId(id)),
                    )?,
                    RecordKey::Owned(id) => {
                        write_record(&mut owned, id, self.state.owned.get(&ArtifactId(id)))?;
                    }
                }
            }

            let counters = self.state.counters;
            for (key, value) in [
                (NEXT_HABIT_ID, counters.habit),
                (NEXT_COMPLETION_ID, counters.completion),
                (NEXT_GATE_ID, counters.gate),
                (NEXT_ARTIFACT_ID, counters.artifact),
            ] {
                meta.insert(key, value)
                    .map_err(|e| ProgressionError::StorageError(e.to_string()))?;
            }
        }

        write_txn
            .commit()
            .map_err(|e| ProgressionError::StorageError(e.to_string()))?;

        tracing::trace!(records = self.dirty.len(), "progression state committed");
        // Clear staged keys only after a successful commit.
        self.dirty.clear();
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), ProgressionError> {
        self.state = Self::load(&self.db)?;
        self.dirty.clear();
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
