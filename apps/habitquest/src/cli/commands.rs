//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::Config;
use habitquest_core::{
    ArtifactId, Attribute, Frequency, Gate, GateId, HABIT_TEMPLATES, Habit, HabitId,
    HabitTemplate, LegacyGateRecord, MAX_LEGACY_IMPORT_SIZE, NewHabit, Progression,
    ProgressionError, RedbStore, StatCategory, SystemClock, find_template,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// The facade as the CLI runs it: on disk, wall clock, seeded or entropy RNG.
pub type App = Progression<RedbStore, StdRng, SystemClock>;

// =============================================================================
// SETUP
// =============================================================================

/// Open (or create) the database named by `config`.
pub fn open(config: &Config) -> Result<App, ProgressionError> {
    let path = config.database_or_default();
    let store = RedbStore::open(&path)?;
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let clock = match config.utc_offset()? {
        Some(offset) => SystemClock::with_offset(offset),
        None => SystemClock::new(),
    };
    tracing::debug!(
        database = %path.display(),
        seeded = config.seed.is_some(),
        "opening progression"
    );
    Progression::open(store, rng, clock)
}

/// Validate file path for import.
///
/// Canonicalizes the path and requires a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, ProgressionError> {
    let canonical = path.canonicalize().map_err(|e| {
        ProgressionError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(ProgressionError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), ProgressionError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| ProgressionError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(ProgressionError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn habit_json(habit: &Habit) -> Value {
    json!({
        "id": habit.id.0,
        "name": habit.name,
        "category": habit.category.name(),
        "xp_value": habit.xp_value,
        "frequency": habit.frequency.to_string(),
        "streak": habit.streak,
        "last_completed": habit.last_completed.map(|d| d.to_string()),
    })
}

fn gate_json(gate: &Gate) -> Value {
    json!({
        "id": gate.id.0,
        "rank": gate.rank.to_string(),
        "kind": gate.kind.to_string(),
        "status": gate.status.to_string(),
        "condition": gate.condition.as_ref().map(|c| c.to_string()),
        "reward": gate.reward.as_ref().map(|r| r.to_string()),
        "status_changed_at": gate.status_changed_at.to_rfc3339(),
    })
}

fn print_gate(gate: &Gate) {
    println!(
        "  #{:<4} {}-Rank {:<8} {}",
        gate.id, gate.rank, gate.kind, gate.status
    );
    if let Some(condition) = &gate.condition {
        println!("         Condition: {}", condition);
    }
    if let Some(reward) = &gate.reward {
        println!("         Reward:    {}", reward);
    }
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the database, profile, artifact catalog and first gate.
pub fn cmd_init(config: &Config, json_mode: bool, force: bool) -> Result<(), ProgressionError> {
    let path = config.database_or_default();

    if path.exists() {
        if !force {
            return Err(ProgressionError::InvalidInput(format!(
                "Database '{}' already exists (use --force to replace it)",
                path.display()
            )));
        }
        std::fs::remove_file(&path).map_err(|e| {
            ProgressionError::IoError(format!("Cannot remove '{}': {}", path.display(), e))
        })?;
        tracing::info!(database = %path.display(), "existing database removed");
    }

    let app = open(config)?;
    let gates = app.gates()?;

    if json_mode {
        print_json(&json!({
            "database": path.to_string_lossy(),
            "gates": gates.iter().map(gate_json).collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    println!("Initialized database at {}", path.display());
    println!("A gate has appeared:");
    for gate in &gates {
        print_gate(gate);
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show level, rank, mana and streak.
pub fn cmd_status(app: &App, json_mode: bool) -> Result<(), ProgressionError> {
    let profile = app.profile()?;
    let progress = app.progress()?;
    let rank = app.hunter_rank()?;
    let streak = app.overall_streak()?;
    let due = app.due_habits()?.len();
    let active_gates = app
        .gates()?
        .iter()
        .filter(|g| g.status.is_active())
        .count();

    if json_mode {
        print_json(&json!({
            "level": profile.level,
            "xp": profile.xp,
            "xp_needed": progress.needed_xp,
            "progress_per_mille": progress.per_mille,
            "rank": rank.to_string(),
            "title": profile.title,
            "job": profile.job,
            "essence": profile.essence_state.to_string(),
            "mana_crystals": profile.mana_crystals,
            "total_mana_spent": profile.total_mana_spent,
            "overall_streak": streak,
            "due_habits": due,
            "active_gates": active_gates,
        }));
        return Ok(());
    }

    println!("HabitQuest Status");
    println!("=================");
    println!("Level:    {} ({}-Rank Hunter)", profile.level, rank);
    println!(
        "XP:       {} / {} ({}.{}%)",
        progress.current_xp,
        progress.needed_xp,
        progress.per_mille / 10,
        progress.per_mille % 10
    );
    println!("Title:    {}", profile.title);
    println!("Job:      {}", profile.job);
    println!("Essence:  {}", profile.essence_state);
    println!("Mana:     {}", profile.mana_crystals);
    println!("Streak:   {} days", streak);
    println!();
    println!("Due habits:   {}", due);
    println!("Active gates: {}", active_gates);

    Ok(())
}

// =============================================================================
// HABIT COMMANDS
// =============================================================================

/// Build the habit to add from a template and/or explicit fields.
///
/// Explicit fields override the template's. Without a template, name, category and
/// xp are required; frequency defaults to daily.
pub fn resolve_new_habit(
    template: Option<&str>,
    name: Option<String>,
    category: Option<StatCategory>,
    xp: Option<u64>,
    frequency: Option<Frequency>,
) -> Result<NewHabit, ProgressionError> {
    let base = template
        .map(|wanted| {
            find_template(wanted)
                .map(HabitTemplate::new_habit)
                .ok_or_else(|| ProgressionError::NotFound(format!("habit template '{}'", wanted)))
        })
        .transpose()?;
    let missing = |field: &str| {
        ProgressionError::InvalidInput(format!("--{} is required without --template", field))
    };

    Ok(NewHabit {
        name: match name {
            Some(name) => name,
            None => base.as_ref().map(|b| b.name.clone()).ok_or_else(|| missing("name"))?,
        },
        category: category
            .or(base.as_ref().map(|b| b.category))
            .ok_or_else(|| missing("category"))?,
        xp_value: xp
            .or(base.as_ref().map(|b| b.xp_value))
            .ok_or_else(|| missing("xp"))?,
        frequency: frequency
            .or(base.as_ref().map(|b| b.frequency))
            .unwrap_or(Frequency::Daily),
    })
}

/// Add a habit.
pub fn cmd_habit_add(
    app: &mut App,
    json_mode: bool,
    new: NewHabit,
) -> Result<(), ProgressionError> {
    let habit = app.add_habit(new)?;

    if json_mode {
        print_json(&habit_json(&habit));
        return Ok(());
    }

    println!(
        "Added habit #{} '{}' ({}, {} XP, {})",
        habit.id, habit.name, habit.category, habit.xp_value, habit.frequency
    );
    Ok(())
}

/// List habits.
pub fn cmd_habit_list(app: &App, json_mode: bool, due: bool) -> Result<(), ProgressionError> {
    let habits = if due { app.due_habits()? } else { app.habits()? };

    if json_mode {
        print_json(&Value::Array(habits.iter().map(habit_json).collect()));
        return Ok(());
    }

    if habits.is_empty() {
        println!("No habits");
        return Ok(());
    }
    for habit in &habits {
        println!(
            "  #{:<4} {:<24} {:<10} {:>4} XP  {:<6} streak {}",
            habit.id, habit.name, habit.category, habit.xp_value, habit.frequency, habit.streak
        );
    }
    Ok(())
}

/// List the predefined habits.
pub fn cmd_habit_templates(json_mode: bool) -> Result<(), ProgressionError> {
    if json_mode {
        print_json(&Value::Array(
            HABIT_TEMPLATES
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "category": t.category.name(),
                        "xp_value": t.xp_value,
                        "frequency": t.frequency.to_string(),
                    })
                })
                .collect(),
        ));
        return Ok(());
    }

    for template in HABIT_TEMPLATES {
        println!(
            "  {:<24} {:<10} {:>4} XP  {}",
            template.name, template.category, template.xp_value, template.frequency
        );
        println!("         {}", template.description);
    }
    Ok(())
}

/// Complete a habit for today.
pub fn cmd_habit_complete(app: &mut App, json_mode: bool, id: u64) -> Result<(), ProgressionError> {
    let outcome = app.complete_habit(HabitId(id))?;

    if json_mode {
        print_json(&json!({
            "habit": habit_json(&outcome.habit),
            "xp_awarded": outcome.xp_awarded,
            "new_level": outcome.new_level,
            "awarded": outcome.awarded.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            "spawned_gate": outcome.spawned.map(|g| g.0),
        }));
        return Ok(());
    }

    println!(
        "Completed '{}' (+{} XP, streak {})",
        outcome.habit.name, outcome.xp_awarded, outcome.habit.streak
    );
    if let Some(level) = outcome.new_level {
        println!("LEVEL UP! You are now level {}", level);
    }
    for artifact in &outcome.awarded {
        println!("Artifact acquired: {} ({})", artifact.name, artifact.rarity);
    }
    if let Some(gate) = outcome.spawned {
        println!("A new gate appeared: #{}", gate);
    }
    Ok(())
}

/// Delete a habit.
pub fn cmd_habit_delete(app: &mut App, json_mode: bool, id: u64) -> Result<(), ProgressionError> {
    app.delete_habit(HabitId(id))?;

    if json_mode {
        print_json(&json!({ "deleted": id }));
    } else {
        println!("Deleted habit #{}", id);
    }
    Ok(())
}

// =============================================================================
// GATE COMMANDS
// =============================================================================

/// List gates.
pub fn cmd_gate_list(app: &App, json_mode: bool, all: bool) -> Result<(), ProgressionError> {
    let gates: Vec<Gate> = app
        .gates()?
        .into_iter()
        .filter(|g| all || g.status.is_active())
        .collect();

    if json_mode {
        print_json(&Value::Array(gates.iter().map(gate_json).collect()));
        return Ok(());
    }

    if gates.is_empty() {
        println!("No gates");
        return Ok(());
    }
    for gate in &gates {
        print_gate(gate);
    }
    Ok(())
}

/// Analyze a Locked gate.
pub fn cmd_gate_analyze(app: &mut App, json_mode: bool, id: u64) -> Result<(), ProgressionError> {
    let gate = app.analyze_gate(GateId(id))?;

    if json_mode {
        print_json(&gate_json(&gate));
        return Ok(());
    }

    println!("Gate #{} analyzed", gate.id);
    print_gate(&gate);
    Ok(())
}

/// Clear an Analyzed gate.
pub fn cmd_gate_clear(app: &mut App, json_mode: bool, id: u64) -> Result<(), ProgressionError> {
    let outcome = app.clear_gate(GateId(id))?;

    if json_mode {
        print_json(&json!({
            "gate": outcome.gate.0,
            "reward": outcome.reward.to_string(),
            "xp": outcome.reward.xp,
            "mana_granted": outcome.mana_granted,
            "title": outcome.reward.title,
            "new_level": outcome.new_level,
            "replacement_spawned": outcome.replacement.is_some(),
        }));
        return Ok(());
    }

    println!("Gate #{} cleared!", outcome.gate);
    println!("  +{} XP", outcome.reward.xp);
    println!("  +{} Mana Crystals", outcome.mana_granted);
    if let Some(title) = &outcome.reward.title {
        println!("  Title earned: {}", title);
    }
    if let Some(level) = outcome.new_level {
        println!("LEVEL UP! You are now level {}", level);
    }
    if let Some(spawn) = outcome.replacement {
        println!("A new {}-Rank gate appeared", spawn.rank);
    }
    Ok(())
}

/// Refresh a gate.
pub fn cmd_gate_refresh(app: &mut App, json_mode: bool, id: u64) -> Result<(), ProgressionError> {
    let outcome = app.refresh_gate(GateId(id))?;

    if json_mode {
        print_json(&json!({
            "removed": outcome.removed.0,
            "cost": outcome.cost,
            "replacement_spawned": outcome.replacement.is_some(),
        }));
        return Ok(());
    }

    println!(
        "Gate #{} refreshed for {} Mana Crystals",
        outcome.removed, outcome.cost
    );
    if let Some(spawn) = outcome.replacement {
        println!("A new {}-Rank gate appeared", spawn.rank);
    }
    Ok(())
}

/// Re-check rank unlocks.
pub fn cmd_gate_unlocks(app: &mut App, json_mode: bool) -> Result<(), ProgressionError> {
    let report = app.check_unlocks()?;
    let ranks: Vec<String> = report
        .available_ranks
        .iter()
        .map(|r| r.to_string())
        .collect();

    if json_mode {
        print_json(&json!({
            "available_ranks": ranks,
            "spawned": report.spawned.map(|s| s.rank.to_string()),
        }));
        return Ok(());
    }

    println!("Unlocked ranks: {}", ranks.join(", "));
    if let Some(spawn) = report.spawned {
        println!("A new {}-Rank gate appeared", spawn.rank);
    }
    Ok(())
}

// =============================================================================
// STATS COMMAND
// =============================================================================

/// Show the attribute sheet and streaks.
pub fn cmd_stats(app: &App, json_mode: bool) -> Result<(), ProgressionError> {
    let sheet = app.stat_points()?;
    let snapshot = app.snapshot()?;

    if json_mode {
        let attributes: serde_json::Map<String, Value> = sheet
            .iter()
            .map(|(attr, points)| (attr.code().to_string(), json!(points)))
            .collect();
        let categories: Vec<Value> = StatCategory::ALL
            .iter()
            .map(|c| {
                json!({
                    "category": c.name(),
                    "completions": snapshot.category_completions(*c),
                    "streak": snapshot.category_streak(*c),
                })
            })
            .collect();
        print_json(&json!({
            "attributes": attributes,
            "total_points": sheet.total(),
            "overall_streak": snapshot.overall_streak,
            "total_completions": snapshot.total_completions,
            "categories": categories,
        }));
        return Ok(());
    }

    println!("Attributes");
    println!("==========");
    for attribute in Attribute::ALL {
        println!(
            "  {} {:<12} {}",
            attribute.code(),
            attribute.name(),
            sheet.get(attribute)
        );
    }
    println!();
    println!("Overall streak:    {} days", snapshot.overall_streak);
    println!("Total completions: {}", snapshot.total_completions);
    println!();
    println!("  {:<12} {:>11} {:>7}", "Category", "Completions", "Streak");
    for category in StatCategory::ALL {
        println!(
            "  {:<12} {:>11} {:>7}",
            category.name(),
            snapshot.category_completions(category),
            snapshot.category_streak(category)
        );
    }
    Ok(())
}

// =============================================================================
// ARTIFACT COMMANDS
// =============================================================================

/// List the catalog with ownership.
pub fn cmd_artifact_list(app: &App, json_mode: bool) -> Result<(), ProgressionError> {
    let catalog = app.catalog()?;
    let owned = app.owned_artifacts()?;

    if json_mode {
        let rows: Vec<Value> = catalog
            .iter()
            .map(|a| {
                let entry = owned.iter().find(|o| o.artifact_id == a.id);
                json!({
                    "id": a.id.0,
                    "name": a.name,
                    "description": a.description,
                    "rarity": a.rarity.to_string(),
                    "boost_category": a.boost_category.map(|c| c.name()),
                    "boost": a.boost_magnitude.to_string(),
                    "owned": entry.is_some(),
                    "equipped": entry.is_some_and(|o| o.equipped),
                })
            })
            .collect();
        print_json(&Value::Array(rows));
        return Ok(());
    }

    for artifact in &catalog {
        let marker = match owned.iter().find(|o| o.artifact_id == artifact.id) {
            Some(o) if o.equipped => "[equipped]",
            Some(_) => "[owned]",
            None => "",
        };
        println!(
            "  #{:<3} {:<24} {:<9} {}",
            artifact.id, artifact.name, artifact.rarity, marker
        );
        println!("       {}", artifact.description);
        if let Some(category) = artifact.boost_category {
            println!("       +{} {}", artifact.boost_magnitude, category);
        }
    }
    Ok(())
}

/// Equip or unequip an owned artifact.
pub fn cmd_artifact_equip(
    app: &mut App,
    json_mode: bool,
    id: u64,
    equipped: bool,
) -> Result<(), ProgressionError> {
    let owned = app.equip_artifact(ArtifactId(id), equipped)?;

    if json_mode {
        print_json(&json!({
            "artifact": owned.artifact_id.0,
            "equipped": owned.equipped,
        }));
        return Ok(());
    }

    let verb = if owned.equipped { "Equipped" } else { "Unequipped" };
    println!("{} artifact #{}", verb, owned.artifact_id);
    Ok(())
}

// =============================================================================
// MANA / RESET COMMANDS
// =============================================================================

/// Grant mana crystals.
pub fn cmd_mana_add(app: &mut App, json_mode: bool, amount: u64) -> Result<(), ProgressionError> {
    let profile = app.add_mana(amount)?;

    if json_mode {
        print_json(&json!({ "mana_crystals": profile.mana_crystals }));
    } else {
        println!("+{} Mana Crystals (now {})", amount, profile.mana_crystals);
    }
    Ok(())
}

/// Reset level, history and gates.
pub fn cmd_reset(app: &mut App, json_mode: bool, yes: bool) -> Result<(), ProgressionError> {
    if !yes {
        return Err(ProgressionError::InvalidInput(
            "reset discards level, history and gates; pass --yes to confirm".to_string(),
        ));
    }
    let profile = app.reset()?;

    if json_mode {
        print_json(&json!({ "level": profile.level, "xp": profile.xp }));
    } else {
        println!("Progression reset. Back to level {}.", profile.level);
    }
    Ok(())
}

// =============================================================================
// COMPACT COMMAND
// =============================================================================

/// Compact the database file.
pub fn cmd_compact(config: &Config, json_mode: bool) -> Result<(), ProgressionError> {
    let path = config.database_or_default();
    if !path.exists() {
        return Err(ProgressionError::NotFound(format!(
            "database '{}'",
            path.display()
        )));
    }

    let before = file_len(&path)?;
    let mut store = RedbStore::open(&path)?;
    store.compact()?;
    drop(store);
    let after = file_len(&path)?;
    tracing::info!(database = %path.display(), before, after, "database compacted");

    if json_mode {
        print_json(&json!({
            "database": path.to_string_lossy(),
            "bytes_before": before,
            "bytes_after": after,
        }));
    } else {
        println!("Compacted {} ({} -> {} bytes)", path.display(), before, after);
    }
    Ok(())
}

fn file_len(path: &Path) -> Result<u64, ProgressionError> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| ProgressionError::IoError(format!("Cannot read file metadata: {}", e)))
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import gates from a legacy JSON export.
pub fn cmd_import_legacy(
    app: &mut App,
    json_mode: bool,
    file: &Path,
) -> Result<(), ProgressionError> {
    tracing::info!("Importing legacy gates from {:?}", file);

    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_LEGACY_IMPORT_SIZE as u64)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| ProgressionError::IoError(format!("Read file: {}", e)))?;
    let records: Vec<LegacyGateRecord> = serde_json::from_slice(&contents)
        .map_err(|e| ProgressionError::SerializationError(format!("Legacy gates: {}", e)))?;

    let report = app.import_legacy_gates(&records)?;

    if json_mode {
        print_json(&json!({
            "imported": report.imported.iter().map(|g| g.0).collect::<Vec<_>>(),
            "skipped": report.skipped,
        }));
        return Ok(());
    }

    println!(
        "Imported {} gates ({} skipped)",
        report.imported.len(),
        report.skipped
    );
    Ok(())
}
