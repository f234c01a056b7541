//! Integration tests for the HabitQuest CLI.
//!
//! Commands are parsed with clap and executed against a temporary redb database,
//! then the resulting state is read back through the facade.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use habitquest::cli::{Cli, Commands, GateAction, HabitAction, execute, open};
use habitquest::config::Config;
use habitquest_core::primitives::MAX_ACTIVE_GATES;
use habitquest_core::{Frequency, GateStatus, ProgressionError, StatCategory};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Temporary database plus the config the CLI would run with.
struct Fixture {
    dir: TempDir,
    database: PathBuf,
    config: Config,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("habitquest.redb");
    let config = Config {
        seed: Some(7),
        utc_offset_minutes: Some(0),
        ..Config::default()
    };
    Fixture {
        dir,
        database,
        config,
    }
}

impl Fixture {
    /// Parse `args` as a command line and run it.
    fn run(&self, args: &[&str]) -> Result<(), ProgressionError> {
        let database = self.database.to_string_lossy().to_string();
        let mut argv = vec!["habitquest", "--quiet", "--database", database.as_str()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        execute(cli, self.config.clone())
    }

    fn config(&self) -> Config {
        Config {
            database: Some(self.database.clone()),
            ..self.config.clone()
        }
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

// =============================================================================
// PARSING TESTS
// =============================================================================

#[test]
fn test_parse_habit_add() {
    let cli = Cli::try_parse_from([
        "habitquest", "habit", "add", "-n", "Run", "-t", "body", "-x", "25", "-f", "weekly",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Habit {
            action:
                HabitAction::Add {
                    template,
                    name,
                    category,
                    xp,
                    frequency,
                },
        }) => {
            assert_eq!(template, None);
            assert_eq!(name.as_deref(), Some("Run"));
            assert_eq!(category, Some(StatCategory::Body));
            assert_eq!(xp, Some(25));
            assert_eq!(frequency, Some(Frequency::Weekly));
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_parse_rejects_unknown_category() {
    let result = Cli::try_parse_from([
        "habitquest", "habit", "add", "-n", "Run", "-t", "cardio", "-x", "25",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_parse_requires_fields_without_template() {
    assert!(Cli::try_parse_from(["habitquest", "habit", "add", "-n", "Run"]).is_err());
    assert!(
        Cli::try_parse_from(["habitquest", "habit", "add", "--template", "Meditate"]).is_ok()
    );
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["habitquest", "gate", "list", "--json-mode", "-D", "x.redb"])
        .unwrap();
    assert!(cli.json_mode);
    assert_eq!(cli.database, Some(PathBuf::from("x.redb")));
    assert!(matches!(
        cli.command,
        Some(Commands::Gate {
            action: GateAction::List { all: false }
        })
    ));
}

#[test]
fn test_no_subcommand_defaults_to_status() {
    let f = fixture();
    f.run(&[]).unwrap();
    assert!(f.database.exists());
}

// =============================================================================
// INIT TESTS
// =============================================================================

#[test]
fn test_init_creates_profile_and_gate() {
    let f = fixture();
    f.run(&["init"]).unwrap();

    let app = open(&f.config()).unwrap();
    assert_eq!(app.profile().unwrap().level, 1);
    let gates = app.gates().unwrap();
    assert_eq!(gates.len(), 1);
    assert_eq!(gates[0].status, GateStatus::Locked);
    assert_eq!(app.catalog().unwrap().len(), 4);
}

#[test]
fn test_init_refuses_existing_database_without_force() {
    let f = fixture();
    f.run(&["init"]).unwrap();
    f.run(&["mana", "add", "30"]).unwrap();

    assert!(matches!(
        f.run(&["init"]),
        Err(ProgressionError::InvalidInput(_))
    ));

    f.run(&["init", "--force"]).unwrap();
    let app = open(&f.config()).unwrap();
    assert_eq!(app.profile().unwrap().mana_crystals, 0);
}

// =============================================================================
// HABIT TESTS
// =============================================================================

#[test]
fn test_habit_add_complete_and_stats() {
    let f = fixture();
    f.run(&["habit", "add", "-n", "Squats", "-t", "body", "-x", "10"])
        .unwrap();
    f.run(&["habit", "complete", "1"]).unwrap();

    {
        let app = open(&f.config()).unwrap();
        let profile = app.profile().unwrap();
        assert_eq!(profile.xp, 10);
        let sheet = app.stat_points().unwrap();
        assert_eq!(sheet.get(habitquest_core::Attribute::Str), 6);
        assert_eq!(sheet.get(habitquest_core::Attribute::Agi), 4);
        assert_eq!(app.owned_artifacts().unwrap().len(), 1);
    }

    // The database lock is free again once the app above is dropped.
    f.run(&["stats", "--json-mode"]).unwrap();
    f.run(&["status"]).unwrap();
}

#[test]
fn test_habit_add_from_template() {
    let f = fixture();
    f.run(&["habit", "add", "--template", "weekly review"]).unwrap();
    f.run(&["habit", "add", "--template", "Meditate", "-x", "12"])
        .unwrap();

    let app = open(&f.config()).unwrap();
    let habits = app.habits().unwrap();
    assert_eq!(habits.len(), 2);
    assert_eq!(habits[0].name, "Weekly Review");
    assert_eq!(habits[0].category, StatCategory::Discipline);
    assert_eq!(habits[0].xp_value, 25);
    assert_eq!(habits[0].frequency, Frequency::Weekly);
    assert_eq!(habits[1].name, "Meditate");
    assert_eq!(habits[1].category, StatCategory::Wellbeing);
    assert_eq!(habits[1].xp_value, 12);
}

#[test]
fn test_habit_add_unknown_template_is_not_found() {
    let f = fixture();
    assert!(matches!(
        f.run(&["habit", "add", "--template", "Juggle"]),
        Err(ProgressionError::NotFound(_))
    ));
    f.run(&["habit", "templates", "--json-mode"]).unwrap();
}

#[test]
fn test_habit_complete_twice_same_day_fails() {
    let f = fixture();
    f.run(&["habit", "add", "-n", "Read", "-t", "mind", "-x", "15"])
        .unwrap();
    f.run(&["habit", "complete", "1"]).unwrap();

    assert!(matches!(
        f.run(&["habit", "complete", "1"]),
        Err(ProgressionError::AlreadyCompleted(_))
    ));
    let app = open(&f.config()).unwrap();
    assert_eq!(app.profile().unwrap().xp, 15);
}

#[test]
fn test_habit_add_zero_xp_is_invalid() {
    let f = fixture();
    assert!(matches!(
        f.run(&["habit", "add", "-n", "Nothing", "-t", "other", "-x", "0"]),
        Err(ProgressionError::InvalidInput(_))
    ));
}

#[test]
fn test_habit_delete_unknown_is_not_found() {
    let f = fixture();
    assert!(matches!(
        f.run(&["habit", "delete", "42"]),
        Err(ProgressionError::NotFound(_))
    ));
}

// =============================================================================
// GATE TESTS
// =============================================================================

#[test]
fn test_gate_analyze_without_mana_fails() {
    let f = fixture();
    f.run(&["init"]).unwrap();

    let id = open(&f.config()).unwrap().gates().unwrap()[0].id.0.to_string();
    assert!(matches!(
        f.run(&["gate", "analyze", &id]),
        Err(ProgressionError::InsufficientResources { .. })
    ));
}

#[test]
fn test_gate_analyze_and_refresh() {
    let f = fixture();
    f.run(&["init"]).unwrap();
    f.run(&["mana", "add", "15"]).unwrap();

    let id = open(&f.config()).unwrap().gates().unwrap()[0].id.0.to_string();
    f.run(&["gate", "analyze", &id]).unwrap();
    f.run(&["gate", "refresh", &id]).unwrap();

    {
        let app = open(&f.config()).unwrap();
        let profile = app.profile().unwrap();
        assert_eq!(profile.mana_crystals, 0);
        assert_eq!(profile.total_mana_spent, 15);

        // Opening for the refresh found no Locked gate and bootstrapped one, then the
        // refresh spawned the replacement.
        let gates = app.gates().unwrap();
        assert_eq!(gates.len(), 2);
        assert!(gates.iter().all(|g| g.id.0.to_string() != id));
        assert!(gates.iter().all(|g| g.status == GateStatus::Locked));
        let active = gates.iter().filter(|g| g.status.is_active()).count();
        assert!(active <= MAX_ACTIVE_GATES);
    }

    f.run(&["gate", "list", "--all", "--json-mode"]).unwrap();
    f.run(&["gate", "unlocks"]).unwrap();
}

// =============================================================================
// ARTIFACT / RESET TESTS
// =============================================================================

#[test]
fn test_artifact_equip_requires_ownership() {
    let f = fixture();
    f.run(&["init"]).unwrap();
    assert!(matches!(
        f.run(&["artifact", "equip", "1"]),
        Err(ProgressionError::NotFound(_))
    ));
    f.run(&["artifact", "list"]).unwrap();
}

#[test]
fn test_reset_requires_confirmation() {
    let f = fixture();
    f.run(&["habit", "add", "-n", "Run", "-t", "body", "-x", "40"])
        .unwrap();
    f.run(&["habit", "complete", "1"]).unwrap();

    assert!(matches!(
        f.run(&["reset"]),
        Err(ProgressionError::InvalidInput(_))
    ));
    f.run(&["reset", "--yes"]).unwrap();

    let app = open(&f.config()).unwrap();
    assert_eq!(app.profile().unwrap().xp, 0);
    assert_eq!(app.habits().unwrap().len(), 1);
    assert_eq!(app.habits().unwrap()[0].streak, 0);
}

// =============================================================================
// IMPORT TESTS
// =============================================================================

#[test]
fn test_import_legacy_gates() {
    let f = fixture();
    f.run(&["init"]).unwrap();
    let file = write_file(
        f.dir.path(),
        "gates.json",
        r#"[
            {
                "gateRank": "C",
                "gateType": "Standard",
                "status": "Cleared",
                "clearConditionDescription": "Reach Level 5",
                "rewardDescription": "200 XP, 60 Mana Crystals",
                "statusChangeDate": "2024-05-01T10:00:00Z"
            },
            {
                "gateRank": "Z",
                "gateType": "Standard",
                "status": "Locked",
                "clearConditionDescription": null,
                "rewardDescription": null,
                "statusChangeDate": "2024-05-01T10:00:00Z"
            }
        ]"#,
    );

    f.run(&["import-legacy", "-f", &file.to_string_lossy()])
        .unwrap();

    let app = open(&f.config()).unwrap();
    let cleared: Vec<_> = app
        .gates()
        .unwrap()
        .into_iter()
        .filter(|g| g.status == GateStatus::Cleared)
        .collect();
    assert_eq!(cleared.len(), 1);
    assert_eq!(
        cleared[0].reward.as_ref().map(|r| (r.xp, r.mana_crystals)),
        Some((200, 60))
    );
}

#[test]
fn test_import_legacy_rejects_malformed_json() {
    let f = fixture();
    let file = write_file(f.dir.path(), "bad.json", "{ not json");
    assert!(matches!(
        f.run(&["import-legacy", "-f", &file.to_string_lossy()]),
        Err(ProgressionError::SerializationError(_))
    ));
}

#[test]
fn test_import_legacy_missing_file() {
    let f = fixture();
    let missing = f.dir.path().join("missing.json");
    assert!(matches!(
        f.run(&["import-legacy", "-f", &missing.to_string_lossy()]),
        Err(ProgressionError::IoError(_))
    ));
}

// =============================================================================
// COMPACT TESTS
// =============================================================================

#[test]
fn test_compact_keeps_state() {
    let f = fixture();
    f.run(&["habit", "add", "-n", "Run", "-t", "body", "-x", "40"])
        .unwrap();
    f.run(&["habit", "complete", "1"]).unwrap();
    f.run(&["reset", "--yes"]).unwrap();

    f.run(&["compact", "--json-mode"]).unwrap();

    let app = open(&f.config()).unwrap();
    assert_eq!(app.habits().unwrap().len(), 1);
    assert_eq!(app.profile().unwrap().xp, 0);
}

#[test]
fn test_compact_missing_database_is_not_found() {
    let f = fixture();
    assert!(matches!(
        f.run(&["compact"]),
        Err(ProgressionError::NotFound(_))
    ));
    assert!(!f.database.exists());
}
