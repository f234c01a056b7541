//! # HabitQuest CLI Module
//!
//! This module implements the CLI interface for HabitQuest.
//!
//! ## Available Commands
//!
//! - `init` - Create the database, profile and first gate
//! - `status` - Show level, rank, mana and streak
//! - `habit` - Add (optionally from a template), list, complete and delete habits
//! - `gate` - List, analyze, clear and refresh gates; re-check unlocks
//! - `stats` - Show the attribute sheet and streaks
//! - `artifact` - List, equip and unequip artifacts
//! - `mana` - Grant mana crystals
//! - `reset` - Start the progression over
//! - `import-legacy` - Import gates exported by earlier releases
//! - `compact` - Reclaim space in the database file

mod commands;

use crate::config::Config;
use clap::{Parser, Subcommand};
use habitquest_core::{Frequency, ProgressionError, StatCategory};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// HabitQuest - level up by keeping your habits
///
/// Completing habits earns experience, mana crystals open gates, and every
/// completion feeds a five-attribute stat sheet.
#[derive(Parser, Debug)]
#[command(name = "habitquest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a habitquest.toml config file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the progression database (overrides config and environment)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new database
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Show level, rank, mana and streak
    Status,

    /// Manage habits
    Habit {
        #[command(subcommand)]
        action: HabitAction,
    },

    /// Manage gates
    Gate {
        #[command(subcommand)]
        action: GateAction,
    },

    /// Show the attribute sheet and streaks
    Stats,

    /// Manage artifacts
    Artifact {
        #[command(subcommand)]
        action: ArtifactAction,
    },

    /// Manage mana crystals
    Mana {
        #[command(subcommand)]
        action: ManaAction,
    },

    /// Reset level, history and gates (habits and artifacts are kept)
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Import gates from a legacy JSON export
    ImportLegacy {
        /// Path to the JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Compact the database file
    Compact,
}

/// Habit subcommands.
#[derive(Subcommand, Debug)]
pub enum HabitAction {
    /// Add a habit, from scratch or from a template
    Add {
        /// Start from a predefined habit (see `habit templates`)
        #[arg(long)]
        template: Option<String>,

        /// Habit name
        #[arg(short, long, required_unless_present = "template")]
        name: Option<String>,

        /// Category (Body, Mind, Skill, Discipline, Wellbeing, Other)
        #[arg(short = 't', long, required_unless_present = "template")]
        category: Option<StatCategory>,

        /// Experience awarded per completion
        #[arg(short, long, required_unless_present = "template")]
        xp: Option<u64>,

        /// Frequency (daily, weekly) [default: daily]
        #[arg(short, long)]
        frequency: Option<Frequency>,
    },

    /// List the predefined habit templates
    Templates,

    /// List habits
    List {
        /// Only habits not completed in their current period
        #[arg(long)]
        due: bool,
    },

    /// Complete a habit for today
    Complete {
        /// Habit ID
        id: u64,
    },

    /// Delete a habit (its history is kept)
    Delete {
        /// Habit ID
        id: u64,
    },
}

/// Gate subcommands.
#[derive(Subcommand, Debug)]
pub enum GateAction {
    /// List gates
    List {
        /// Include cleared gates
        #[arg(short, long)]
        all: bool,
    },

    /// Reveal a Locked gate's condition and reward (10 mana)
    Analyze {
        /// Gate ID
        id: u64,
    },

    /// Clear an Analyzed gate whose condition is met
    Clear {
        /// Gate ID
        id: u64,
    },

    /// Replace a gate (2 mana Locked, 5 mana Analyzed)
    Refresh {
        /// Gate ID
        id: u64,
    },

    /// Re-check rank unlocks and fill empty gate slots
    Unlocks,
}

/// Artifact subcommands.
#[derive(Subcommand, Debug)]
pub enum ArtifactAction {
    /// List the catalog and owned artifacts
    List,

    /// Equip an owned artifact
    Equip {
        /// Artifact ID
        id: u64,
    },

    /// Unequip an owned artifact
    Unequip {
        /// Artifact ID
        id: u64,
    },
}

/// Mana subcommands.
#[derive(Subcommand, Debug)]
pub enum ManaAction {
    /// Grant mana crystals
    Add {
        /// Amount to grant
        amount: u64,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and the merged config.
pub fn execute(cli: Cli, mut config: Config) -> Result<(), ProgressionError> {
    if let Some(database) = cli.database {
        config.database = Some(database);
    }
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&config, json_mode, force),
        Some(Commands::Status) | None => cmd_status(&open(&config)?, json_mode),
        Some(Commands::Habit {
            action: HabitAction::Templates,
        }) => cmd_habit_templates(json_mode),
        Some(Commands::Habit { action }) => {
            let mut app = open(&config)?;
            match action {
                HabitAction::Add {
                    template,
                    name,
                    category,
                    xp,
                    frequency,
                } => {
                    let new =
                        resolve_new_habit(template.as_deref(), name, category, xp, frequency)?;
                    cmd_habit_add(&mut app, json_mode, new)
                }
                HabitAction::Templates => cmd_habit_templates(json_mode),
                HabitAction::List { due } => cmd_habit_list(&app, json_mode, due),
                HabitAction::Complete { id } => cmd_habit_complete(&mut app, json_mode, id),
                HabitAction::Delete { id } => cmd_habit_delete(&mut app, json_mode, id),
            }
        }
        Some(Commands::Gate { action }) => {
            let mut app = open(&config)?;
            match action {
                GateAction::List { all } => cmd_gate_list(&app, json_mode, all),
                GateAction::Analyze { id } => cmd_gate_analyze(&mut app, json_mode, id),
                GateAction::Clear { id } => cmd_gate_clear(&mut app, json_mode, id),
                GateAction::Refresh { id } => cmd_gate_refresh(&mut app, json_mode, id),
                GateAction::Unlocks => cmd_gate_unlocks(&mut app, json_mode),
            }
        }
        Some(Commands::Stats) => cmd_stats(&open(&config)?, json_mode),
        Some(Commands::Artifact { action }) => {
            let mut app = open(&config)?;
            match action {
                ArtifactAction::List => cmd_artifact_list(&app, json_mode),
                ArtifactAction::Equip { id } => cmd_artifact_equip(&mut app, json_mode, id, true),
                ArtifactAction::Unequip { id } => {
                    cmd_artifact_equip(&mut app, json_mode, id, false)
                }
            }
        }
        Some(Commands::Mana {
            action: ManaAction::Add { amount },
        }) => cmd_mana_add(&mut open(&config)?, json_mode, amount),
        Some(Commands::Reset { yes }) => cmd_reset(&mut open(&config)?, json_mode, yes),
        Some(Commands::ImportLegacy { file }) => {
            cmd_import_legacy(&mut open(&config)?, json_mode, &file)
        }
        Some(Commands::Compact) => cmd_compact(&config, json_mode),
    }
}
