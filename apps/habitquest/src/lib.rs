//! # habitquest
//!
//! Command-line front end for the HabitQuest progression engine.
//!
//! - `cli`: clap command tree and command implementations
//! - `config`: `habitquest.toml` and `HABITQUEST_*` environment settings

pub mod cli;
pub mod config;
