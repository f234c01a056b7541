//! # Gate Module
//!
//! The gate lifecycle and its condition/reward language.

mod condition;
mod engine;

pub use condition::{Condition, Reward};
pub use engine::{ClearOutcome, GateEngine, RefreshOutcome, UnlockReport};
