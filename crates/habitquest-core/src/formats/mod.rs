//! # Formats Module
//!
//! Decoders for data written by earlier releases.

pub mod legacy;

pub use legacy::{LegacyGateRecord, LegacyParser, MAX_LEGACY_IMPORT_SIZE};
