//! Data models for mod-bisector.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`UserConfig`]: User settings loaded from `mod-bisector.yaml`
//! - [`HashIndex`]: Immutable hash → declaring files snapshot produced by a scan
//! - [`ScanReport`]: A scan's index plus the [`MalformedConfigWarning`]s for skipped files
//! - [`SessionSnapshot`]: Serializable form of a bisection session
//! - [`ModUnit`]: A discovered mod folder and its [`UnitStatus`]
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Plain data**: No file system access; services produce and consume them
//! - **Deterministic**: Ordered collections everywhere output is shown to the user
//! - **Immutable snapshots**: A [`HashIndex`] is rebuilt per scan, never patched

pub mod config;
pub mod hash_index;
pub mod session;

pub use config::{DEFAULT_DISABLED_PREFIX, DEFAULT_HASH_LENGTH, UserConfig};
pub use hash_index::{
    ConfigFile, HashIndex, HashShape, MalformedConfigWarning, ScanOptions, ScanReport,
};
pub use session::{ModUnit, Outcome, RoundRecord, SessionPhase, SessionSnapshot, UnitStatus};
