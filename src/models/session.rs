use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a bisection session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Configuring,
    Active,
    Resolved,
    Abandoned,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Abandoned)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuring => "configuring",
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

/// What the user observed with the round's half disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The error went away: the culprit is in the disabled half
    Pass,
    /// The error still reproduces: the culprit is in the half left active
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("pass"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

/// One completed round: the units that were disabled and the reported outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub disabled: Vec<String>,
    pub outcome: Outcome,
}

/// Persisted form of a session, written after each round for crash recovery.
///
/// An open round is never persisted; a restored session resumes between rounds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub excluded: Vec<String>,
    pub remaining: Vec<String>,
    pub history: Vec<RoundRecord>,
}

/// Membership of a mod unit at discovery time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Active,
    Disabled,
    Excluded,
}

/// An independently toggleable mod folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModUnit {
    /// Folder path relative to the mods root, `/` separated
    pub id: String,
    /// Folder path on disk
    pub path: Utf8PathBuf,
    pub status: UnitStatus,
}
