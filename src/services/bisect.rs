//! Binary-search elimination over a set of mod units.
//!
//! The session is a small explicit state machine:
//!
//! ```text
//! Configuring --start--> Active --(one unit left)--> Resolved
//!      |                   |
//!      +----abandon--------+------abandon-----------> Abandoned
//! ```
//!
//! Each round disables the first `ceil(n/2)` remaining units. The user then
//! reports whether the error still occurs:
//!
//! - [`Outcome::Fail`]: the error survived with the half disabled, so the
//!   culprit is in the half that stayed active and the disabled half is dropped.
//! - [`Outcome::Pass`]: the error went away, so the culprit is in the disabled half.
//!
//! Both halves are non-empty whenever `n >= 2`, so every round strictly shrinks
//! the candidate list and the search ends in at most `ceil(log2(n))` rounds.
//!
//! The session never touches the file system. Applying a round is the job of a
//! [`MoveExecutor`](crate::services::mover::MoveExecutor), see
//! [`RoundDriver`](crate::services::driver::RoundDriver).

use crate::models::{Outcome, RoundRecord, SessionPhase, SessionSnapshot};
use indexmap::IndexSet;
use thiserror::Error;

/// Errors from session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No candidates remain after excluding {excluded} mod(s)")]
    EmptyCandidateSet { excluded: usize },

    #[error("Cannot {operation}: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: String,
    },

    #[error("Invalid checkpoint: {0}")]
    InvalidCheckpoint(String),
}

/// Result of [`BinarySearchSession::begin_round`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundStart {
    /// Disable these units and report the outcome
    Round(Vec<String>),
    /// Only one candidate was left; no round is needed
    Resolved(String),
}

#[derive(Debug, Clone)]
struct OpenRound {
    units: Vec<String>,
    move_failed: bool,
}

/// Stateful elimination engine for one search.
#[derive(Debug, Clone)]
pub struct BinarySearchSession {
    phase: SessionPhase,
    excluded: IndexSet<String>,
    remaining: Vec<String>,
    history: Vec<RoundRecord>,
    current_round: Option<OpenRound>,
}

impl BinarySearchSession {
    /// Create a session in the `Configuring` phase
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Configuring,
            excluded: IndexSet::new(),
            remaining: Vec::new(),
            history: Vec::new(),
            current_round: None,
        }
    }

    /// Worst-case number of rounds for `n` candidates: `ceil(log2(n))`
    pub fn max_rounds(n: usize) -> u32 {
        if n <= 1 {
            0
        } else {
            usize::BITS - (n - 1).leading_zeros()
        }
    }

    /// Add units to the exclusion list. Only allowed before the search starts.
    pub fn exclude<I, S>(&mut self, units: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_phase("change exclusions", SessionPhase::Configuring)?;
        self.excluded.extend(units.into_iter().map(Into::into));
        Ok(())
    }

    /// Start the search over `all_units` minus `excluded`.
    ///
    /// Duplicates are dropped keeping the first appearance. On
    /// `EmptyCandidateSet` the session stays in `Configuring`.
    pub fn start<I, J, S, T>(&mut self, all_units: I, excluded: J) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        self.require_phase("start", SessionPhase::Configuring)?;

        let mut excluded_set = self.excluded.clone();
        excluded_set.extend(excluded.into_iter().map(Into::into));

        let remaining: IndexSet<String> = all_units
            .into_iter()
            .map(Into::into)
            .filter(|unit| !excluded_set.contains(unit))
            .collect();

        if remaining.is_empty() {
            return Err(SessionError::EmptyCandidateSet {
                excluded: excluded_set.len(),
            });
        }

        self.excluded = excluded_set;
        self.remaining = remaining.into_iter().collect();
        self.phase = SessionPhase::Active;

        tracing::info!(
            "Bisection started: candidates={}, excluded={}, max_rounds={}",
            self.remaining.len(),
            self.excluded.len(),
            Self::max_rounds(self.remaining.len())
        );
        Ok(())
    }

    /// Open the next round and return the units to disable.
    ///
    /// With a single candidate left the session resolves instead.
    pub fn begin_round(&mut self) -> Result<RoundStart, SessionError> {
        self.require_phase("begin a round", SessionPhase::Active)?;
        if self.current_round.is_some() {
            return Err(SessionError::InvalidState {
                operation: "begin a round",
                reason: "a round is already open".to_string(),
            });
        }

        if self.remaining.len() == 1 {
            self.phase = SessionPhase::Resolved;
            let culprit = self.remaining[0].clone();
            tracing::info!("Bisection resolved without a round: {}", culprit);
            return Ok(RoundStart::Resolved(culprit));
        }

        let half = self.remaining.len().div_ceil(2);
        let units = self.remaining[..half].to_vec();

        tracing::info!(
            "Round {}: disabling {} of {} candidates",
            self.history.len() + 1,
            units.len(),
            self.remaining.len()
        );

        self.current_round = Some(OpenRound {
            units: units.clone(),
            move_failed: false,
        });
        Ok(RoundStart::Round(units))
    }

    /// Units of the open round, to re-issue after a failed move
    pub fn retry_round(&self) -> Result<&[String], SessionError> {
        let round = self.open_round("retry a round")?;
        tracing::info!("Re-issuing round {}", self.history.len() + 1);
        Ok(&round.units)
    }

    /// Record that applying the open round failed; outcomes are refused until it is re-applied
    pub fn mark_move_failed(&mut self) -> Result<(), SessionError> {
        self.open_round_mut("mark a move failure")?.move_failed = true;
        Ok(())
    }

    /// Record that the open round is applied as issued
    pub fn mark_move_applied(&mut self) -> Result<(), SessionError> {
        self.open_round_mut("mark a move applied")?.move_failed = false;
        Ok(())
    }

    /// Close the open round with the user's verdict and narrow the candidates.
    pub fn report_outcome(&mut self, outcome: Outcome) -> Result<SessionPhase, SessionError> {
        self.require_phase("report an outcome", SessionPhase::Active)?;
        let round = match self.current_round.take() {
            Some(round) if !round.move_failed => round,
            Some(round) => {
                self.current_round = Some(round);
                return Err(SessionError::InvalidState {
                    operation: "report an outcome",
                    reason: "the round was not applied; retry it first".to_string(),
                });
            }
            None => {
                return Err(SessionError::InvalidState {
                    operation: "report an outcome",
                    reason: "no round is open".to_string(),
                });
            }
        };

        self.remaining = match outcome {
            Outcome::Fail => self.remaining.split_off(round.units.len()),
            Outcome::Pass => round.units.clone(),
        };
        self.history.push(RoundRecord {
            disabled: round.units,
            outcome,
        });

        if self.remaining.len() == 1 {
            self.phase = SessionPhase::Resolved;
            tracing::info!(
                "Bisection resolved after {} rounds: {}",
                self.history.len(),
                self.remaining[0]
            );
        } else {
            tracing::info!(
                "Round {} reported {}: {} candidates remain",
                self.history.len(),
                outcome,
                self.remaining.len()
            );
        }

        Ok(self.phase)
    }

    /// Give up on the search. Terminal.
    pub fn abandon(&mut self) -> Result<(), SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::InvalidState {
                operation: "abandon",
                reason: format!("session is already {}", self.phase),
            });
        }
        self.phase = SessionPhase::Abandoned;
        self.current_round = None;
        tracing::info!("Bisection abandoned after {} rounds", self.history.len());
        Ok(())
    }

    /// The identified culprit. Only valid once resolved.
    pub fn culprit(&self) -> Result<&str, SessionError> {
        self.require_phase("get the culprit", SessionPhase::Resolved)?;
        Ok(&self.remaining[0])
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().map(String::as_str)
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn rounds_completed(&self) -> usize {
        self.history.len()
    }

    /// Units disabled by the open round, if any
    pub fn current_round(&self) -> Option<&[String]> {
        self.current_round.as_ref().map(|r| r.units.as_slice())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            excluded: self.excluded.iter().cloned().collect(),
            remaining: self.remaining.clone(),
            history: self.history.clone(),
        }
    }

    /// Resume a session between rounds from a snapshot
    pub fn from_snapshot(snapshot: SessionSnapshot) -> Result<Self, SessionError> {
        let excluded: IndexSet<String> = snapshot.excluded.into_iter().collect();
        let remaining: IndexSet<String> = snapshot.remaining.into_iter().collect();

        if remaining.is_empty() {
            return Err(SessionError::InvalidCheckpoint(
                "no remaining candidates".to_string(),
            ));
        }
        if let Some(unit) = remaining.iter().find(|u| excluded.contains(*u)) {
            return Err(SessionError::InvalidCheckpoint(format!(
                "{} is both excluded and a candidate",
                unit
            )));
        }

        let phase = if remaining.len() == 1 {
            SessionPhase::Resolved
        } else {
            SessionPhase::Active
        };

        tracing::info!(
            "Bisection restored: candidates={}, rounds={}",
            remaining.len(),
            snapshot.history.len()
        );

        Ok(Self {
            phase,
            excluded,
            remaining: remaining.into_iter().collect(),
            history: snapshot.history,
            current_round: None,
        })
    }

    fn require_phase(
        &self,
        operation: &'static str,
        expected: SessionPhase,
    ) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                reason: format!("session is {}, not {}", self.phase, expected),
            })
        }
    }

    fn open_round(&self, operation: &'static str) -> Result<&OpenRound, SessionError> {
        self.require_phase(operation, SessionPhase::Active)?;
        self.current_round
            .as_ref()
            .ok_or_else(|| SessionError::InvalidState {
                operation,
                reason: "no round is open".to_string(),
            })
    }

    fn open_round_mut(&mut self, operation: &'static str) -> Result<&mut OpenRound, SessionError> {
        self.require_phase(operation, SessionPhase::Active)?;
        self.current_round
            .as_mut()
            .ok_or_else(|| SessionError::InvalidState {
                operation,
                reason: "no round is open".to_string(),
            })
    }
}

impl Default for BinarySearchSession {
    fn default() -> Self {
        Self::new()
    }
}
