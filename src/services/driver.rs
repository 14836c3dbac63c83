use crate::models::{Outcome, SessionPhase};
use crate::services::bisect::{BinarySearchSession, RoundStart, SessionError};
use crate::services::mover::{MoveError, MoveExecutor};
use thiserror::Error;

/// Errors from driving a session against a [`MoveExecutor`]
#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error("{} mod(s) from the last round are still disabled; restore them first", .units.len())]
    PendingRestore { units: Vec<String> },
}

/// Runs a [`BinarySearchSession`] and applies each round through a [`MoveExecutor`].
///
/// Every round starts from the same baseline: all remaining candidates
/// enabled except the round's half. The half is disabled when the round
/// begins and re-enabled once the outcome is reported.
///
/// A failed disable leaves the round open and blocks outcomes until
/// [`retry_round`](Self::retry_round) succeeds. A failed re-enable is kept as
/// pending and blocks the next round until
/// [`restore_pending`](Self::restore_pending) succeeds.
pub struct RoundDriver<E: MoveExecutor> {
    session: BinarySearchSession,
    executor: E,
    pending_enable: Vec<String>,
}

impl<E: MoveExecutor> RoundDriver<E> {
    pub fn new(session: BinarySearchSession, executor: E) -> Self {
        Self {
            session,
            executor,
            pending_enable: Vec::new(),
        }
    }

    pub fn session(&self) -> &BinarySearchSession {
        &self.session
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Units whose re-enable failed after the last outcome
    pub fn pending_restore(&self) -> &[String] {
        &self.pending_enable
    }

    /// Open a round and disable its units.
    pub fn begin_round(&mut self) -> Result<RoundStart, DriverError> {
        if !self.pending_enable.is_empty() {
            return Err(DriverError::PendingRestore {
                units: self.pending_enable.clone(),
            });
        }

        let start = self.session.begin_round()?;
        if let RoundStart::Round(units) = &start {
            if let Err(err) = self.executor.disable(units) {
                tracing::warn!("Round could not be applied: {}", err);
                self.session.mark_move_failed()?;
                return Err(err.into());
            }
        }
        Ok(start)
    }

    /// Re-issue the open round's disable after a move failure.
    pub fn retry_round(&mut self) -> Result<(), DriverError> {
        let units = self.session.retry_round()?.to_vec();
        match self.executor.disable(&units) {
            Ok(()) => {
                self.session.mark_move_applied()?;
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Retry failed: {}", err);
                self.session.mark_move_failed()?;
                Err(err.into())
            }
        }
    }

    /// Report the verdict, then re-enable the round's units.
    ///
    /// When only the re-enable fails the outcome is already recorded; the
    /// error is returned and the units are kept as pending.
    pub fn report_outcome(&mut self, outcome: Outcome) -> Result<SessionPhase, DriverError> {
        let units = self
            .session
            .current_round()
            .map(<[String]>::to_vec)
            .unwrap_or_default();

        let phase = self.session.report_outcome(outcome)?;

        if let Err(err) = self.executor.enable(&units) {
            tracing::warn!("Round units could not be re-enabled: {}", err);
            self.pending_enable = units;
            return Err(err.into());
        }
        Ok(phase)
    }

    /// Retry re-enabling units left disabled by a failed restore.
    pub fn restore_pending(&mut self) -> Result<(), DriverError> {
        if self.pending_enable.is_empty() {
            return Ok(());
        }
        self.executor.enable(&self.pending_enable)?;
        tracing::info!("Restored {} pending mods", self.pending_enable.len());
        self.pending_enable.clear();
        Ok(())
    }

    /// Abandon the search and re-enable everything the driver disabled.
    ///
    /// Once the session has ended this only retries the units left pending by
    /// a failed re-enable. Pending units are kept until the re-enable succeeds.
    pub fn abandon(&mut self) -> Result<(), DriverError> {
        let mut units = self
            .session
            .current_round()
            .map(<[String]>::to_vec)
            .unwrap_or_default();

        if self.pending_enable.is_empty() || !self.session.phase().is_terminal() {
            self.session.abandon()?;
        }
        units.extend(self.pending_enable.iter().cloned());

        if units.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.executor.enable(&units) {
            self.pending_enable = units;
            return Err(err.into());
        }
        self.pending_enable.clear();
        Ok(())
    }
}
