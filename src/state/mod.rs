// Shared session module
//
// This module provides SharedSession, which wraps a BinarySearchSession with a
// single mutex and emits events when the session changes, for callers that
// share one session (for example a prompt loop and a status watcher).

use crate::models::{Outcome, SessionPhase, SessionSnapshot};
use crate::services::bisect::{BinarySearchSession, RoundStart, SessionError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Events emitted when the shared session changes
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The search started over this many candidates
    Started { candidates: usize },

    /// A round was opened with these units disabled
    RoundBegan { round: usize, disabled: Vec<String> },

    /// A round was closed
    OutcomeReported {
        round: usize,
        outcome: Outcome,
        remaining: usize,
    },

    /// The culprit was identified
    Resolved { culprit: String },

    /// The user gave up
    Abandoned,
}

/// Thread-safe session handle with event emission
///
/// Every transition runs under one mutex, so rounds from different callers
/// can never interleave. Clones share the same session and channel.
///
/// # Usage
///
/// - [`read()`](Self::read) to inspect the session
/// - transition methods mirror [`BinarySearchSession`] and emit a [`SessionEvent`]
/// - [`subscribe()`](Self::subscribe) to listen for changes
pub struct SharedSession {
    session: Arc<Mutex<BinarySearchSession>>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SharedSession {
    /// Wrap `session`. The event channel buffers 100 events.
    pub fn new(session: BinarySearchSession) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            session: Arc::new(Mutex::new(session)),
            event_tx,
        }
    }

    /// Execute a function with the session locked for reading
    ///
    /// # Example
    /// ```ignore
    /// let left = shared.read(|s| s.remaining().len());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&BinarySearchSession) -> R,
    {
        f(&self.lock())
    }

    pub fn phase(&self) -> SessionPhase {
        self.read(|s| s.phase())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(|s| s.snapshot())
    }

    /// Subscribe to session events
    ///
    /// Returns a receiver for all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn start<I, J, S, T>(&self, all_units: I, excluded: J) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut session = self.lock();
        session.start(all_units, excluded)?;
        self.emit(SessionEvent::Started {
            candidates: session.remaining().len(),
        });
        Ok(())
    }

    pub fn begin_round(&self) -> Result<RoundStart, SessionError> {
        let mut session = self.lock();
        let start = session.begin_round()?;
        match &start {
            RoundStart::Round(units) => self.emit(SessionEvent::RoundBegan {
                round: session.rounds_completed() + 1,
                disabled: units.clone(),
            }),
            RoundStart::Resolved(culprit) => self.emit(SessionEvent::Resolved {
                culprit: culprit.clone(),
            }),
        }
        Ok(start)
    }

    pub fn retry_round(&self) -> Result<Vec<String>, SessionError> {
        self.lock().retry_round().map(<[String]>::to_vec)
    }

    pub fn report_outcome(&self, outcome: Outcome) -> Result<SessionPhase, SessionError> {
        let mut session = self.lock();
        let phase = session.report_outcome(outcome)?;

        self.emit(SessionEvent::OutcomeReported {
            round: session.rounds_completed(),
            outcome,
            remaining: session.remaining().len(),
        });
        if phase == SessionPhase::Resolved {
            let culprit = session.culprit()?.to_string();
            self.emit(SessionEvent::Resolved { culprit });
        }
        Ok(phase)
    }

    pub fn abandon(&self) -> Result<(), SessionError> {
        self.lock().abandon()?;
        self.emit(SessionEvent::Abandoned);
        Ok(())
    }

    pub fn culprit(&self) -> Result<String, SessionError> {
        self.read(|s| s.culprit().map(str::to_string))
    }

    fn lock(&self) -> MutexGuard<'_, BinarySearchSession> {
        // Transitions validate before mutating, so a poisoned session is still consistent
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.event_tx.send(event);
    }
}

impl Default for SharedSession {
    fn default() -> Self {
        Self::new(BinarySearchSession::new())
    }
}

impl Clone for SharedSession {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            event_tx: self.event_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_start_emits_event() {
        let shared = SharedSession::default();
        let mut rx = shared.subscribe();

        shared.start(names(&["A", "B", "C"]), ["C"]).unwrap();

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Started { candidates: 2 });
        assert_eq!(shared.phase(), SessionPhase::Active);
    }

    #[test]
    fn test_failed_transition_emits_nothing() {
        let shared = SharedSession::default();
        let mut rx = shared.subscribe();

        assert!(shared.begin_round().is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_resolution_events() {
        let shared = SharedSession::default();
        shared.start(names(&["A", "B"]), Vec::<String>::new()).unwrap();
        let mut rx = shared.subscribe();

        shared.begin_round().unwrap();
        shared.report_outcome(Outcome::Pass).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), SessionEvent::RoundBegan { round: 1, .. }));
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::OutcomeReported {
                round: 1,
                outcome: Outcome::Pass,
                remaining: 1
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::Resolved {
                culprit: "A".to_string()
            }
        );
        assert_eq!(shared.culprit().unwrap(), "A");
    }

    #[test]
    fn test_clone_shares_session() {
        let first = SharedSession::default();
        let second = first.clone();

        first.start(names(&["A", "B", "C", "D"]), Vec::<String>::new()).unwrap();
        second.begin_round().unwrap();

        assert!(first.begin_round().is_err());
        assert_eq!(first.read(|s| s.current_round().map(<[String]>::len)), Some(2));
    }

    #[test]
    fn test_abandon_event() {
        let shared = SharedSession::default();
        let mut rx = shared.subscribe();

        shared.abandon().unwrap();
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Abandoned);
        assert!(shared.abandon().is_err());
    }
}
