use crate::services::ledger::DisabledLedger;
use camino::Utf8PathBuf;
use std::fs;
use std::io;
use thiserror::Error;

/// Errors from enabling or disabling mod units
#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Failed to rename {from} to {to}: {source}")]
    Rename {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Mod folder not found: {0}")]
    MissingUnit(Utf8PathBuf),

    #[error("Failed to update ledger: {0}")]
    Ledger(String),
}

/// Applies the enable/disable side effect for a set of mod units.
///
/// A batch either fully succeeds or returns an error with the units left as
/// they were before the call.
#[cfg_attr(test, mockall::automock)]
pub trait MoveExecutor {
    fn disable(&mut self, units: &[String]) -> Result<(), MoveError>;
    fn enable(&mut self, units: &[String]) -> Result<(), MoveError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Disable,
    Enable,
}

/// Disables a mod folder by renaming it with the disabled prefix.
///
/// `<root>/Characters/Body` becomes `<root>/Characters/DISABLED Body`. Every
/// rename this executor makes is recorded in its [`DisabledLedger`] so a
/// crashed run can be undone with
/// [`recover_from_ledger`](crate::services::ledger::recover_from_ledger).
#[derive(Debug)]
pub struct RenameMoveExecutor {
    root: Utf8PathBuf,
    prefix: String,
    ledger: DisabledLedger,
}

impl RenameMoveExecutor {
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        prefix: impl Into<String>,
        ledger: DisabledLedger,
    ) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            ledger,
        }
    }

    pub fn ledger(&self) -> &DisabledLedger {
        &self.ledger
    }

    /// Where `unit` lives while enabled
    pub fn active_path(&self, unit: &str) -> Utf8PathBuf {
        self.root.join(unit)
    }

    /// Where `unit` lives while disabled
    pub fn disabled_path(&self, unit: &str) -> Result<Utf8PathBuf, MoveError> {
        let active = self.active_path(unit);
        match active.file_name() {
            Some(name) => Ok(active.with_file_name(format!("{}{}", self.prefix, name))),
            None => Err(MoveError::MissingUnit(active)),
        }
    }

    /// Move one unit. Returns `false` if it was already in the requested state.
    fn move_one(&mut self, unit: &str, direction: Direction) -> Result<bool, MoveError> {
        let active = self.active_path(unit);
        let disabled = self.disabled_path(unit)?;

        let (from, to) = match direction {
            Direction::Disable => (active, disabled),
            Direction::Enable => (disabled, active),
        };

        if !from.exists() {
            if to.exists() {
                tracing::debug!("{} already at {}", unit, to);
                return Ok(false);
            }
            return Err(MoveError::MissingUnit(from));
        }

        fs::rename(&from, &to).map_err(|source| MoveError::Rename {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;

        let ledger_update = match direction {
            Direction::Disable => self.ledger.record(&to),
            Direction::Enable => self.ledger.remove(&from),
        };
        if let Err(e) = ledger_update {
            if let Err(undo) = fs::rename(&to, &from) {
                tracing::error!("Could not move {} back to {}: {}", to, from, undo);
            }
            return Err(MoveError::Ledger(format!("{:#}", e)));
        }

        tracing::debug!("Renamed {} -> {}", from, to);
        Ok(true)
    }

    fn apply(&mut self, units: &[String], direction: Direction) -> Result<(), MoveError> {
        let mut moved: Vec<&str> = Vec::new();

        for unit in units {
            match self.move_one(unit, direction) {
                Ok(true) => moved.push(unit.as_str()),
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!("{:?} of {} failed: {}", direction, unit, err);
                    self.roll_back(&moved, direction);
                    return Err(err);
                }
            }
        }

        tracing::info!("{:?}d {} of {} mods", direction, moved.len(), units.len());
        Ok(())
    }

    fn roll_back(&mut self, moved: &[&str], direction: Direction) {
        let reverse = match direction {
            Direction::Disable => Direction::Enable,
            Direction::Enable => Direction::Disable,
        };
        for unit in moved.iter().rev() {
            if let Err(err) = self.move_one(unit, reverse) {
                tracing::error!("Rollback of {} failed: {}", unit, err);
            }
        }
    }
}

impl MoveExecutor for RenameMoveExecutor {
    fn disable(&mut self, units: &[String]) -> Result<(), MoveError> {
        self.apply(units, Direction::Disable)
    }

    fn enable(&mut self, units: &[String]) -> Result<(), MoveError> {
        self.apply(units, Direction::Enable)
    }
}
