//! Services module - Scanning, lookup, and bisection logic.
//!
//! The services hold all of the tool's behavior and have no dependency on the
//! command line layer, so each one is testable on its own.
//!
//! # Components
//!
//! - [`ConfigIndex`]: Walks a mods tree, parses `hash = ...` declarations from
//!   INI files, and builds an immutable [`HashIndex`](crate::models::HashIndex).
//!   Unreadable or malformed files become warnings, never scan failures.
//! - [`HashLookupService`]: Which files declare a given hash.
//! - [`DuplicateDetector`]: Hashes declared by two or more files.
//! - [`BinarySearchSession`]: The elimination state machine. Pure; it only
//!   decides which mods to disable each round.
//! - [`MoveExecutor`]: The side effect seam. [`RenameMoveExecutor`] toggles a
//!   mod by renaming its folder with the disabled prefix and records every
//!   rename in a [`DisabledLedger`].
//! - [`RoundDriver`]: Couples a session with an executor and enforces the
//!   retry rules when a move fails.
//! - [`discover_mod_units`]: Finds the mod folders to bisect.
//! - [`checkpoint`]: Saves a session between rounds for crash recovery.
//!
//! # Usage Example
//!
//! ```ignore
//! use mod_bisector::services::{BinarySearchSession, RenameMoveExecutor, RoundDriver, RoundStart};
//! use mod_bisector::models::Outcome;
//!
//! let mut session = BinarySearchSession::new();
//! session.start(candidate_ids, excluded)?;
//!
//! let executor = RenameMoveExecutor::new(&mods_root, "DISABLED ", ledger);
//! let mut driver = RoundDriver::new(session, executor);
//!
//! while let RoundStart::Round(disabled) = driver.begin_round()? {
//!     // launch the game, check for the error
//!     driver.report_outcome(if error_still_happens { Outcome::Fail } else { Outcome::Pass })?;
//! }
//! ```

pub mod bisect;
pub mod checkpoint;
pub mod config_index;
pub mod discovery;
pub mod driver;
pub mod duplicates;
pub mod hash_lookup;
pub mod ledger;
pub mod mover;

pub use bisect::{BinarySearchSession, RoundStart, SessionError};
pub use config_index::{ConfigIndex, ScanError};
pub use discovery::{candidate_ids, discover_mod_units};
pub use driver::{DriverError, RoundDriver};
pub use duplicates::{DuplicateDetector, DuplicateReport};
pub use hash_lookup::HashLookupService;
pub use ledger::{DisabledLedger, load_ledger, recover_from_ledger};
pub use mover::{MoveError, MoveExecutor, RenameMoveExecutor};
