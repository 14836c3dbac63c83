//! Integration tests for driving a bisection against real mod folders
//!
//! These tests verify:
//! - Rounds rename exactly the disabled half and restore it afterwards
//! - The on-disk ledger tracks every folder a run has disabled
//! - A crashed run is undone by ledger recovery
//! - A failed move can be retried without losing the round
//! - Failed renames and ledger writes leave folders and ledger in step

use camino::{Utf8Path, Utf8PathBuf};
use mod_bisector::models::{Outcome, SessionPhase, UnitStatus, UserConfig};
use mod_bisector::services::{
    BinarySearchSession, DisabledLedger, DriverError, MoveError, RenameMoveExecutor, RoundDriver,
    RoundStart, candidate_ids, discover_mod_units, load_ledger, recover_from_ledger,
};
use std::fs;
use tempfile::TempDir;

const PREFIX: &str = "DISABLED ";

struct ModsFixture {
    _temp_dir: TempDir,
    root: Utf8PathBuf,
    ledger_path: Utf8PathBuf,
}

fn fixture(mods: &[&str]) -> ModsFixture {
    let temp_dir = TempDir::new().unwrap();
    let base = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    let root = base.join("Mods");
    for m in mods {
        fs::create_dir_all(root.join(m)).unwrap();
        fs::write(root.join(m).join("mod.ini"), "[TextureOverride]\nhash = 0badf00d\n").unwrap();
    }
    ModsFixture {
        _temp_dir: temp_dir,
        ledger_path: base.join("state").join("bisect-state.json"),
        root,
    }
}

fn driver_for(fx: &ModsFixture, units: &[&str]) -> RoundDriver<RenameMoveExecutor> {
    let mut session = BinarySearchSession::new();
    session.start(units.iter().copied(), Vec::<String>::new()).unwrap();
    let ledger = DisabledLedger::open(&fx.ledger_path).unwrap();
    RoundDriver::new(session, RenameMoveExecutor::new(&fx.root, PREFIX, ledger))
}

fn is_enabled(root: &Utf8Path, unit: &str) -> bool {
    root.join(unit).is_dir()
}

#[test]
fn test_rounds_rename_and_restore_folders() {
    let fx = fixture(&["A", "B", "C", "D", "E"]);
    let mut driver = driver_for(&fx, &["A", "B", "C", "D", "E"]);

    let RoundStart::Round(disabled) = driver.begin_round().unwrap() else {
        panic!("expected a round");
    };
    assert_eq!(disabled, vec!["A", "B", "C"]);
    for unit in ["A", "B", "C"] {
        assert!(fx.root.join(format!("{}{}", PREFIX, unit)).is_dir());
        assert!(!is_enabled(&fx.root, unit));
    }
    assert!(is_enabled(&fx.root, "D"));
    assert_eq!(load_ledger(&fx.ledger_path).unwrap().len(), 3);

    assert_eq!(driver.report_outcome(Outcome::Fail).unwrap(), SessionPhase::Active);
    for unit in ["A", "B", "C", "D", "E"] {
        assert!(is_enabled(&fx.root, unit), "{} should be enabled between rounds", unit);
    }
    assert!(!fx.ledger_path.exists(), "An empty ledger is removed");

    driver.begin_round().unwrap();
    assert_eq!(driver.report_outcome(Outcome::Pass).unwrap(), SessionPhase::Resolved);
    assert_eq!(driver.session().culprit().unwrap(), "D");
    assert!(is_enabled(&fx.root, "D"));
}

#[test]
fn test_nested_mod_folders() {
    let fx = fixture(&["Characters/Hero", "Characters/Villain", "Weapons/Sword"]);
    let units = discover_mod_units(&fx.root, &UserConfig::default()).unwrap();
    let ids = candidate_ids(&units);
    assert_eq!(ids, vec!["Characters/Hero", "Characters/Villain", "Weapons/Sword"]);

    let mut session = BinarySearchSession::new();
    session.start(ids, Vec::<String>::new()).unwrap();
    let executor = RenameMoveExecutor::new(&fx.root, PREFIX, DisabledLedger::in_memory());
    let mut driver = RoundDriver::new(session, executor);

    driver.begin_round().unwrap();
    assert!(fx.root.join("Characters/DISABLED Hero").is_dir());
    assert!(fx.root.join("Characters/DISABLED Villain").is_dir());

    let rediscovered = discover_mod_units(&fx.root, &UserConfig::default()).unwrap();
    let disabled: Vec<_> = rediscovered
        .iter()
        .filter(|u| u.status == UnitStatus::Disabled)
        .map(|u| u.id.as_str())
        .collect();
    assert_eq!(disabled, vec!["Characters/DISABLED Hero", "Characters/DISABLED Villain"]);

    driver.abandon().unwrap();
    assert!(is_enabled(&fx.root, "Characters/Hero"));
    assert!(is_enabled(&fx.root, "Characters/Villain"));
}

#[test]
fn test_crashed_run_is_recovered_from_ledger() {
    let fx = fixture(&["A", "B", "C", "D"]);
    {
        let mut driver = driver_for(&fx, &["A", "B", "C", "D"]);
        driver.begin_round().unwrap();
        // Dropped mid-round without reporting or abandoning
    }

    assert!(!is_enabled(&fx.root, "A"));
    assert!(!is_enabled(&fx.root, "B"));
    assert_eq!(load_ledger(&fx.ledger_path).unwrap().len(), 2);

    let restored = recover_from_ledger(&fx.ledger_path, PREFIX).unwrap();

    assert_eq!(restored, 2);
    for unit in ["A", "B", "C", "D"] {
        assert!(is_enabled(&fx.root, unit));
    }
    assert!(!fx.ledger_path.exists());
}

#[test]
fn test_recover_leaves_user_disabled_folders_alone() {
    let fx = fixture(&["A", "B", "DISABLED Old"]);
    {
        let mut driver = driver_for(&fx, &["A", "B"]);
        driver.begin_round().unwrap();
    }

    recover_from_ledger(&fx.ledger_path, PREFIX).unwrap();

    assert!(is_enabled(&fx.root, "A"));
    assert!(fx.root.join("DISABLED Old").is_dir());
    assert!(!fx.root.join("Old").exists());
}

#[test]
fn test_recover_without_ledger_is_noop() {
    let fx = fixture(&["A"]);
    assert_eq!(recover_from_ledger(&fx.ledger_path, PREFIX).unwrap(), 0);
}

#[test]
fn test_missing_folder_fails_round_and_retry_succeeds() {
    let fx = fixture(&["A", "C", "D"]);
    // "B" is a candidate but its folder is gone
    let mut driver = driver_for(&fx, &["A", "B", "C", "D"]);

    let err = driver.begin_round().unwrap_err();
    assert!(matches!(err, DriverError::Move(MoveError::MissingUnit(_))));
    assert!(is_enabled(&fx.root, "A"), "A failed batch is rolled back");
    assert!(driver.report_outcome(Outcome::Pass).is_err());

    fs::create_dir_all(fx.root.join("B")).unwrap();
    driver.retry_round().unwrap();
    assert!(!is_enabled(&fx.root, "A"));
    assert!(!is_enabled(&fx.root, "B"));

    assert_eq!(driver.report_outcome(Outcome::Fail).unwrap(), SessionPhase::Active);
    assert_eq!(driver.session().remaining(), ["C".to_string(), "D".to_string()]);
    assert!(is_enabled(&fx.root, "A"));
    assert!(is_enabled(&fx.root, "B"));
}

#[test]
fn test_abandon_restores_open_round() {
    let fx = fixture(&["A", "B", "C"]);
    let mut driver = driver_for(&fx, &["A", "B", "C"]);

    driver.begin_round().unwrap();
    driver.abandon().unwrap();

    assert_eq!(driver.session().phase(), SessionPhase::Abandoned);
    for unit in ["A", "B", "C"] {
        assert!(is_enabled(&fx.root, unit));
    }
    assert!(!fx.ledger_path.exists());
}

#[test]
fn test_rename_failure_mid_batch_rolls_back_ledger() {
    let fx = fixture(&["A", "B", "C"]);
    // A stray file occupies B's disabled name, so B cannot be renamed
    fs::write(fx.root.join("DISABLED B"), "stray").unwrap();
    let mut driver = driver_for(&fx, &["A", "B", "C"]);

    let err = driver.begin_round().unwrap_err();

    assert!(matches!(err, DriverError::Move(MoveError::Rename { .. })));
    for unit in ["A", "B", "C"] {
        assert!(is_enabled(&fx.root, unit), "{} should be enabled after rollback", unit);
    }
    assert!(!fx.root.join("DISABLED A").exists());
    assert!(load_ledger(&fx.ledger_path).unwrap().is_empty());
    assert!(driver.executor().ledger().is_empty());
}

#[test]
fn test_ledger_write_failure_leaves_folders_enabled() {
    let fx = fixture(&["A", "B", "C"]);
    let blocker = fx.root.parent().unwrap().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let ledger_path = blocker.join("bisect-state.json");

    let mut session = BinarySearchSession::new();
    session.start(["A", "B", "C"], Vec::<String>::new()).unwrap();
    let ledger = DisabledLedger::open(&ledger_path).unwrap();
    let mut driver = RoundDriver::new(session, RenameMoveExecutor::new(&fx.root, PREFIX, ledger));

    let err = driver.begin_round().unwrap_err();

    assert!(matches!(err, DriverError::Move(MoveError::Ledger(_))));
    for unit in ["A", "B", "C"] {
        assert!(is_enabled(&fx.root, unit));
    }
    assert!(!fx.root.join("DISABLED A").exists());
    assert!(driver.executor().ledger().is_empty());

    // Once the ledger can be written, the retry records every disabled folder
    fs::remove_file(&blocker).unwrap();
    driver.retry_round().unwrap();
    assert!(!is_enabled(&fx.root, "A"));
    assert!(!is_enabled(&fx.root, "B"));
    assert_eq!(load_ledger(&ledger_path).unwrap().len(), 2);

    driver.abandon().unwrap();
    assert!(!ledger_path.exists());
}

#[test]
fn test_abandon_after_resolve_restores_stuck_folder() {
    let fx = fixture(&["A", "B"]);
    let mut driver = driver_for(&fx, &["A", "B"]);

    driver.begin_round().unwrap();
    // Something else takes A's name while it is disabled
    fs::create_dir_all(fx.root.join("A")).unwrap();
    fs::write(fx.root.join("A").join("other.ini"), "").unwrap();
    assert!(driver.report_outcome(Outcome::Pass).is_err());
    assert_eq!(driver.session().phase(), SessionPhase::Resolved);
    assert_eq!(driver.pending_restore(), ["A".to_string()]);
    assert!(driver.abandon().is_err());
    assert_eq!(driver.pending_restore(), ["A".to_string()]);

    fs::remove_dir_all(fx.root.join("A")).unwrap();
    driver.abandon().unwrap();

    assert!(driver.pending_restore().is_empty());
    assert!(fx.root.join("A").join("mod.ini").is_file());
    assert!(!fx.ledger_path.exists());
}
