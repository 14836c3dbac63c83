//! Command handler implementations

use crate::cli::Commands;
use crate::config::ConfigManager;
use crate::metrics::Metrics;
use crate::models::{Outcome, ScanReport, SessionPhase, UnitStatus, UserConfig};
use crate::services::checkpoint::{clear_checkpoint, load_checkpoint, save_checkpoint};
use crate::services::{
    BinarySearchSession, ConfigIndex, DisabledLedger, DriverError, DuplicateDetector,
    HashLookupService, MoveError, RenameMoveExecutor, RoundDriver, RoundStart, discover_mod_units,
    recover_from_ledger,
};
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use dialoguer::Select;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Everything a command needs besides its own arguments
pub struct CommandContext {
    pub manager: ConfigManager,
    pub config: UserConfig,
    pub metrics: Arc<Metrics>,
}

impl CommandContext {
    /// Mods directory from the command line, or the saved one.
    ///
    /// A directory given on the command line becomes the new saved one.
    fn mods_root(&self, path: Option<Utf8PathBuf>) -> Result<Utf8PathBuf> {
        match path {
            Some(path) => {
                if !path.is_dir() {
                    bail!("Mods directory does not exist: {}", path);
                }
                self.manager.save_last_path(&path)?;
                Ok(path)
            }
            None if !self.config.mods_path.is_empty() => {
                Ok(Utf8PathBuf::from(&self.config.mods_path))
            }
            None => bail!("No mods directory given and none saved; pass one as PATH"),
        }
    }

    /// `file` from the settings, relative to the configuration directory unless absolute
    fn state_path(&self, file: &str) -> Utf8PathBuf {
        let path = Utf8Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.manager.config_dir().join(path)
        }
    }
}

/// Run a parsed command.
pub async fn run_command(ctx: &CommandContext, command: Commands) -> Result<()> {
    match command {
        Commands::List { path } => list(ctx, path),
        Commands::Search { hash, path } => search(ctx, &hash, path).await,
        Commands::Duplicates { path } => duplicates(ctx, path).await,
        Commands::Bisect {
            path,
            exclude,
            resume,
        } => bisect(ctx, path, exclude, resume),
        Commands::Recover => recover(ctx),
        Commands::ShowConfig => show_config(ctx),
        Commands::BackupConfig { dest } => {
            ctx.manager.backup_settings(&dest)?;
            println!("Settings backed up to {}", dest);
            Ok(())
        }
        Commands::RestoreConfig { src } => {
            ctx.manager.restore_settings(&src)?;
            println!("Settings restored from {}", src);
            Ok(())
        }
    }
}

fn list(ctx: &CommandContext, path: Option<Utf8PathBuf>) -> Result<()> {
    let root = ctx.mods_root(path)?;
    let units = discover_mod_units(&root, &ctx.config)?;

    if units.is_empty() {
        println!("No mod folders found under {}", root);
        return Ok(());
    }

    for unit in &units {
        let marker = match unit.status {
            UnitStatus::Active => "",
            UnitStatus::Disabled => "  (disabled)",
            UnitStatus::Excluded => "  (excluded)",
        };
        println!("{}{}", unit.id, marker);
    }
    println!("\n{} mods", units.len());
    Ok(())
}

async fn search(ctx: &CommandContext, hash: &str, path: Option<Utf8PathBuf>) -> Result<()> {
    let root = ctx.mods_root(path)?;
    let report = scan_mods(ctx, &root).await?;

    let files = HashLookupService::new(&report.index).lookup(hash);
    if files.is_empty() {
        println!("No configuration file declares {}", hash);
    } else {
        for file in &files {
            println!("{}", file);
        }
    }
    Ok(())
}

async fn duplicates(ctx: &CommandContext, path: Option<Utf8PathBuf>) -> Result<()> {
    let root = ctx.mods_root(path)?;
    let report = scan_mods(ctx, &root).await?;

    let duplicates = DuplicateDetector::new(&report.index).find_duplicates();
    if duplicates.is_empty() {
        println!("No hash is declared by more than one file");
        return Ok(());
    }

    for (hash, files) in &duplicates {
        println!("{}", hash);
        for file in files {
            println!("    {}", file);
        }
    }
    Ok(())
}

/// Scan `root` on a blocking thread. Ctrl-C cancels the scan.
async fn scan_mods(ctx: &CommandContext, root: &Utf8Path) -> Result<ScanReport> {
    let cancel = Arc::new(AtomicBool::new(false));
    let watcher = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::Relaxed);
            }
        })
    };

    let index = ConfigIndex::new(ctx.config.scan_options());
    let task_root = root.to_path_buf();
    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || index.scan_with_cancel(&task_root, &cancel))
        .await
        .context("Scan task panicked")?;
    watcher.abort();

    let report = result.with_context(|| format!("Failed to scan {}", root))?;
    ctx.metrics.record_scan(
        report.index.file_count(),
        report.warnings.len(),
        started.elapsed(),
    );

    if !report.warnings.is_empty() {
        eprintln!("{} files skipped, see the log for details", report.warnings.len());
    }
    Ok(report)
}

fn bisect(
    ctx: &CommandContext,
    path: Option<Utf8PathBuf>,
    exclude: Vec<String>,
    resume: bool,
) -> Result<()> {
    let root = ctx.mods_root(path)?;
    let ledger_path = ctx.state_path(&ctx.config.state_file);
    let checkpoint_path = ctx.state_path(&ctx.config.checkpoint_file);

    let ledger = DisabledLedger::open(&ledger_path)?;
    if !ledger.is_empty() {
        bail!(
            "A previous run left {} mods disabled; run `mod-bisector recover` first",
            ledger.len()
        );
    }

    let session = if resume {
        let snapshot = load_checkpoint(&checkpoint_path)?
            .with_context(|| format!("No saved search at {}", checkpoint_path))?;
        BinarySearchSession::from_snapshot(snapshot)?
    } else {
        new_session(ctx, &root, exclude)?
    };

    println!(
        "Searching {} mods, at most {} rounds",
        session.remaining().len(),
        BinarySearchSession::max_rounds(session.remaining().len())
    );

    let executor = RenameMoveExecutor::new(&root, &ctx.config.disabled_prefix, ledger);
    let mut driver = RoundDriver::new(session, executor);

    let finished = run_rounds(ctx, &mut driver, &checkpoint_path)?;
    clear_checkpoint(&checkpoint_path)?;

    if finished {
        let culprit = driver.session().culprit()?;
        println!("\nThe error is caused by: {}", culprit);
        tracing::info!(
            "Bisection resolved to {} after {} rounds",
            culprit,
            driver.session().rounds_completed()
        );
    } else {
        println!("\nSearch abandoned; all mods are enabled again");
    }
    Ok(())
}

fn new_session(
    ctx: &CommandContext,
    root: &Utf8Path,
    exclude: Vec<String>,
) -> Result<BinarySearchSession> {
    let units = discover_mod_units(root, &ctx.config)?;
    let disabled = units
        .iter()
        .filter(|u| u.status == UnitStatus::Disabled)
        .count();
    if disabled > 0 {
        println!("Ignoring {} mods that are already disabled", disabled);
    }

    let all: Vec<&str> = units
        .iter()
        .filter(|u| u.status != UnitStatus::Disabled)
        .map(|u| u.id.as_str())
        .collect();
    let excluded = units
        .iter()
        .filter(|u| u.status == UnitStatus::Excluded)
        .map(|u| u.id.clone())
        .chain(exclude);

    let mut session = BinarySearchSession::new();
    session.start(all, excluded)?;
    Ok(session)
}

/// Prompt through rounds until the search resolves (`true`) or the user abandons (`false`).
fn run_rounds(
    ctx: &CommandContext,
    driver: &mut RoundDriver<RenameMoveExecutor>,
    checkpoint_path: &Utf8Path,
) -> Result<bool> {
    loop {
        let units = match driver.begin_round() {
            Ok(RoundStart::Resolved(_)) => return Ok(true),
            Ok(RoundStart::Round(units)) => units,
            Err(DriverError::Move(err)) => {
                if !retry_moves(ctx, driver, err, RoundDriver::retry_round)? {
                    abandon(driver)?;
                    return Ok(false);
                }
                driver
                    .session()
                    .current_round()
                    .map(<[String]>::to_vec)
                    .unwrap_or_default()
            }
            Err(err) => return Err(err.into()),
        };

        println!(
            "\nRound {}: disabled {} of {} suspects",
            driver.session().rounds_completed() + 1,
            units.len(),
            driver.session().remaining().len()
        );
        for unit in &units {
            println!("    {}", unit);
        }

        let Some(outcome) = ask_outcome()? else {
            abandon(driver)?;
            return Ok(false);
        };

        let phase = match driver.report_outcome(outcome) {
            Ok(phase) => phase,
            Err(DriverError::Move(err)) => {
                if !retry_moves(ctx, driver, err, RoundDriver::restore_pending)? {
                    abandon(driver)?;
                    return Ok(driver.session().phase() == SessionPhase::Resolved);
                }
                driver.session().phase()
            }
            Err(err) => return Err(err.into()),
        };
        ctx.metrics.record_round();

        if phase == SessionPhase::Resolved {
            return Ok(true);
        }
        save_checkpoint(checkpoint_path, &driver.session().snapshot())?;
    }
}

/// Ask whether the error still occurs. `None` means the user wants to stop.
fn ask_outcome() -> Result<Option<Outcome>> {
    let choice = Select::new()
        .with_prompt("Start the game. Does the error still occur?")
        .items(&["Yes", "No", "Stop and re-enable all mods"])
        .default(0)
        .interact()
        .context("Failed to read answer")?;

    Ok(match choice {
        0 => Some(Outcome::Fail),
        1 => Some(Outcome::Pass),
        _ => None,
    })
}

/// Offer Retry/Abandon after a move failure until `retry` succeeds or the user gives up.
fn retry_moves(
    ctx: &CommandContext,
    driver: &mut RoundDriver<RenameMoveExecutor>,
    mut err: MoveError,
    retry: fn(&mut RoundDriver<RenameMoveExecutor>) -> Result<(), DriverError>,
) -> Result<bool> {
    loop {
        ctx.metrics.record_move_failure();
        eprintln!("\n{}", err);
        eprintln!("Close anything using the folder (the game, a file browser) and retry.");

        let choice = Select::new()
            .with_prompt("Moving mod folders failed")
            .items(&["Retry", "Abandon"])
            .default(0)
            .interact()
            .context("Failed to read answer")?;
        if choice != 0 {
            return Ok(false);
        }

        match retry(driver) {
            Ok(()) => return Ok(true),
            Err(DriverError::Move(next)) => err = next,
            Err(other) => return Err(other.into()),
        }
    }
}

fn abandon(driver: &mut RoundDriver<RenameMoveExecutor>) -> Result<()> {
    driver
        .abandon()
        .context("Could not re-enable every mod; run `mod-bisector recover`")
}

fn recover(ctx: &CommandContext) -> Result<()> {
    let ledger_path = ctx.state_path(&ctx.config.state_file);
    let restored = recover_from_ledger(&ledger_path, &ctx.config.disabled_prefix)?;

    if restored == 0 {
        println!("Nothing to recover");
    } else {
        println!("Re-enabled {} mod folders", restored);
    }
    Ok(())
}

fn show_config(ctx: &CommandContext) -> Result<()> {
    let yaml = serde_yaml_ng::to_string(&ctx.config).context("Failed to serialize config")?;
    println!("# {}", ctx.manager.settings_path());
    print!("{}", yaml);
    Ok(())
}
