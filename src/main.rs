//! mod-bisector - Hash lookup and binary-search troubleshooting for mod folders
//!
//! Main entry point for the command-line application.
//!
//! # Execution Flow
//!
//! 1. Parse arguments
//! 2. Load `mod-bisector.yaml` from the configuration directory
//!    (environment variables `MOD_BISECTOR_*` override file values)
//! 3. Initialize logging → `<log-dir>/mod-bisector.<date>`, warnings echoed to stderr
//! 4. Run the command
//! 5. Log a run summary

use anyhow::Result;
use clap::Parser;
use mod_bisector::cli::{Args, CommandContext, run_command};
use mod_bisector::{APP_NAME, ConfigManager, Metrics, VERSION};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::new(&args.config_dir)?;
    let config = manager.load_user_config()?;

    // Held until exit so buffered log lines are flushed
    let _guard = mod_bisector::logging::setup_logging_with_console(
        &args.log_dir,
        APP_NAME,
        args.debug || config.debug_mode,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let ctx = CommandContext {
        manager,
        config,
        metrics: Arc::new(Metrics::new()),
    };

    let result = run_command(&ctx, args.command).await;

    ctx.metrics.log_summary();
    if let Err(err) = &result {
        tracing::error!("{:#}", err);
    }
    result
}
