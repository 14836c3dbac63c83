// mod-bisector - Hash lookup and binary-search troubleshooting for shader mod folders
//
// This is the library crate containing the scanning, lookup, and bisection logic.
// The binary crate (main.rs) provides the command-line entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{HashIndex, Outcome, SessionPhase, UserConfig};
pub use services::{BinarySearchSession, ConfigIndex, RoundDriver};
pub use state::{SessionEvent, SharedSession};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
