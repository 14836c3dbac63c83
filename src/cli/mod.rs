//! Command-line interface
//!
//! # Submodules
//!
//! - `args` - Command-line argument definitions using clap
//! - `commands` - Command handler implementations

pub mod args;
pub mod commands;

pub use args::{Args, Commands};
pub use commands::{CommandContext, run_command};
