//! Command-line argument definitions

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Find which mod folder declares a shader hash, and which mod breaks the game
#[derive(Parser, Debug)]
#[command(name = "mod-bisector")]
#[command(version)]
#[command(about = "Hash lookup and binary-search troubleshooting for mod folders", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding mod-bisector.yaml and the bisection state files
    #[arg(long, global = true, default_value = "mod-bisector-data")]
    pub config_dir: Utf8PathBuf,

    /// Directory for log files
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: Utf8PathBuf,

    /// Enable debug logging (overrides config)
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the mod folders found under the mods directory
    List {
        /// Mods directory (defaults to the last one used)
        path: Option<Utf8PathBuf>,
    },

    /// Show which configuration files declare a hash
    Search {
        /// Hash to look up, e.g. 9a3c01f2 or 0x9A3C01F2
        hash: String,

        /// Mods directory (defaults to the last one used)
        path: Option<Utf8PathBuf>,
    },

    /// List hashes declared by more than one configuration file
    Duplicates {
        /// Mods directory (defaults to the last one used)
        path: Option<Utf8PathBuf>,
    },

    /// Find the mod causing an error by disabling half of the suspects each round
    Bisect {
        /// Mods directory (defaults to the last one used)
        path: Option<Utf8PathBuf>,

        /// Mod to keep enabled the whole time (can be specified multiple times)
        #[arg(long, value_name = "MOD")]
        exclude: Vec<String>,

        /// Continue the search saved by an interrupted run
        #[arg(long)]
        resume: bool,
    },

    /// Re-enable every mod folder a crashed bisection left disabled
    Recover,

    /// Show current configuration
    ShowConfig,

    /// Copy the settings file to DEST
    BackupConfig { dest: Utf8PathBuf },

    /// Replace the settings file with SRC
    RestoreConfig { src: Utf8PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bisect_args() {
        let args = Args::parse_from([
            "mod-bisector",
            "bisect",
            "/games/mods",
            "--exclude",
            "Core",
            "--exclude",
            "UI",
            "--debug",
        ]);

        assert!(args.debug);
        match args.command {
            Commands::Bisect {
                path,
                exclude,
                resume,
            } => {
                assert_eq!(path.as_deref(), Some(camino::Utf8Path::new("/games/mods")));
                assert_eq!(exclude, vec!["Core".to_string(), "UI".to_string()]);
                assert!(!resume);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_search_path_is_optional() {
        let args = Args::parse_from(["mod-bisector", "search", "0x9A3C01F2"]);
        assert_eq!(args.config_dir.as_str(), "mod-bisector-data");
        assert!(matches!(
            args.command,
            Commands::Search { ref hash, path: None } if hash == "0x9A3C01F2"
        ));
    }

    #[test]
    fn test_command_is_required() {
        assert!(Args::try_parse_from(["mod-bisector"]).is_err());
    }
}
