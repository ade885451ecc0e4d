//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Corpusmill: compiled corpus checker
#[derive(Parser)]
#[command(name = "corpusmill")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a compiled corpus directory against its configuration
    Check {
        /// Corpus directory holding the tables
        #[arg(value_name = "DIR")]
        directory: PathBuf,

        /// Configuration file (default: <DIR>/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only check the configuration and table headers
        #[arg(long)]
        quick: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize the layers and attributes of a corpus configuration
    Inspect {
        /// Corpus directory holding config.json
        #[arg(value_name = "DIR")]
        directory: PathBuf,

        /// Configuration file (default: <DIR>/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::parse_from(["corpusmill", "check", "out", "--quick", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Check {
                directory,
                config,
                quick,
                json,
            } => {
                assert_eq!(directory, PathBuf::from("out"));
                assert!(config.is_none());
                assert!(quick);
                assert!(!json);
            }
            _ => panic!("expected the check command"),
        }
    }
}
