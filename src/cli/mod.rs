//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{AbortCommand, ContinueCommand, ListCommand, StartCommand};

/// Resumable multi-step pipeline runner
#[derive(Debug, Parser, Clone)]
#[command(name = "stepwise")]
#[command(version = "0.1.0")]
#[command(about = "Run long-lived pipelines across separate invocations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the pipeline configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Begin a new run of a pipeline
    Start(StartCommand),

    /// Resume an in-progress pipeline
    #[command(name = "continue")]
    Continue(ContinueCommand),

    /// Abandon an in-progress pipeline
    Abort(AbortCommand),

    /// List defined pipelines and their run status
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

use std::ffi::OsString;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_with_force() {
        let cli = Cli::try_parse_from(["stepwise", "start", "release", "--force"]).unwrap();
        match cli.command {
            Command::Start(cmd) => {
                assert_eq!(cmd.pipeline, "release");
                assert!(cmd.force);
            }
            other => panic!("expected start, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_continue() {
        let cli = Cli::try_parse_from(["stepwise", "continue", "release"]).unwrap();
        assert!(matches!(cli.command, Command::Continue(_)));
    }

    #[test]
    fn test_parse_global_config() {
        let cli =
            Cli::try_parse_from(["stepwise", "--config", "other.yaml", "list"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("other.yaml"));
    }
}
