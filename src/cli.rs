use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Raft Peer Reaper
/// Removes terminated autoscaling instances from a Vault raft peer set
#[derive(Parser, Debug)]
#[command(name = "raft-peer-reaper")]
#[command(author = "REAM Team")]
#[command(version)]
#[command(about = "Remove terminated instances from a Vault raft peer set")]
#[command(long_about = "
Handles EC2 Auto Scaling `EC2 Instance-terminate Lifecycle Action` events by
removing the departing node from Vault's integrated-storage peer set.

Configuration is read from the environment:
  VAULT_ADDR                 store address (required)
  VAULT_TOKEN                static token, or
  awsRegion + secretID       fetch the token from AWS Secrets Manager

Usage examples:
  raft-peer-reaper                          # Serve the Lambda runtime API
  raft-peer-reaper invoke --event event.json
  cat event.json | raft-peer-reaper invoke --event -
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the Lambda runtime API (default)
    Lambda,

    /// Handle a single event and exit
    Invoke {
        /// Event JSON file, or `-` for stdin
        #[arg(short, long, value_name = "FILE")]
        event: PathBuf,
    },
}

impl Cli {
    pub fn command(&self) -> &Commands {
        self.command.as_ref().unwrap_or(&Commands::Lambda)
    }

    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_lambda() {
        let cli = Cli::parse_from(["raft-peer-reaper"]);
        assert!(matches!(cli.command(), Commands::Lambda));
        assert_eq!(cli.log_level(), "info");
    }

    #[test]
    fn test_invoke_command() {
        let cli = Cli::parse_from(["raft-peer-reaper", "invoke", "--event", "-", "--verbose"]);
        match cli.command() {
            Commands::Invoke { event } => assert_eq!(event, &PathBuf::from("-")),
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.log_level(), "debug");
    }
}
