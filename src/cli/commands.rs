//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: one full verification turn against the configured backend
//! - check: a single judge call
//! - execute: the action executor on a raw artifact, no model call
//! - config: print the resolved configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vetloop - parse, judge and retry code-generating agent answers
#[derive(Parser, Debug)]
#[command(name = "vetloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one turn: generate, execute, check, retry
    Run {
        /// The user's question
        goal: String,

        /// Override retry.max-rounds
        #[arg(short, long)]
        max_rounds: Option<u32>,

        /// Description of the resources to explore
        #[arg(short, long)]
        information: Option<String>,

        /// Signatures of the tools the generated code may call
        #[arg(short, long)]
        tools: Option<String>,
    },

    /// Ask the judge once whether content answers a goal
    Check {
        /// The user's question
        #[arg(short, long)]
        goal: String,

        /// The content to judge
        #[arg(long)]
        content: String,
    },

    /// Parse a raw model answer and match it against the sentinel
    Execute {
        /// File holding the raw answer (stdin if omitted)
        file: Option<PathBuf>,
    },

    /// Print the resolved configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["vetloop"]).is_err());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::try_parse_from(["vetloop", "-v", "config"]).unwrap();
        assert!(cli.is_verbose());
    }

    #[test]
    fn test_cli_config_option() {
        let cli = Cli::try_parse_from(["vetloop", "config", "-c", "/path/to/vetloop.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/path/to/vetloop.yml")));
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from(["vetloop", "run", "list tables in taobao db"]).unwrap();
        match cli.command {
            Commands::Run {
                goal,
                max_rounds,
                information,
                tools,
            } => {
                assert_eq!(goal, "list tables in taobao db");
                assert!(max_rounds.is_none());
                assert!(information.is_none());
                assert!(tools.is_none());
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_run_with_options() {
        let cli = Cli::try_parse_from([
            "vetloop",
            "run",
            "list tables",
            "--max-rounds",
            "5",
            "-i",
            "mysql, database taobao",
            "-t",
            "def execute_sql_query(sql_query)",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                max_rounds,
                information,
                tools,
                ..
            } => {
                assert_eq!(max_rounds, Some(5));
                assert_eq!(information.as_deref(), Some("mysql, database taobao"));
                assert_eq!(tools.as_deref(), Some("def execute_sql_query(sql_query)"));
            }
            _ => panic!("Expected run command"),
        }
    }

    #[test]
    fn test_check_command() {
        let cli =
            Cli::try_parse_from(["vetloop", "check", "--goal", "list tables", "--content", "SHOW TABLES"]).unwrap();
        match cli.command {
            Commands::Check { goal, content } => {
                assert_eq!(goal, "list tables");
                assert_eq!(content, "SHOW TABLES");
            }
            _ => panic!("Expected check command"),
        }
    }

    #[test]
    fn test_execute_command() {
        let cli = Cli::try_parse_from(["vetloop", "execute", "answer.txt"]).unwrap();
        match cli.command {
            Commands::Execute { file } => assert_eq!(file, Some(PathBuf::from("answer.txt"))),
            _ => panic!("Expected execute command"),
        }

        let cli = Cli::try_parse_from(["vetloop", "execute"]).unwrap();
        assert!(matches!(cli.command, Commands::Execute { file: None }));
    }
}
