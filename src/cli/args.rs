//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `run`: Build the task tree of a document and run one task
//! - `tasks`: List the registered tasks with their descriptions
//! - `tree`: Show the task tree
//! - `show-config`: Show configuration discovery information

use crate::config::RuntimeMode;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug)]
pub enum ExecutionMode {
    Run(RunConfig),
    ListTasks(DocumentConfig),
    Tree(DocumentConfig),
    ShowConfig,
}

#[derive(Debug)]
pub struct RunConfig {
    /// Task to run; the configured default task when absent
    pub task: Option<String>,
    pub document: DocumentConfig,
    /// Build mode forced on the command line
    pub mode: Option<RuntimeMode>,
}

#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub file: Option<PathBuf>,
    pub config_override: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug, Parser)]
#[command(name = "taskchef")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build task trees from nested configuration documents and run them")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options shared by every command that loads a task document
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct DocumentArgs {
    /// Task document (JSON or TOML)
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,
    /// Configuration file path
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl From<&DocumentArgs> for DocumentConfig {
    fn from(args: &DocumentArgs) -> Self {
        Self {
            file: args.file.clone(),
            config_override: args.config.clone(),
            verbose: args.verbose,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a task and everything it depends on
    Run {
        /// Task name (e.g. `build` or `build:scripts`)
        task: Option<String>,
        #[command(flatten)]
        document: DocumentArgs,
        /// Run tasks marked for production (`name!`), skip development-only ones
        #[arg(long = "production", conflicts_with = "development")]
        production: bool,
        /// Run tasks marked for development (`name?`), skip production-only ones
        #[arg(long = "development")]
        development: bool,
    },
    /// List registered tasks with their descriptions
    Tasks {
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// Show the task tree
    Tree {
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// Show configuration discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Run {
                task,
                document,
                production,
                development,
            }) => {
                let mode = match (*production, *development) {
                    (true, true) => {
                        return Err(
                            "--production and --development cannot be used together".to_string()
                        );
                    }
                    (true, false) => Some(RuntimeMode::Production),
                    (false, true) => Some(RuntimeMode::Development),
                    (false, false) => None,
                };
                Ok(ExecutionMode::Run(RunConfig {
                    task: task.clone(),
                    document: document.into(),
                    mode,
                }))
            }
            Some(Commands::Tasks { document }) => Ok(ExecutionMode::ListTasks(document.into())),
            Some(Commands::Tree { document }) => Ok(ExecutionMode::Tree(document.into())),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            None => Err(
                "No command specified. Use 'taskchef --help' to see available commands."
                    .to_string(),
            ),
        }
    }
}
