//! Command-line argument parsing for Parley.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ask questions about a business database in plain English.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Database file path (overrides config)
    #[arg(long, value_name = "PATH", env = "PARLEY_DB")]
    pub db: Option<PathBuf>,

    /// LLM provider to use (overrides config)
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Model name (overrides config)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a question about the data
    Ask {
        /// The question, in plain English
        #[arg(value_name = "QUESTION", trailing_var_arg = true)]
        question: Vec<String>,

        /// Print the full response envelope as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the discovered database schema
    Schema {
        /// Print the schema as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print example questions to try
    Suggest,
    /// Download the dataset and rebuild the database
    Setup,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }
}
