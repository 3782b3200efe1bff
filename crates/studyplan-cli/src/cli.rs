//! CLI argument definitions for the study planner backend.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands. Every option falls back to an environment
//! variable, and `.env` is loaded before parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use studyplan_store::StoreConfig;
use studyplan_store::password::DEFAULT_ITERATIONS;

/// Study planner -- student accounts and progress over a JSON store.
#[derive(Parser)]
#[command(
    name = "studyplan",
    version,
    about = "Study planner backend -- student accounts and saved progress",
    long_about = "Serves the register, login, save-data and status endpoints over HTTP, \
                  persisting everything to a single JSON file."
)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Default log level when RUST_LOG is not set.
    #[arg(long, env = "STUDYPLAN_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct StoreArgs {
    /// Path of the JSON store file.
    #[arg(
        long,
        env = "STUDYPLAN_DATA_PATH",
        default_value = "data/students.json",
        global = true
    )]
    pub data_path: PathBuf,

    /// PBKDF2 iterations for new password hashes.
    #[arg(
        long,
        env = "STUDYPLAN_HASH_ITERATIONS",
        default_value_t = DEFAULT_ITERATIONS,
        global = true
    )]
    pub hash_iterations: u32,
}

impl StoreArgs {
    pub fn to_config(&self) -> StoreConfig {
        StoreConfig {
            data_path: self.data_path.clone(),
            hash_iterations: self.hash_iterations,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind the HTTP server to.
        #[arg(long, env = "STUDYPLAN_BIND", default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on.
        #[arg(long, short, env = "STUDYPLAN_PORT", default_value_t = 3000)]
        port: u16,
    },

    /// Show store statistics.
    Status,

    /// List registered students.
    Students {
        /// Print as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}
