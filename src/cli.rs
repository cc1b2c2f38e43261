//! Command-line interface of the `seqtask` binary.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (demo, config) and the
//! global flags (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sequential task orchestrator: runs jobs of tasks one after another.
#[derive(Debug, Parser)]
#[command(name = "seqtask", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file to load instead of ./seqtask.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a demonstration job made of numbered steps.
    Demo {
        /// Number of steps to queue.
        #[arg(long, default_value_t = 3)]
        tasks: u32,

        /// Step (1-based) whose task fails.
        #[arg(long)]
        fail_at: Option<u32>,

        /// Step (1-based) after which the job is asked to stop.
        #[arg(long)]
        stop_after: Option<u32>,

        /// Make every step swallow its own failure.
        #[arg(long, default_value_t = false)]
        silent: bool,

        /// Job name; overrides the configured one.
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the effective configuration as JSON.
    Config,
}
