//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Museflow - idea research agent
#[derive(Parser)]
#[command(
    name = "museflow",
    about = "LLM-orchestrated idea research and brainstorming backend",
    version,
    after_help = "Logs are written to: ~/.local/share/museflow/logs/museflow.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the research agent for a request
    Run {
        /// The research request
        request: String,

        /// Continuation id; reuse one to resume an interrupted run
        #[arg(short, long)]
        thread: Option<String>,

        /// Write a JSON snapshot of the final state to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create and print a plan without executing it
    Plan {
        /// The research request
        request: String,
    },

    /// Show the checkpointed status board of a run
    Status {
        /// Continuation id of the run
        #[arg(short, long)]
        thread: String,
    },
}
