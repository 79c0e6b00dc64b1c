//! CLI command definitions and dispatch for the `stepchain` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod workflow;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run sequential LLM workflows with retries and durable run logs.
#[derive(Parser)]
#[command(name = "stepchain", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a workflow from a JSON file.
    Create {
        /// Path to the workflow JSON file.
        file: PathBuf,
    },

    /// List registered workflows.
    #[command(alias = "ls")]
    List,

    /// Execute a workflow and wait for it to finish.
    Run {
        /// Workflow name or UUID.
        workflow: String,
    },

    /// Show recent runs, optionally filtered to one workflow.
    Runs {
        /// Workflow name or UUID (omit for all workflows).
        workflow: Option<String>,

        /// Maximum number of runs to display.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show a single run with its step logs.
    Show {
        /// Workflow run UUID.
        run_id: String,
    },

    /// Delete a registered workflow.
    #[command(alias = "rm")]
    Delete {
        /// Workflow name or UUID.
        workflow: String,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
