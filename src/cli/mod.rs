//! Command-line interface.

mod commands;

use clap::{Parser, Subcommand};

/// DeepGuard - deepfake detection demo backend
#[derive(Parser)]
#[command(name = "deepguard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Connect to the configured storage backend and report its status
    #[command(alias = "-c", alias = "--check")]
    Check,
}

pub use commands::*;
