//! Command-line interface for Postboard.

mod commands;

use clap::{Parser, Subcommand};

/// Postboard - a small multi-user message board
#[derive(Parser)]
#[command(name = "postboard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (the default when no command is given)
    #[command(alias = "daemon", alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// List registered users and how many messages each has posted
    #[command(alias = "ls")]
    Users,
}

pub use commands::*;
