//! Command-line interface for medswap.
//!
//! This module provides the CLI structure for the `medswap` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ListCommand, OutputFormat, RegisterCommand, RenderCommand, RoleArg,
    StatsCommand, SuggestCommand,
};

use crate::logging::Verbosity;

/// medswap - Local registry of medicine donors and recipients
///
/// Register people who offer or need medicine, list and filter them, and
/// render the users page.
#[derive(Debug, Parser)]
#[command(name = "medswap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a donor or recipient
    Register(RegisterCommand),

    /// List registered users
    List(ListCommand),

    /// Render the users page as HTML
    Render(RenderCommand),

    /// Suggest medicine names
    Suggest(SuggestCommand),

    /// Show registration totals
    Stats(StatsCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
