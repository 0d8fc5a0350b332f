//! CLI interface for Mibu
//!
//! This module provides the command-line interface using clap's derive API.
//! Every command except `serve` runs once against the local database and exits.

use clap::{Parser, Subcommand};
use sdk::types::TravelMode;
use std::path::PathBuf;

/// Mibu personal assistant backend
///
/// Turns free-form commands into calendar, finance, shopping, health, notes,
/// travel and journal records, and serves the browser client's JSON API.
#[derive(Parser, Debug)]
#[command(name = "mibu")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server until Ctrl-C
    Serve {
        /// Bind address (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port (defaults to server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Classify a command, optionally executing it
    Plan {
        /// Free-form command text
        text: String,

        /// Execute the classification right away
        #[arg(long)]
        execute: bool,

        /// Create calendar events even when they conflict
        #[arg(long, requires = "execute")]
        force: bool,
    },

    /// Estimate travel time between two places
    Travel {
        from: String,
        to: String,

        /// driving, walking, bicycling or transit
        #[arg(long, value_parser = parse_mode, default_value = "transit")]
        mode: TravelMode,
    },

    /// Show directions API quota usage
    Usage,

    /// Shared free slots for several users
    Availability {
        /// User ids to compare
        #[arg(required = true)]
        user_ids: Vec<String>,

        /// Day to check (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Print today's briefing
    Briefing {
        /// User id (defaults to the configured user)
        #[arg(long)]
        user: Option<String>,
    },

    /// Insert demo records for the default user
    Seed,

    /// List the default user's records of one category
    List {
        /// calendar, finance, shopping, health, notes, travel or journal
        category: String,
    },
}

fn parse_mode(value: &str) -> Result<TravelMode, String> {
    value.parse()
}
