//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sift - Bulk recategorization and AI search for your transactions
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Recategorize similar transactions and search them in plain language", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the per-user override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Transaction service URL (overrides config and SIFT_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List transactions similar to an anchor
    Similar {
        /// Anchor transaction ID
        id: i64,

        /// Wildcard pattern (`%` any run, `_` one character); derived by the service if omitted
        #[arg(short, long)]
        pattern: Option<String>,
    },

    /// Move an anchor and its similar transactions to a category
    Recategorize {
        /// Anchor transaction ID
        id: i64,

        /// Target category ID
        #[arg(short, long)]
        category: i64,

        /// Target subcategory ID
        #[arg(short, long)]
        subcategory: Option<i64>,

        /// Refine the similarity pattern before selecting
        #[arg(short, long)]
        pattern: Option<String>,

        /// Select every similar transaction (default: only those matching the pattern)
        #[arg(long)]
        all: bool,

        /// Only the anchor transaction
        #[arg(long, conflicts_with = "all")]
        only_anchor: bool,

        /// Create or update a rule for the pattern
        #[arg(long)]
        create_rule: bool,

        /// Rule name (defaults to the anchor's description)
        #[arg(long)]
        rule_name: Option<String>,

        /// Also update matches beyond the fetched list
        #[arg(long)]
        apply_to_all: bool,

        /// Show what would be sent without submitting
        #[arg(long)]
        dry_run: bool,
    },

    /// Run batch AI categorization with live progress
    Categorize {
        /// Maximum transactions to process (defaults to config)
        #[arg(short, long)]
        limit: Option<u32>,

        /// Report what would change without committing
        #[arg(long)]
        dry_run: bool,
    },

    /// AI-categorize a single transaction
    CategorizeOne {
        /// Transaction ID
        id: i64,
    },

    /// Natural-language transaction search
    Search {
        /// Query, e.g. "amazon purchases this year"
        query: String,

        /// Page to show (pages after the first replay the interpreted filter)
        #[arg(long, default_value = "1")]
        page: u32,

        /// Output raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
