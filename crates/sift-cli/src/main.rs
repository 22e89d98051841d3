//! Sift CLI - Bulk recategorization and AI search
//!
//! Usage:
//!   sift similar 42                        Show transactions similar to #42
//!   sift recategorize 42 --category 5      Move #42 and its matches to category 5
//!   sift categorize --limit 100            Batch AI categorization with progress
//!   sift search "amazon this year"         Natural-language search

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref(), cli.api_url.as_deref())?;
    let service = commands::connect(&config);

    match cli.command {
        Commands::Similar { id, pattern } => {
            commands::cmd_similar(&service, id, pattern.as_deref())
                .await
                .map(|_| ())
        }
        Commands::Recategorize {
            id,
            category,
            subcategory,
            pattern,
            all,
            only_anchor,
            create_rule,
            rule_name,
            apply_to_all,
            dry_run,
        } => {
            let scope = if all {
                commands::SelectScope::All
            } else if only_anchor {
                commands::SelectScope::AnchorOnly
            } else {
                commands::SelectScope::MatchingPattern
            };
            let options = commands::RecategorizeOptions {
                category_id: category,
                subcategory_id: subcategory,
                pattern,
                scope,
                create_rule,
                rule_name,
                apply_to_all,
                dry_run,
            };
            commands::cmd_recategorize(&service, id, &options).await.map(|_| ())
        }
        Commands::Categorize { limit, dry_run } => {
            let limit = limit.unwrap_or(config.batch_limit);
            commands::cmd_categorize(&service, &config, limit, dry_run)
                .await
                .map(|_| ())
        }
        Commands::CategorizeOne { id } => commands::cmd_categorize_one(&service, id)
            .await
            .map(|_| ()),
        Commands::Search { query, page, json } => {
            commands::cmd_search(&service, &config, &query, page, json)
                .await
                .map(|_| ())
        }
    }
}
