//! Shared utilities for commands
//!
//! This module contains:
//! - `load_config` - Resolve client config from file, env and flags
//! - `connect` - Build the HTTP service client
//! - `print_candidates` - Table output for similar-transaction lists

use std::path::Path;

use anyhow::{Context, Result};
use sift_core::{ClientConfig, HttpTransactionService, SelectionState, TransactionSummary};

use super::truncate;

/// Load config; `--api-url` wins over `SIFT_API_URL` and the file
pub fn load_config(path: Option<&Path>, api_url: Option<&str>) -> Result<ClientConfig> {
    let mut config =
        ClientConfig::from_env_or_file(path).context("Failed to load client config")?;
    if let Some(url) = api_url.map(str::trim).filter(|u| !u.is_empty()) {
        config.base_url = url.to_string();
    }
    Ok(config)
}

pub fn connect(config: &ClientConfig) -> HttpTransactionService {
    HttpTransactionService::from_config(config)
}

/// Print candidates with a selection marker column
pub fn print_candidates(candidates: &[TransactionSummary], selection: Option<&SelectionState>) {
    println!(
        "   {:>8}  {:10}  {:>10}  Description",
        "ID", "Date", "Amount"
    );
    println!("   {}", "-".repeat(70));
    for c in candidates {
        let mark = match selection {
            Some(s) if s.contains(c.id) => "[x]",
            Some(_) => "[ ]",
            None => "   ",
        };
        println!(
            "{}{:>8}  {}  {:>10.2}  {}",
            mark,
            c.id,
            c.date,
            c.amount,
            truncate(&c.description, 40)
        );
    }
}
