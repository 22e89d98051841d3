//! Similar-transaction lookup command

use anyhow::Result;
use sift_core::{SimilarityFetcher, SimilarityResult, TransactionService};

use super::print_candidates;

/// Show transactions similar to an anchor
///
/// Lookup failures degrade to an empty list rather than an error.
pub async fn cmd_similar(
    service: &dyn TransactionService,
    id: i64,
    pattern: Option<&str>,
) -> Result<SimilarityResult> {
    let result = SimilarityFetcher::new(service)
        .fetch_similar(id, pattern)
        .await;

    println!("🔎 Transactions similar to #{}", id);
    if result.pattern.is_empty() {
        println!("   Pattern: (none)");
    } else {
        println!("   Pattern: {}", result.pattern);
    }
    if let Some(rule) = &result.matching_rule {
        println!("   Existing rule: {} ({})", rule.name, rule.pattern);
    }
    println!();

    if result.candidates.is_empty() {
        println!("   No similar transactions found.");
        return Ok(result);
    }

    print_candidates(&result.candidates, None);
    println!();
    if result.has_unfetched_matches() {
        println!(
            "   Showing {} of {} matches",
            result.candidates.len(),
            result.total_count
        );
    } else {
        println!("   {} matches", result.total_count);
    }

    Ok(result)
}
