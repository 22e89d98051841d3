//! Bulk recategorization command

use anyhow::{bail, Context, Result};
use sift_core::{BulkOutcome, RecategorizeSession, TransactionService};

use super::print_candidates;

/// Which candidates to include in the bulk update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectScope {
    /// Every fetched candidate
    All,
    /// Candidates matching the pattern locally
    MatchingPattern,
    AnchorOnly,
}

#[derive(Debug, Clone)]
pub struct RecategorizeOptions {
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    pub pattern: Option<String>,
    pub scope: SelectScope,
    pub create_rule: bool,
    pub rule_name: Option<String>,
    pub apply_to_all: bool,
    pub dry_run: bool,
}

/// Recategorize an anchor and its similar transactions
///
/// Returns `None` for a dry run.
pub async fn cmd_recategorize(
    service: &dyn TransactionService,
    id: i64,
    options: &RecategorizeOptions,
) -> Result<Option<BulkOutcome>> {
    let mut session = RecategorizeSession::open(service, id).await;

    if let Some(pattern) = options.pattern.as_deref() {
        session.refresh_with_pattern(service, pattern).await;
    }
    if session.result().candidates.is_empty() {
        println!("⚠️  No similar transactions found for #{}; updating it alone", id);
    }

    match options.scope {
        SelectScope::All => session.select_all(),
        SelectScope::AnchorOnly => session.select_none(),
        SelectScope::MatchingPattern => {
            session
                .select_matching_pattern()
                .context("Invalid pattern")?;
        }
    }

    if options.create_rule {
        session.set_create_rule(true);
    }
    if let Some(name) = options.rule_name.as_deref() {
        session.set_rule_name(name);
    }
    session.set_apply_to_all(options.apply_to_all);

    println!(
        "🏷️  Recategorizing {} transaction(s) like #{} to category {}",
        session.selection().len(),
        session.anchor_id(),
        options.category_id
    );
    println!("   Pattern: {}", session.rule().pattern);
    print_candidates(&session.result().candidates, Some(session.selection()));
    println!();

    let request = session.build_request(Some(options.category_id), options.subcategory_id)?;
    if request.create_rule {
        println!(
            "   Rule: {} → {}",
            request.rule_name.as_deref().unwrap_or("(unnamed)"),
            request.rule_pattern.as_deref().unwrap_or("")
        );
    }
    if request.expands_server_side() {
        println!("   Also updating every match of the pattern server-side");
    } else if session.apply_to_all() {
        println!("⚠️  --apply-to-all ignored: no pattern to match server-side");
    } else if session.remaining_unselected() > 0 {
        println!(
            "   {} other match(es) will be left unchanged",
            session.remaining_unselected()
        );
    }

    if options.dry_run {
        println!();
        println!("Dry run: nothing submitted. Fields that would be sent:");
        for (key, value) in request.form_fields() {
            println!("   {} = {}", key, value);
        }
        return Ok(None);
    }

    let outcome = match session
        .submit(service, Some(options.category_id), options.subcategory_id)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => bail!("Bulk update failed: {}", e),
    };

    match &outcome {
        BulkOutcome::RemovedLocally(ids) => {
            println!("✅ Updated {} transaction(s)", ids.len());
        }
        BulkOutcome::RefetchRequired => {
            println!("✅ Updated all transactions matching {}", session.rule().pattern);
            println!("   Reload your transaction list to see the changes");
        }
    }

    Ok(Some(outcome))
}
