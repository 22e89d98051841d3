//! Natural-language search command

use anyhow::{Context, Result};
use sift_core::{
    ClientConfig, DateRange, FilterControls, Interpretation, SearchSession, TransactionService,
};
use tracing::debug;

use super::truncate;

fn describe_date_range(range: &DateRange) -> String {
    match range {
        DateRange::AllTime => "All time".to_string(),
        DateRange::Custom { start, end } => {
            let start = start.map(|d| d.to_string()).unwrap_or_else(|| "…".into());
            let end = end.map(|d| d.to_string()).unwrap_or_else(|| "…".into());
            format!("{} to {}", start, end)
        }
    }
}

fn print_controls(controls: &FilterControls) {
    let category = controls
        .category_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "Any".into());
    println!("   Category:    {}", category);
    if let Some(sub) = controls.subcategory_id {
        println!("   Subcategory: {}", sub);
    }
    println!("   Dates:       {}", describe_date_range(&controls.date_range));
}

/// Read-only lines for filter fields without a control
fn residual_lines(interpretation: &Interpretation) -> Vec<String> {
    interpretation
        .residual
        .iter()
        .map(|chip| format!("   {}", chip.label))
        .collect()
}

/// Search, then optionally jump to a later page
///
/// Later pages replay the filter the service interpreted from the query.
pub async fn cmd_search(
    service: &dyn TransactionService,
    config: &ClientConfig,
    query: &str,
    page: u32,
    json: bool,
) -> Result<SearchSession> {
    let mut session = SearchSession::new(config.page_size);
    session
        .search(service, query)
        .await
        .context("Search failed")?;
    if let Some(filter) = session.captured_filter() {
        debug!(
            "Interpreted filter: {}",
            serde_json::Value::Object(filter.clone())
        );
    }

    if page > 1 {
        session
            .fetch_page(service, page)
            .await
            .with_context(|| format!("Failed to fetch page {}", page))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(session.results())?);
        return Ok(session);
    }

    println!("🔍 \"{}\"", session.query().unwrap_or(query));
    print_controls(session.controls());
    if let Some(interpretation) = session.interpretation() {
        for line in residual_lines(interpretation) {
            println!("{}", line);
        }
    }
    println!();

    if session.results().is_empty() {
        println!("   No transactions found.");
        return Ok(session);
    }

    println!("   {:>8}  {:10}  {:>10}  Description", "ID", "Date", "Amount");
    println!("   {}", "-".repeat(70));
    for tx in session.results() {
        println!(
            "   {:>8}  {}  {:>10.2}  {}",
            tx.id,
            tx.date,
            tx.amount,
            truncate(&tx.description, 40)
        );
    }
    println!();
    println!(
        "   Page {} of {} ({} results)",
        session.page(),
        session.total_pages(),
        session.total()
    );

    Ok(session)
}
