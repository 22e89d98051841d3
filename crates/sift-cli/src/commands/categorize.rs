//! AI categorization commands

use std::io::Write;

use anyhow::{Context, Result};
use sift_core::{
    categorize_one, BatchCategorizer, BatchOutcome, ClientConfig, Notification, ProgressState,
    SingleCategorizeOutcome, TransactionService,
};

fn render_progress(state: &ProgressState) -> String {
    match (state.total, state.percent()) {
        (Some(total), Some(percent)) => {
            let filled = usize::from(percent) / 5;
            format!(
                "[{}{}] {:>3}%  {}/{}",
                "#".repeat(filled),
                "-".repeat(20 - filled),
                percent,
                state.processed,
                total
            )
        }
        _ => format!("{} processed", state.processed),
    }
}

fn print_notification(notification: &Notification) {
    let icon = match notification {
        Notification::Success(_) => "✅",
        Notification::Info(_) => "ℹ️ ",
        Notification::Error(_) => "❌",
    };
    println!("{} {}", icon, notification);
}

/// Run a batch categorization job, redrawing progress in place
pub async fn cmd_categorize(
    service: &dyn TransactionService,
    config: &ClientConfig,
    limit: u32,
    dry_run: bool,
) -> Result<BatchOutcome> {
    if dry_run {
        println!("🤖 Categorizing up to {} transactions (dry run)...", limit);
    } else {
        println!("🤖 Categorizing up to {} transactions...", limit);
    }

    let mut batch = BatchCategorizer::new(service, config.progress_clear_delay);
    let result = batch
        .run(limit, dry_run, |state| {
            print!("\r   {}", render_progress(state));
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();

    let outcome = result.context("Batch categorization failed")?;
    print_notification(&outcome.notification);
    batch.finish().await;
    if outcome.refresh_required {
        println!("   Reload your transaction list to see the changes");
    }
    Ok(outcome)
}

/// Categorize one transaction
pub async fn cmd_categorize_one(
    service: &dyn TransactionService,
    id: i64,
) -> Result<SingleCategorizeOutcome> {
    let outcome = categorize_one(service, id)
        .await
        .with_context(|| format!("Failed to categorize transaction #{}", id))?;

    print_notification(&outcome.notification());
    if outcome.touched_others() {
        println!("   Similar transactions were updated too; reload your list");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::{CategorizeStats, ProgressEvent};

    #[test]
    fn test_render_progress_with_total() {
        let mut state = ProgressState::new();
        state.apply(&ProgressEvent::Start { total: 10 });
        state.apply(&ProgressEvent::Progress {
            categorized: 5,
            current: 5,
        });
        assert_eq!(
            render_progress(&state),
            "[##########----------]  50%  5/10"
        );
    }

    #[test]
    fn test_render_progress_without_total() {
        let mut state = ProgressState::new();
        state.apply(&ProgressEvent::Complete {
            stats: CategorizeStats {
                categorized: 3,
                rules_created: 0,
            },
        });
        assert_eq!(render_progress(&state), "3 processed");
    }
}
