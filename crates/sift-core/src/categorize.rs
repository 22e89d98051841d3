//! Single-transaction AI categorization

use tracing::info;

use crate::bulk::TransactionView;
use crate::error::Result;
use crate::models::SingleCategorizeOutcome;
use crate::service::TransactionService;

/// Ask the service to categorize one transaction
pub async fn categorize_one(
    service: &dyn TransactionService,
    transaction_id: i64,
) -> Result<SingleCategorizeOutcome> {
    let outcome: SingleCategorizeOutcome = service.categorize_one(transaction_id).await?.into();
    info!("AI categorize {}: {:?}", transaction_id, outcome);
    Ok(outcome)
}

impl TransactionView {
    /// Reconcile after a single categorization
    ///
    /// When similar transactions were also updated the affected set is unknown,
    /// so the view is marked stale. Otherwise only the categorized row leaves
    /// the list. Suggestions change nothing.
    pub fn apply_single_outcome(&mut self, transaction_id: i64, outcome: &SingleCategorizeOutcome) {
        match outcome {
            SingleCategorizeOutcome::Categorized { .. } if outcome.touched_others() => {
                self.mark_stale();
            }
            SingleCategorizeOutcome::Categorized { .. } => {
                self.remove(transaction_id);
            }
            SingleCategorizeOutcome::SuggestionCreated { .. }
            | SingleCategorizeOutcome::Other { .. } => {}
        }
    }
}
