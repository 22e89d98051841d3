//! Atomic bulk recategorization
//!
//! One submission assigns a category (and optional subcategory) to a set of
//! transactions, optionally creates or updates a single rule, and optionally
//! asks the service to expand the update to every server-side pattern match.
//!
//! The outcome decides how the local view is reconciled:
//! - explicit ids only: exactly those ids changed, so they are removed locally
//! - server-side expansion: the affected set is unknown to the client, so the
//!   whole view is stale and must be refetched
//!
//! Submissions are never retried. Rule creation is not idempotent server-side.

use tracing::info;

use crate::error::{Error, Result};
use crate::models::Transaction;
use crate::selection::SelectionState;
use crate::service::TransactionService;

/// Wire request for `POST transactions/bulk-update`
///
/// An explicit id list and `apply_to_all_matching` may both be set. The
/// service decides how they combine; the client only ever assumes the
/// affected set is unknown when expansion is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkUpdateRequest {
    pub transaction_ids: Vec<i64>,
    pub category_id: i64,
    pub subcategory_id: Option<i64>,
    pub create_rule: bool,
    pub rule_name: Option<String>,
    pub rule_pattern: Option<String>,
    pub apply_to_all_matching: bool,
}

impl BulkUpdateRequest {
    /// Whether the service was asked to update matches beyond the id list
    pub fn expands_server_side(&self) -> bool {
        self.apply_to_all_matching
            && self
                .rule_pattern
                .as_deref()
                .is_some_and(|p| !p.trim().is_empty())
    }

    /// Form-encoded body fields
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields: Vec<(&'static str, String)> = self
            .transaction_ids
            .iter()
            .map(|id| ("transaction_ids[]", id.to_string()))
            .collect();

        fields.push(("category_id", self.category_id.to_string()));
        if let Some(sub) = self.subcategory_id {
            fields.push(("subcategory_id", sub.to_string()));
        }
        if self.create_rule {
            fields.push(("create_rule", "true".to_string()));
            if let Some(ref name) = self.rule_name {
                fields.push(("rule_name", name.clone()));
            }
        }
        if self.create_rule || self.expands_server_side() {
            if let Some(ref pattern) = self.rule_pattern {
                fields.push(("rule_pattern", pattern.clone()));
            }
        }
        if self.expands_server_side() {
            fields.push(("update_all_similar", "true".to_string()));
        }
        fields
    }
}

/// Rule to create or update alongside the bulk write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOptions {
    pub name: Option<String>,
    pub pattern: Option<String>,
}

/// How the caller must reconcile its local view after a successful submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    /// Exactly these ids were updated; drop them from the local list
    RemovedLocally(Vec<i64>),
    /// The service expanded the update; every local candidate is stale
    RefetchRequired,
}

/// Builds and submits bulk updates
pub struct BulkRecategorizer<'a> {
    service: &'a dyn TransactionService,
}

impl<'a> BulkRecategorizer<'a> {
    pub fn new(service: &'a dyn TransactionService) -> Self {
        Self { service }
    }

    /// Validate inputs and build the request
    ///
    /// `pattern` is the current (possibly hand-edited) similarity pattern; it is
    /// used for server-side expansion and as the rule pattern unless the rule
    /// options carry their own.
    pub fn build(
        selection: &SelectionState,
        category_id: Option<i64>,
        subcategory_id: Option<i64>,
        rule: Option<RuleOptions>,
        apply_to_all_matching: bool,
        pattern: Option<&str>,
    ) -> Result<BulkUpdateRequest> {
        let category_id =
            category_id.ok_or_else(|| Error::InvalidRequest("No category selected".into()))?;
        if selection.is_empty() {
            return Err(Error::InvalidRequest("No transactions selected".into()));
        }

        let pattern = pattern.map(str::trim).filter(|p| !p.is_empty());
        let (create_rule, rule_name, rule_pattern) = match rule {
            Some(options) => (
                true,
                options.name.filter(|n| !n.trim().is_empty()),
                options
                    .pattern
                    .filter(|p| !p.trim().is_empty())
                    .or_else(|| pattern.map(str::to_string)),
            ),
            None => (false, None, pattern.map(str::to_string)),
        };

        Ok(BulkUpdateRequest {
            transaction_ids: selection.ids(),
            category_id,
            subcategory_id,
            create_rule,
            rule_name,
            rule_pattern,
            apply_to_all_matching,
        })
    }

    /// Submit once. A failure leaves local state untouched for the caller to report.
    pub async fn submit(&self, request: &BulkUpdateRequest) -> Result<BulkOutcome> {
        self.service.bulk_update(request).await?;

        if request.expands_server_side() {
            info!(
                "Bulk update expanded to all matches of {:?}; local view is stale",
                request.rule_pattern
            );
            Ok(BulkOutcome::RefetchRequired)
        } else {
            info!(
                "Bulk updated {} transactions to category {}",
                request.transaction_ids.len(),
                request.category_id
            );
            Ok(BulkOutcome::RemovedLocally(request.transaction_ids.clone()))
        }
    }
}

/// Client-side cache of the currently displayed transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionView {
    transactions: Vec<Transaction>,
    stale: bool,
}

impl TransactionView {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self {
            transactions,
            stale: false,
        }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn needs_refetch(&self) -> bool {
        self.stale
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Install a freshly fetched slice
    pub fn replace(&mut self, transactions: Vec<Transaction>) {
        self.transactions = transactions;
        self.stale = false;
    }

    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id != id);
        self.transactions.len() != before
    }

    /// Reconcile after a successful bulk submit. Returns how many rows were dropped.
    pub fn apply_bulk_outcome(&mut self, outcome: &BulkOutcome) -> usize {
        match outcome {
            BulkOutcome::RemovedLocally(ids) => {
                let before = self.transactions.len();
                self.transactions.retain(|t| !ids.contains(&t.id));
                before - self.transactions.len()
            }
            BulkOutcome::RefetchRequired => {
                self.stale = true;
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(id: i64) -> Transaction {
        Transaction {
            id,
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            amount: -20.0,
            description: format!("AMZN {}", id),
            normalized_description: None,
            category_id: None,
            subcategory_id: None,
            uncertain: true,
        }
    }

    fn selection(anchor: i64, others: &[i64]) -> SelectionState {
        let mut s = SelectionState::new(anchor);
        for id in others {
            s.toggle(*id);
        }
        s
    }

    #[test]
    fn test_build_requires_category() {
        let err = BulkRecategorizer::build(&selection(42, &[]), None, None, None, false, None)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn test_build_plain_request() {
        let request = BulkRecategorizer::build(
            &selection(42, &[43, 44]),
            Some(5),
            Some(9),
            None,
            false,
            Some("AMZN%"),
        )
        .unwrap();

        assert_eq!(request.transaction_ids, vec![42, 43, 44]);
        assert!(!request.create_rule);
        assert!(!request.expands_server_side());
        assert_eq!(
            request.form_fields(),
            vec![
                ("transaction_ids[]", "42".to_string()),
                ("transaction_ids[]", "43".to_string()),
                ("transaction_ids[]", "44".to_string()),
                ("category_id", "5".to_string()),
                ("subcategory_id", "9".to_string()),
            ]
        );
    }

    #[test]
    fn test_rule_pattern_defaults_to_similarity_pattern() {
        let request = BulkRecategorizer::build(
            &selection(42, &[]),
            Some(5),
            None,
            Some(RuleOptions {
                name: Some("Amazon".to_string()),
                pattern: None,
            }),
            false,
            Some("AMZN%"),
        )
        .unwrap();

        let fields = request.form_fields();
        assert!(fields.contains(&("create_rule", "true".to_string())));
        assert!(fields.contains(&("rule_name", "Amazon".to_string())));
        assert!(fields.contains(&("rule_pattern", "AMZN%".to_string())));
        assert!(!fields.iter().any(|(k, _)| *k == "update_all_similar"));
    }

    #[test]
    fn test_apply_to_all_carries_ids_and_pattern() {
        let request = BulkRecategorizer::build(
            &selection(42, &[43]),
            Some(5),
            None,
            None,
            true,
            Some("AMZN%"),
        )
        .unwrap();

        assert!(request.expands_server_side());
        let fields = request.form_fields();
        assert!(fields.contains(&("transaction_ids[]", "42".to_string())));
        assert!(fields.contains(&("transaction_ids[]", "43".to_string())));
        assert!(fields.contains(&("update_all_similar", "true".to_string())));
        assert!(fields.contains(&("rule_pattern", "AMZN%".to_string())));
        assert!(!fields.iter().any(|(k, _)| *k == "create_rule"));
    }

    #[test]
    fn test_apply_to_all_without_pattern_stays_explicit() {
        let request =
            BulkRecategorizer::build(&selection(42, &[]), Some(5), None, None, true, Some("  "))
                .unwrap();
        assert!(!request.expands_server_side());
        assert!(!request
            .form_fields()
            .iter()
            .any(|(k, _)| *k == "update_all_similar"));
    }

    #[test]
    fn test_view_removes_exact_ids() {
        let mut view = TransactionView::new(vec![tx(41), tx(42), tx(43), tx(44), tx(45)]);
        let removed = view.apply_bulk_outcome(&BulkOutcome::RemovedLocally(vec![42, 43, 44]));
        assert_eq!(removed, 3);
        let ids: Vec<i64> = view.transactions().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![41, 45]);
        assert!(!view.needs_refetch());
    }

    #[test]
    fn test_view_refetch_keeps_rows_and_marks_stale() {
        let mut view = TransactionView::new(vec![tx(42), tx(43), tx(44)]);
        let removed = view.apply_bulk_outcome(&BulkOutcome::RefetchRequired);
        assert_eq!(removed, 0);
        assert_eq!(view.len(), 3);
        assert!(view.needs_refetch());

        view.replace(vec![tx(50)]);
        assert!(!view.needs_refetch());
        assert_eq!(view.len(), 1);
    }
}
