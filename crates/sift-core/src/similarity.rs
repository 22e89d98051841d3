//! Similar-transaction lookup for an anchor transaction
//!
//! The service returns the candidates it actually fetched plus a total match
//! count, which may be larger than the candidate list. Callers must not assume
//! the candidates are the complete affected set.
//!
//! Lookup failures degrade to an empty result instead of an error: this only
//! feeds an optional bulk-assist feature, and the primary single-transaction
//! edit must keep working without it.

use tracing::{debug, warn};

use crate::models::{Rule, SimilarResponse, TransactionSummary};
use crate::selection::SelectionState;
use crate::service::TransactionService;

/// How a similarity result was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// Pattern omitted; the service derived it from the anchor
    Initial,
    /// Caller supplied a (possibly hand-edited) pattern
    Refresh,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub anchor_id: i64,
    pub pattern: String,
    pub candidates: Vec<TransactionSummary>,
    /// Server-side match count; may exceed `candidates.len()`
    pub total_count: u64,
    pub matching_rule: Option<Rule>,
    pub kind: FetchKind,
}

impl SimilarityResult {
    /// Degraded result used when the lookup fails
    pub fn empty(anchor_id: i64, kind: FetchKind, pattern: Option<&str>) -> Self {
        Self {
            anchor_id,
            pattern: pattern.unwrap_or_default().to_string(),
            candidates: Vec::new(),
            total_count: 0,
            matching_rule: None,
            kind,
        }
    }

    fn from_response(anchor_id: i64, kind: FetchKind, response: SimilarResponse) -> Self {
        Self {
            anchor_id,
            pattern: response.pattern,
            candidates: response.similar,
            total_count: response.total_count,
            matching_rule: response.matching_rule,
            kind,
        }
    }

    /// Whether the service knows of matches that were not returned as candidates
    pub fn has_unfetched_matches(&self) -> bool {
        self.total_count > self.candidates.len() as u64
    }

    pub fn anchor(&self) -> Option<&TransactionSummary> {
        self.candidates.iter().find(|c| c.id == self.anchor_id)
    }

    /// Initial lookups select only the anchor; refreshes select every candidate
    pub fn default_selection(&self) -> SelectionState {
        let mut selection = SelectionState::new(self.anchor_id);
        if self.kind == FetchKind::Refresh {
            selection.select_all(&self.candidates);
        }
        selection
    }
}

/// Fetches similarity results, never failing
pub struct SimilarityFetcher<'a> {
    service: &'a dyn TransactionService,
}

impl<'a> SimilarityFetcher<'a> {
    pub fn new(service: &'a dyn TransactionService) -> Self {
        Self { service }
    }

    pub async fn fetch_similar(&self, anchor_id: i64, pattern: Option<&str>) -> SimilarityResult {
        let kind = if pattern.is_some() {
            FetchKind::Refresh
        } else {
            FetchKind::Initial
        };

        match self.service.similar(anchor_id, pattern).await {
            Ok(response) => {
                debug!(
                    "Similarity for {}: {} candidates, {} total",
                    anchor_id,
                    response.similar.len(),
                    response.total_count
                );
                SimilarityResult::from_response(anchor_id, kind, response)
            }
            Err(e) => {
                warn!("Similar lookup for transaction {} failed: {}", anchor_id, e);
                SimilarityResult::empty(anchor_id, kind, pattern)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::HttpTransactionService;
    use crate::test_utils::{MockFixture, MockTransactionService};

    #[tokio::test]
    async fn test_initial_fetch_defaults_to_anchor_only() {
        let mock = MockTransactionService::start(MockFixture::amazon()).await;
        let service = HttpTransactionService::new(&mock.url());
        let fetcher = SimilarityFetcher::new(&service);

        let result = fetcher.fetch_similar(42, None).await;
        assert_eq!(result.kind, FetchKind::Initial);
        assert_eq!(result.pattern, "AMZN%");
        assert_eq!(result.candidates.len(), 3);
        assert_eq!(result.default_selection().ids(), vec![42]);
    }

    #[tokio::test]
    async fn test_refresh_defaults_to_all_candidates() {
        let mock = MockTransactionService::start(MockFixture::amazon()).await;
        let service = HttpTransactionService::new(&mock.url());
        let fetcher = SimilarityFetcher::new(&service);

        let result = fetcher.fetch_similar(42, Some("AMZN%")).await;
        assert_eq!(result.kind, FetchKind::Refresh);
        assert_eq!(result.default_selection().ids(), vec![42, 43, 44]);
    }

    #[tokio::test]
    async fn test_total_count_may_exceed_candidates() {
        let mut fixture = MockFixture::amazon();
        fixture.similar_total = 50;
        let mock = MockTransactionService::start(fixture).await;
        let service = HttpTransactionService::new(&mock.url());

        let result = SimilarityFetcher::new(&service).fetch_similar(42, None).await;
        assert_eq!(result.total_count, 50);
        assert!(result.has_unfetched_matches());
    }

    #[tokio::test]
    async fn test_failure_degrades_to_empty() {
        // Nothing listens on this port
        let service = HttpTransactionService::new("http://127.0.0.1:9/api");
        let fetcher = SimilarityFetcher::new(&service);

        let result = fetcher.fetch_similar(42, Some("AMZN%")).await;
        assert!(result.candidates.is_empty());
        assert_eq!(result.total_count, 0);
        assert_eq!(result.pattern, "AMZN%");
        assert!(result.matching_rule.is_none());
        assert_eq!(result.default_selection().ids(), vec![42]);
    }

    #[tokio::test]
    async fn test_matching_rule_surfaced() {
        let mut fixture = MockFixture::amazon();
        fixture.matching_rule = Some(Rule {
            id: Some(3),
            name: "Amazon".to_string(),
            pattern: "AMZN%".to_string(),
            category_id: 5,
            subcategory_id: Some(12),
        });
        let mock = MockTransactionService::start(fixture).await;
        let service = HttpTransactionService::new(&mock.url());

        let result = SimilarityFetcher::new(&service).fetch_similar(42, None).await;
        let rule = result.matching_rule.expect("rule");
        assert_eq!(rule.name, "Amazon");
        assert_eq!(rule.subcategory_id, Some(12));
    }
}
