//! Recategorization session for one anchor transaction
//!
//! Owns the similarity result, the selection, and the rule draft for a single
//! "recategorize this and similar transactions" interaction. All mutation goes
//! through methods so the selection invariant (anchor always selected) and the
//! stale-response guard hold.
//!
//! Fetches can be driven in two ways:
//! - `refresh_with_pattern` awaits the lookup while holding the session
//! - `begin_refresh` + `apply_fetch` let a UI keep the session responsive and
//!   issue overlapping lookups; only the latest one is applied

use tracing::debug;

use crate::bulk::{BulkOutcome, BulkRecategorizer, BulkUpdateRequest, RuleOptions};
use crate::error::Result;
use crate::models::TransactionSummary;
use crate::pattern::{suggest_pattern, WildcardPattern};
use crate::selection::SelectionState;
use crate::sequence::{RequestSequencer, Ticket};
use crate::service::TransactionService;
use crate::similarity::{FetchKind, SimilarityFetcher, SimilarityResult};

/// Rule settings that accompany the bulk write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleDraft {
    pub create: bool,
    pub name: String,
    pub pattern: String,
}

pub struct RecategorizeSession {
    anchor_id: i64,
    /// Match text of the anchor, kept so a degraded lookup can still suggest a pattern
    anchor_text: Option<String>,
    result: SimilarityResult,
    selection: SelectionState,
    rule: RuleDraft,
    apply_to_all: bool,
    sequencer: RequestSequencer,
}

impl RecategorizeSession {
    /// Session with no similarity data yet
    pub fn new(anchor_id: i64) -> Self {
        Self {
            anchor_id,
            anchor_text: None,
            result: SimilarityResult::empty(anchor_id, FetchKind::Initial, None),
            selection: SelectionState::new(anchor_id),
            rule: RuleDraft::default(),
            apply_to_all: false,
            sequencer: RequestSequencer::new(),
        }
    }

    /// Session for an anchor the caller already has on screen
    pub fn for_anchor(anchor: &TransactionSummary) -> Self {
        let mut session = Self::new(anchor.id);
        session.anchor_text = Some(anchor.match_text().to_string());
        session
    }

    /// Open a session and run the initial (service-derived pattern) lookup
    pub async fn open(service: &dyn TransactionService, anchor_id: i64) -> Self {
        Self::new(anchor_id).load(service).await
    }

    /// Like [`open`](Self::open), but a failed lookup still gets a pattern
    /// suggested from the anchor's description
    pub async fn open_for(service: &dyn TransactionService, anchor: &TransactionSummary) -> Self {
        Self::for_anchor(anchor).load(service).await
    }

    async fn load(mut self, service: &dyn TransactionService) -> Self {
        let ticket = self.sequencer.issue();
        let result = SimilarityFetcher::new(service)
            .fetch_similar(self.anchor_id, None)
            .await;
        self.apply_fetch(ticket, result);
        self
    }

    /// Tag a refetch with an edited pattern; the pattern also becomes the rule pattern
    pub fn begin_refresh(&mut self, pattern: &str) -> Ticket {
        self.rule.pattern = pattern.to_string();
        self.sequencer.issue()
    }

    /// Install a lookup result if it is the latest one issued
    ///
    /// Returns false when the result was stale and discarded.
    pub fn apply_fetch(&mut self, ticket: Ticket, result: SimilarityResult) -> bool {
        if !self.sequencer.accept(ticket, "similarity") {
            return false;
        }
        if result.anchor_id != self.anchor_id {
            debug!(
                "Ignoring similarity result for {} in session for {}",
                result.anchor_id, self.anchor_id
            );
            return false;
        }

        self.selection = result.default_selection();
        if let Some(anchor) = result.anchor() {
            self.anchor_text = Some(anchor.match_text().to_string());
        }

        if result.kind == FetchKind::Initial {
            match result.matching_rule {
                Some(ref rule) => {
                    self.rule = RuleDraft {
                        create: true,
                        name: rule.name.clone(),
                        pattern: rule.pattern.clone(),
                    };
                }
                None => {
                    let pattern = if result.pattern.is_empty() {
                        self.anchor_text
                            .as_deref()
                            .and_then(suggest_pattern)
                            .unwrap_or_default()
                    } else {
                        result.pattern.clone()
                    };
                    let name = self
                        .anchor_text
                        .clone()
                        .unwrap_or_else(|| pattern.trim_end_matches('%').trim().to_string());
                    self.rule = RuleDraft {
                        create: false,
                        name,
                        pattern,
                    };
                }
            }
        } else if !result.pattern.is_empty() {
            self.rule.pattern = result.pattern.clone();
        }

        self.result = result;
        true
    }

    /// Refetch candidates for an edited pattern and select all of them
    pub async fn refresh_with_pattern(
        &mut self,
        service: &dyn TransactionService,
        pattern: &str,
    ) -> bool {
        let ticket = self.begin_refresh(pattern);
        let result = SimilarityFetcher::new(service)
            .fetch_similar(self.anchor_id, Some(pattern))
            .await;
        self.apply_fetch(ticket, result)
    }

    pub fn anchor_id(&self) -> i64 {
        self.anchor_id
    }

    pub fn result(&self) -> &SimilarityResult {
        &self.result
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn rule(&self) -> &RuleDraft {
        &self.rule
    }

    pub fn apply_to_all(&self) -> bool {
        self.apply_to_all
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.result.candidates);
    }

    pub fn select_none(&mut self) {
        self.selection.select_none();
    }

    pub fn toggle(&mut self, id: i64) -> bool {
        self.selection.toggle(id)
    }

    /// Select candidates matching the current rule pattern, without a round trip
    ///
    /// Returns the resulting selection size.
    pub fn select_matching_pattern(&mut self) -> Result<usize> {
        let matcher = WildcardPattern::compile(&self.rule.pattern)?;
        self.selection
            .select_matching(&self.result.candidates, |c| matcher.matches(c.match_text()));
        Ok(self.selection.len())
    }

    /// Edit the pattern locally (no refetch)
    pub fn set_pattern(&mut self, pattern: &str) {
        self.rule.pattern = pattern.to_string();
    }

    pub fn set_create_rule(&mut self, create: bool) {
        self.rule.create = create;
    }

    pub fn set_rule_name(&mut self, name: &str) {
        self.rule.name = name.to_string();
    }

    pub fn set_apply_to_all(&mut self, apply: bool) {
        self.apply_to_all = apply;
    }

    /// Server-side matches the current selection does not cover
    pub fn remaining_unselected(&self) -> u64 {
        self.result
            .total_count
            .saturating_sub(self.selection.len() as u64)
    }

    pub fn build_request(
        &self,
        category_id: Option<i64>,
        subcategory_id: Option<i64>,
    ) -> Result<BulkUpdateRequest> {
        let rule = self.rule.create.then(|| RuleOptions {
            name: Some(self.rule.name.clone()),
            pattern: Some(self.rule.pattern.clone()),
        });
        BulkRecategorizer::build(
            &self.selection,
            category_id,
            subcategory_id,
            rule,
            self.apply_to_all,
            Some(&self.rule.pattern),
        )
    }

    pub async fn submit(
        &self,
        service: &dyn TransactionService,
        category_id: Option<i64>,
        subcategory_id: Option<i64>,
    ) -> Result<BulkOutcome> {
        let request = self.build_request(category_id, subcategory_id)?;
        BulkRecategorizer::new(service).submit(&request).await
    }
}
