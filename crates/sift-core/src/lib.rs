//! Sift Core Library
//!
//! Client-side logic for bulk recategorization and AI search over a remote
//! transaction service:
//! - Wildcard description patterns evaluated without a round trip
//! - Similar-transaction lookup with graceful degradation
//! - Anchor-preserving selection and atomic bulk category writes
//! - Incremental decoding of the batch categorization progress stream
//! - Reconciliation of natural-language search filters with filter controls
//! - Request sequencing so superseded responses never clobber newer state

pub mod bulk;
pub mod categorize;
pub mod config;
pub mod error;
pub mod models;
pub mod pattern;
pub mod progress;
pub mod recategorize;
pub mod search;
pub mod selection;
pub mod sequence;
pub mod service;
pub mod similarity;

/// Test utilities including mock transaction service
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use bulk::{BulkOutcome, BulkRecategorizer, BulkUpdateRequest, RuleOptions, TransactionView};
pub use categorize::categorize_one;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{
    CategorizeStats, Notification, Rule, SingleCategorizeOutcome, Transaction, TransactionSummary,
};
pub use pattern::{suggest_pattern, WildcardPattern};
pub use progress::{
    BatchCategorizer, BatchOutcome, LineDecoder, ProgressConsumer, ProgressEvent, ProgressState,
};
pub use recategorize::{RecategorizeSession, RuleDraft};
pub use search::{
    interpret, DateRange, FilterChip, FilterControls, Interpretation, SearchRequest,
    SearchResponse, SearchSession, StructuredFilter, UiPatch,
};
pub use selection::SelectionState;
pub use sequence::{RequestSequencer, Ticket};
pub use service::{HttpTransactionService, TransactionService};
pub use similarity::{FetchKind, SimilarityFetcher, SimilarityResult};
