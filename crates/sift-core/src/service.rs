//! Transaction service client
//!
//! The transaction service owns storage, rule persistence, the AI categorizer
//! and natural-language search translation. This module is the only place
//! that knows its HTTP surface.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |---|---|
//! | similar | `GET {base}/transactions/{id}/similar?pattern=` |
//! | bulk update | `POST {base}/transactions/bulk-update` (form) |
//! | batch categorize | `POST {base}/ai/categorize` (form, streamed NDJSON body) |
//! | single categorize | `POST {base}/ai/categorize/{id}` |
//! | search | `POST {base}/transactions/search` (JSON) |

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::bulk::BulkUpdateRequest;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{SimilarResponse, SingleCategorizeResponse};
use crate::search::{SearchRequest, SearchResponse};

/// Incrementally arriving response body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Operations consumed from the transaction service
///
/// Implementations must be Send + Sync so sessions can hold them across awaits.
#[async_trait]
pub trait TransactionService: Send + Sync {
    /// Transactions sharing the anchor's description pattern.
    /// With `pattern = None` the service derives the pattern itself.
    async fn similar(&self, transaction_id: i64, pattern: Option<&str>)
        -> Result<SimilarResponse>;

    /// Apply one category assignment atomically
    async fn bulk_update(&self, request: &BulkUpdateRequest) -> Result<()>;

    /// Start a batch AI categorization job and return its progress stream
    async fn categorize_batch(&self, limit: u32, dry_run: bool) -> Result<ByteStream>;

    /// Categorize a single transaction with AI
    async fn categorize_one(&self, transaction_id: i64) -> Result<SingleCategorizeResponse>;

    /// Natural-language search, or a page of a previous search
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

/// HTTP implementation of [`TransactionService`]
#[derive(Clone)]
pub struct HttpTransactionService {
    http_client: Client,
    base_url: String,
    /// Applied per request; the batch stream is exempt since a job can run for minutes
    timeout: Duration,
}

impl HttpTransactionService {
    pub fn new(base_url: &str) -> Self {
        Self::from_config(&ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            http_client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Turn a non-success status into an error carrying the response text
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(if message.is_empty() {
            "resource not found".to_string()
        } else {
            message
        }));
    }
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl TransactionService for HttpTransactionService {
    async fn similar(
        &self,
        transaction_id: i64,
        pattern: Option<&str>,
    ) -> Result<SimilarResponse> {
        let mut request = self
            .http_client
            .get(self.url(&format!("transactions/{}/similar", transaction_id)))
            .timeout(self.timeout);
        if let Some(pattern) = pattern {
            request = request.query(&[("pattern", pattern)]);
        }

        let response = check_status(request.send().await?).await?;
        let similar: SimilarResponse = response.json().await?;
        debug!(
            "Similar for {}: {} candidates of {} (pattern {:?})",
            transaction_id,
            similar.similar.len(),
            similar.total_count,
            similar.pattern
        );
        Ok(similar)
    }

    async fn bulk_update(&self, request: &BulkUpdateRequest) -> Result<()> {
        let response = self
            .http_client
            .post(self.url("transactions/bulk-update"))
            .timeout(self.timeout)
            .form(&request.form_fields())
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn categorize_batch(&self, limit: u32, dry_run: bool) -> Result<ByteStream> {
        let response = self
            .http_client
            .post(self.url("ai/categorize"))
            .form(&[("limit", limit.to_string()), ("dry_run", dry_run.to_string())])
            .send()
            .await?;
        let response = check_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(Error::from));
        Ok(Box::pin(stream))
    }

    async fn categorize_one(&self, transaction_id: i64) -> Result<SingleCategorizeResponse> {
        let response = self
            .http_client
            .post(self.url(&format!("ai/categorize/{}", transaction_id)))
            .timeout(self.timeout)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let response = self
            .http_client
            .post(self.url("transactions/search"))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockFixture, MockTransactionService};

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let service = HttpTransactionService::new("http://localhost:5000/api/");
        assert_eq!(service.base_url(), "http://localhost:5000/api");
        assert_eq!(
            service.url("transactions/search"),
            "http://localhost:5000/api/transactions/search"
        );
    }

    #[tokio::test]
    async fn test_similar_sends_pattern_query() {
        let mock = MockTransactionService::start(MockFixture::amazon()).await;
        let service = HttpTransactionService::new(&mock.url());

        let initial = service.similar(42, None).await.unwrap();
        assert_eq!(initial.pattern, "AMZN%");
        assert_eq!(initial.similar.len(), 3);

        let refreshed = service.similar(42, Some("AMZN PRIME%")).await.unwrap();
        assert_eq!(refreshed.pattern, "AMZN PRIME%");
        assert_eq!(refreshed.similar.len(), 1);

        assert_eq!(
            mock.similar_requests(),
            vec![(42, None), (42, Some("AMZN PRIME%".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_unknown_anchor_is_not_found() {
        let mock = MockTransactionService::start(MockFixture::amazon()).await;
        let service = HttpTransactionService::new(&mock.url());

        let err = service.similar(999, None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_update_failure_status() {
        let mut fixture = MockFixture::amazon();
        fixture.fail_bulk = true;
        let mock = MockTransactionService::start(fixture).await;
        let service = HttpTransactionService::new(&mock.url());

        let request = BulkUpdateRequest {
            transaction_ids: vec![42],
            category_id: 5,
            subcategory_id: None,
            create_rule: false,
            rule_name: None,
            rule_pattern: None,
            apply_to_all_matching: false,
        };
        let err = service.bulk_update(&request).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
    }
}
