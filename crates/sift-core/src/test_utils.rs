//! Test utilities for sift-core
//!
//! This module provides a mock transaction service that serves the five
//! endpoints the client consumes from an in-memory fixture and records what
//! the client sent.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Form, Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::models::{Rule, SimilarResponse, Transaction, TransactionSummary};
use crate::pattern::WildcardPattern;
use crate::search::StructuredFilter;

/// Canned data served by [`MockTransactionService`]
#[derive(Debug, Clone)]
pub struct MockFixture {
    pub similar: Vec<TransactionSummary>,
    pub similar_total: u64,
    pub derived_pattern: String,
    pub matching_rule: Option<Rule>,
    pub fail_bulk: bool,
    /// Lines of the batch categorize body (newlines added by the server)
    pub progress_lines: Vec<String>,
    /// Body is sent in chunks of this many bytes
    pub chunk_size: usize,
    /// Abort the body after this many chunks
    pub fail_after_chunks: Option<usize>,
    pub categorize_one: Value,
    pub search_results: Vec<Transaction>,
    pub search_total: u64,
    pub search_filters: StructuredFilter,
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Build a summary for fixtures
pub fn summary(id: i64, description: &str, normalized: &str) -> TransactionSummary {
    TransactionSummary {
        id,
        date: date(2024, 1, 10),
        amount: -25.0,
        description: description.to_string(),
        normalized_description: Some(normalized.to_string()),
        category_id: None,
    }
}

/// Build a transaction for fixtures
pub fn transaction(id: i64, description: &str) -> Transaction {
    Transaction {
        id,
        date: date(2024, 1, 10),
        amount: -25.0,
        description: description.to_string(),
        normalized_description: Some(description.to_uppercase()),
        category_id: None,
        subcategory_id: None,
        uncertain: false,
    }
}

impl MockFixture {
    /// Anchor 42 with two Amazon siblings, derived pattern `AMZN%`
    pub fn amazon() -> Self {
        let filters = json!({"category_id": 5, "start_date": "2024-01-01"});
        Self {
            similar: vec![
                summary(42, "AMZN MKTP US*2K4", "AMZN MKTP"),
                summary(43, "AMZN PRIME*8U1", "AMZN PRIME"),
                summary(44, "AMZN DIGITAL*RT3", "AMZN DIGITAL"),
            ],
            similar_total: 3,
            derived_pattern: "AMZN%".to_string(),
            matching_rule: None,
            fail_bulk: false,
            progress_lines: vec![
                r#"{"type":"start","total":10}"#.to_string(),
                r#"{"type":"progress","categorized":3,"current":3}"#.to_string(),
                r#"{"type":"progress","categorized":7,"current":7}"#.to_string(),
                r#"{"type":"complete","stats":{"categorized":7,"rules_created":1}}"#.to_string(),
            ],
            chunk_size: 7,
            fail_after_chunks: None,
            categorize_one: json!({
                "status": "ok",
                "category": "Shopping",
                "subcategory": "Online",
                "similar_updated": 2
            }),
            search_results: vec![transaction(42, "AMZN MKTP"), transaction(43, "AMZN PRIME")],
            search_total: 2,
            search_filters: filters.as_object().cloned().unwrap_or_default(),
        }
    }
}

#[derive(Default)]
struct Recorded {
    similar: Vec<(i64, Option<String>)>,
    bulk: Vec<Vec<(String, String)>>,
    batch: Vec<Vec<(String, String)>>,
    search: Vec<Value>,
}

struct MockState {
    fixture: MockFixture,
    recorded: Mutex<Recorded>,
}

/// Mock transaction service for testing
pub struct MockTransactionService {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockTransactionService {
    /// Start the mock server on an available port
    pub async fn start(fixture: MockFixture) -> Self {
        let state = Arc::new(MockState {
            fixture,
            recorded: Mutex::new(Recorded::default()),
        });

        let app = Router::new()
            .route("/api/transactions/:id/similar", get(handle_similar))
            .route("/api/transactions/bulk-update", post(handle_bulk_update))
            .route("/api/transactions/search", post(handle_search))
            .route("/api/ai/categorize", post(handle_categorize_batch))
            .route("/api/ai/categorize/:id", post(handle_categorize_one))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL of the mock API
    pub fn url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// `(anchor id, pattern)` of every similar lookup
    pub fn similar_requests(&self) -> Vec<(i64, Option<String>)> {
        self.state.recorded.lock().unwrap().similar.clone()
    }

    /// Form fields of every bulk update, in submission order
    pub fn bulk_requests(&self) -> Vec<Vec<(String, String)>> {
        self.state.recorded.lock().unwrap().bulk.clone()
    }

    /// Form fields of every batch categorize call
    pub fn batch_requests(&self) -> Vec<Vec<(String, String)>> {
        self.state.recorded.lock().unwrap().batch.clone()
    }

    /// JSON bodies of every search call
    pub fn search_requests(&self) -> Vec<Value> {
        self.state.recorded.lock().unwrap().search.clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockTransactionService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Deserialize)]
struct SimilarQuery {
    pattern: Option<String>,
}

async fn handle_similar(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    Query(query): Query<SimilarQuery>,
) -> Response {
    state
        .recorded
        .lock()
        .unwrap()
        .similar
        .push((id, query.pattern.clone()));

    let fixture = &state.fixture;
    if !fixture.similar.iter().any(|c| c.id == id) {
        return (StatusCode::NOT_FOUND, "transaction not found").into_response();
    }

    let response = match query.pattern {
        Some(pattern) if pattern != fixture.derived_pattern => {
            let matcher = WildcardPattern::compile(&pattern).unwrap();
            let similar: Vec<TransactionSummary> = fixture
                .similar
                .iter()
                .filter(|c| matcher.matches(c.match_text()))
                .cloned()
                .collect();
            SimilarResponse {
                total_count: similar.len() as u64,
                similar,
                pattern,
                matching_rule: None,
            }
        }
        _ => SimilarResponse {
            similar: fixture.similar.clone(),
            total_count: fixture.similar_total,
            pattern: fixture.derived_pattern.clone(),
            matching_rule: fixture.matching_rule.clone(),
        },
    };

    Json(response).into_response()
}

async fn handle_bulk_update(
    State(state): State<Arc<MockState>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    state.recorded.lock().unwrap().bulk.push(fields);
    if state.fixture.fail_bulk {
        return (StatusCode::INTERNAL_SERVER_ERROR, "bulk update failed").into_response();
    }
    Json(json!({"success": true})).into_response()
}

async fn handle_categorize_batch(
    State(state): State<Arc<MockState>>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    state.recorded.lock().unwrap().batch.push(fields);

    let fixture = &state.fixture;
    let body: Vec<u8> = fixture
        .progress_lines
        .iter()
        .flat_map(|line| format!("{}\n", line).into_bytes())
        .collect();

    let mut chunks: Vec<std::io::Result<Vec<u8>>> = body
        .chunks(fixture.chunk_size.max(1))
        .map(|c| Ok(c.to_vec()))
        .collect();
    if let Some(n) = fixture.fail_after_chunks {
        chunks.truncate(n);
        chunks.push(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "job crashed",
        )));
    }

    // Pause between chunks so each one is flushed separately
    let stream = futures::stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(2)).await;
        chunk
    });

    Response::builder()
        .header("content-type", "application/x-ndjson")
        .body(Body::from_stream(stream))
        .unwrap()
}

async fn handle_categorize_one(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
) -> Response {
    if !state.fixture.similar.iter().any(|c| c.id == id) {
        return (StatusCode::NOT_FOUND, "transaction not found").into_response();
    }
    Json(state.fixture.categorize_one.clone()).into_response()
}

async fn handle_search(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.recorded.lock().unwrap().search.push(body.clone());

    let fixture = &state.fixture;
    let filters = match body.get("filters") {
        Some(filters) => filters.clone(),
        None => Value::Object(fixture.search_filters.clone()),
    };
    Json(json!({
        "results": fixture.search_results,
        "total": fixture.search_total,
        "filters": filters,
    }))
}
