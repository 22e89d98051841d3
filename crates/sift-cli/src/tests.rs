//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::time::Duration;

use sift_core::test_utils::{MockFixture, MockTransactionService};
use sift_core::{BulkOutcome, ClientConfig, HttpTransactionService, SingleCategorizeOutcome};

use crate::commands::{self, truncate, RecategorizeOptions, SelectScope};

fn test_config(mock: &MockTransactionService) -> ClientConfig {
    ClientConfig {
        base_url: mock.url(),
        progress_clear_delay: Duration::ZERO,
        ..ClientConfig::default()
    }
}

fn options(scope: SelectScope) -> RecategorizeOptions {
    RecategorizeOptions {
        category_id: 5,
        subcategory_id: None,
        pattern: None,
        scope,
        create_rule: false,
        rule_name: None,
        apply_to_all: false,
        dry_run: false,
    }
}

// ========== Config Tests ==========

#[test]
fn test_load_config_api_url_flag_wins() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[service]\nbase_url = \"http://from-file:5000/api\"\ntimeout_secs = 5\n\n[search]\npage_size = 25\n\n[categorize]\nbatch_limit = 10\nprogress_clear_ms = 0"
    )
    .unwrap();

    let config = commands::load_config(Some(file.path()), Some("http://flag:9000/api")).unwrap();
    assert_eq!(config.base_url, "http://flag:9000/api");
    assert_eq!(config.page_size, 25);
    assert_eq!(config.batch_limit, 10);
    assert_eq!(config.request_timeout, Duration::from_secs(5));
}

#[test]
fn test_load_config_missing_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let result = commands::load_config(Some(&dir.path().join("nope.toml")), None);
    assert!(result.is_err());
}

// ========== Similar Command Tests ==========

#[tokio::test]
async fn test_cmd_similar_lists_candidates() {
    let mock = MockTransactionService::start(MockFixture::amazon()).await;
    let service = commands::connect(&test_config(&mock));

    let result = commands::cmd_similar(&service, 42, None).await.unwrap();
    assert_eq!(result.pattern, "AMZN%");
    assert_eq!(result.candidates.len(), 3);
    assert_eq!(mock.similar_requests(), vec![(42, None)]);
}

#[tokio::test]
async fn test_cmd_similar_unknown_anchor_degrades() {
    let mock = MockTransactionService::start(MockFixture::amazon()).await;
    let service = commands::connect(&test_config(&mock));

    let result = commands::cmd_similar(&service, 999, None).await.unwrap();
    assert!(result.candidates.is_empty());
    assert_eq!(result.total_count, 0);
}

// ========== Recategorize Command Tests ==========

#[tokio::test]
async fn test_cmd_recategorize_all() {
    let mock = MockTransactionService::start(MockFixture::amazon()).await;
    let service = commands::connect(&test_config(&mock));

    let outcome = commands::cmd_recategorize(&service, 42, &options(SelectScope::All))
        .await
        .unwrap();
    assert_eq!(outcome, Some(BulkOutcome::RemovedLocally(vec![42, 43, 44])));
    assert_eq!(mock.bulk_requests().len(), 1);
}

#[tokio::test]
async fn test_cmd_recategorize_anchor_only() {
    let mock = MockTransactionService::start(MockFixture::amazon()).await;
    let service = commands::connect(&test_config(&mock));

    let outcome = commands::cmd_recategorize(&service, 42, &options(SelectScope::AnchorOnly))
        .await
        .unwrap();
    assert_eq!(outcome, Some(BulkOutcome::RemovedLocally(vec![42])));
}

#[tokio::test]
async fn test_cmd_recategorize_refined_pattern_with_rule() {
    let mock = MockTransactionService::start(MockFixture::amazon()).await;
    let service = commands::connect(&test_config(&mock));

    let mut opts = options(SelectScope::MatchingPattern);
    opts.pattern = Some("AMZN P%".to_string());
    opts.create_rule = true;
    opts.rule_name = Some("Amazon Prime".to_string());

    let outcome = commands::cmd_recategorize(&service, 42, &opts).await.unwrap();
    assert_eq!(outcome, Some(BulkOutcome::RemovedLocally(vec![42, 43])));

    let sent = &mock.bulk_requests()[0];
    assert!(sent.contains(&("rule_name".to_string(), "Amazon Prime".to_string())));
    assert!(sent.contains(&("rule_pattern".to_string(), "AMZN P%".to_string())));
    assert_eq!(
        mock.similar_requests(),
        vec![(42, None), (42, Some("AMZN P%".to_string()))]
    );
}

#[tokio::test]
async fn test_cmd_recategorize_apply_to_all_requires_refetch() {
    let mut fixture = MockFixture::amazon();
    fixture.similar_total = 40;
    let mock = MockTransactionService::start(fixture).await;
    let service = commands::connect(&test_config(&mock));

    let mut opts = options(SelectScope::All);
    opts.apply_to_all = true;
    let outcome = commands::cmd_recategorize(&service, 42, &opts).await.unwrap();
    assert_eq!(outcome, Some(BulkOutcome::RefetchRequired));
}

#[tokio::test]
async fn test_cmd_recategorize_dry_run_sends_nothing() {
    let mock = MockTransactionService::start(MockFixture::amazon()).await;
    let service = commands::connect(&test_config(&mock));

    let mut opts = options(SelectScope::All);
    opts.dry_run = true;
    let outcome = commands::cmd_recategorize(&service, 42, &opts).await.unwrap();
    assert_eq!(outcome, None);
    assert!(mock.bulk_requests().is_empty());
}

#[tokio::test]
async fn test_cmd_recategorize_server_failure() {
    let mut fixture = MockFixture::amazon();
    fixture.fail_bulk = true;
    let mock = MockTransactionService::start(fixture).await;
    let service = commands::connect(&test_config(&mock));

    let result = commands::cmd_recategorize(&service, 42, &options(SelectScope::All)).await;
    assert!(result.is_err());
    assert_eq!(mock.bulk_requests().len(), 1);
}

// ========== Categorize Command Tests ==========

#[tokio::test]
async fn test_cmd_categorize_batch() {
    let mock = MockTransactionService::start(MockFixture::amazon()).await;
    let config = test_config(&mock);
    let service = commands::connect(&config);

    let outcome = commands::cmd_categorize(&service, &config, 50, false)
        .await
        .unwrap();
    assert_eq!(outcome.stats.categorized, 7);
    assert!(outcome.refresh_required);
    assert_eq!(
        mock.batch_requests()[0],
        vec![
            ("limit".to_string(), "50".to_string()),
            ("dry_run".to_string(), "false".to_string())
        ]
    );
}

#[tokio::test]
async fn test_cmd_categorize_stream_failure() {
    let mut fixture = MockFixture::amazon();
    fixture.fail_after_chunks = Some(1);
    let mock = MockTransactionService::start(fixture).await;
    let config = test_config(&mock);
    let service = commands::connect(&config);

    let result = commands::cmd_categorize(&service, &config, 50, false).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_categorize_one() {
    let mock = MockTransactionService::start(MockFixture::amazon()).await;
    let service = commands::connect(&test_config(&mock));

    let outcome = commands::cmd_categorize_one(&service, 42).await.unwrap();
    assert!(matches!(outcome, SingleCategorizeOutcome::Categorized { .. }));
    assert!(outcome.touched_others());

    assert!(commands::cmd_categorize_one(&service, 999).await.is_err());
}

// ========== Search Command Tests ==========

#[tokio::test]
async fn test_cmd_search_first_page() {
    let mock = MockTransactionService::start(MockFixture::amazon()).await;
    let config = test_config(&mock);
    let service = commands::connect(&config);

    let session = commands::cmd_search(&service, &config, "amazon", 1, false)
        .await
        .unwrap();
    assert_eq!(session.controls().category_id, Some(5));
    assert_eq!(session.results().len(), 2);
    assert_eq!(session.query(), Some("amazon"));
    assert!(session
        .interpretation()
        .is_some_and(|i| i.residual.is_empty()));
    assert_eq!(
        session.captured_filter().and_then(|f| f.get("start_date")),
        Some(&serde_json::json!("2024-01-01"))
    );
    assert_eq!(mock.search_requests().len(), 1);
}

#[tokio::test]
async fn test_cmd_search_later_page_replays_filter() {
    let mut fixture = MockFixture::amazon();
    fixture.search_total = 200;
    let mock = MockTransactionService::start(fixture).await;
    let config = test_config(&mock);
    let service = commands::connect(&config);

    let session = commands::cmd_search(&service, &config, "amazon", 3, true)
        .await
        .unwrap();
    assert_eq!(session.page(), 3);

    let requests = mock.search_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1]["page"], 3);
    assert_eq!(requests[1]["filters"]["category_id"], 5);
    assert_eq!(requests[1]["filters"]["start_date"], "2024-01-01");
}

#[tokio::test]
async fn test_cmd_search_unreachable_service() {
    let config = ClientConfig::default();
    let service = HttpTransactionService::new("http://127.0.0.1:9/api");
    let result = commands::cmd_search(&service, &config, "anything", 1, false).await;
    assert!(result.is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("AMAZON MARKETPLACE SEATTLE", 10), "AMAZON ...");
    assert_eq!(truncate("CAFÉ CRÈME", 8), "CAFÉ ...");
}
