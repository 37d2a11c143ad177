//! Execution tracker over a file-backed SQLite database.

mod common;

use std::sync::Arc;
use std::time::Duration;

use brandscore::adapters::sqlite::{
    all_embedded_migrations, initialize_database, Migrator, SqliteExecutionRepository,
};
use brandscore::domain::models::{names, AgentOutput, AgentResult, ExecutionStatus};
use brandscore::services::ExecutionTracker;
use serde_json::json;

use common::temp_db_url;

async fn open(url: &str) -> ExecutionTracker {
    let pool = initialize_database(url, None).await.expect("Failed to initialize database");
    ExecutionTracker::new(Arc::new(SqliteExecutionRepository::new(pool)))
}

fn output(agent_name: &str, score: f64) -> AgentOutput {
    AgentOutput::completed(
        agent_name,
        vec![AgentResult::new(format!("{agent_name}_score"), score, 0.85).with_evidence(json!({ "pages": 12 }))],
        1_500,
    )
}

#[tokio::test]
async fn test_lifecycle_is_persisted() {
    let (_dir, url) = temp_db_url();
    let tracker = open(&url).await;

    let id = tracker.start_execution("eval-1", names::CRAWL).await.unwrap();
    let record = tracker.get_execution(id).await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Pending);
    assert!(record.started_at.is_none());

    tracker.mark_running(id).await.unwrap();
    tracker.complete_execution(id, &output(names::CRAWL, 82.0), 1_500).await.unwrap();

    let record = tracker.get_execution(id).await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.execution_time_ms, Some(1_500));
    assert!(record.started_at.is_some());
    assert!(record.completed_at.is_some());
    let result = record.result.unwrap();
    assert_eq!(result.score(), Some(82.0));
    assert_eq!(result.results[0].evidence["pages"], json!(12));
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let (_dir, url) = temp_db_url();

    let (done, failed) = {
        let tracker = open(&url).await;
        let done = tracker.start_execution("eval-1", names::SCHEMA).await.unwrap();
        tracker.complete_execution(done, &output(names::SCHEMA, 60.0), 300).await.unwrap();
        let failed = tracker.start_execution("eval-1", names::CITATION).await.unwrap();
        tracker.fail_execution(failed, "Permanent failure after 3 attempts: 429").await.unwrap();
        (done, failed)
    };

    // Reopening re-runs migrations, which must be a no-op.
    let tracker = open(&url).await;
    let records = tracker.get_evaluation_executions("eval-1").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, done);
    assert_eq!(records[1].id, failed);
    assert_eq!(records[1].error.as_deref(), Some("Permanent failure after 3 attempts: 429"));

    let results = tracker.get_completed_results("eval-1").await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(results.contains_key(names::SCHEMA));
}

#[tokio::test]
async fn test_migrations_apply_once() {
    let (_dir, url) = temp_db_url();
    let pool = initialize_database(&url, None).await.unwrap();
    let migrator = Migrator::new(pool);

    let latest = all_embedded_migrations().iter().map(|m| m.version).max().unwrap();
    assert_eq!(migrator.get_current_version().await.unwrap(), latest);
    assert_eq!(migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_latest_record_wins_per_agent() {
    let (_dir, url) = temp_db_url();
    let tracker = open(&url).await;

    let first = tracker.start_execution("eval-1", names::SENTIMENT).await.unwrap();
    tracker.fail_execution(first, "Delivery failed").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = tracker.start_execution("eval-1", names::SENTIMENT).await.unwrap();
    tracker.cancel_execution(second, "Evaluation cancelled").await.unwrap();

    let latest = tracker.latest_executions("eval-1").await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[names::SENTIMENT].id, second);
    assert_eq!(latest[names::SENTIMENT].status, ExecutionStatus::Cancelled);
}

#[tokio::test]
async fn test_completion_summary() {
    let (_dir, url) = temp_db_url();
    let tracker = open(&url).await;

    let crawl = tracker.start_execution("eval-1", names::CRAWL).await.unwrap();
    tracker.complete_execution(crawl, &output(names::CRAWL, 80.0), 10).await.unwrap();
    let commerce = tracker.start_execution("eval-1", names::COMMERCE).await.unwrap();
    tracker.cancel_execution(commerce, "Agent skipped due to failure: 503").await.unwrap();
    let llm = tracker.start_execution("eval-1", names::LLM_TEST).await.unwrap();
    tracker.fail_execution(llm, "boom").await.unwrap();
    tracker.start_execution("eval-1", names::GEO_VISIBILITY).await.unwrap();

    let summary = tracker
        .are_all_agents_complete(
            "eval-1",
            &[names::CRAWL, names::COMMERCE, names::LLM_TEST, names::GEO_VISIBILITY, names::CITATION],
        )
        .await
        .unwrap();

    assert!(!summary.complete);
    assert_eq!(summary.completed, vec![names::CRAWL.to_string(), names::COMMERCE.to_string()]);
    assert_eq!(summary.failed, vec![names::LLM_TEST.to_string()]);
    assert_eq!(
        summary.pending,
        vec![names::GEO_VISIBILITY.to_string(), names::CITATION.to_string()]
    );
}

#[tokio::test]
async fn test_wait_returns_what_exists_after_timeout() {
    let (_dir, url) = temp_db_url();
    let tracker = open(&url).await;
    tracker.start_execution("eval-1", names::CRAWL).await.unwrap();

    let records = tracker
        .wait_for_executions("eval-1", 3, Duration::from_millis(300))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);

    let records = tracker
        .wait_for_executions("eval-1", 1, Duration::from_millis(300))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_unknown_execution_is_not_found() {
    let (_dir, url) = temp_db_url();
    let tracker = open(&url).await;
    let err = tracker.mark_running(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(err.to_string().starts_with("Execution not found"));
}
