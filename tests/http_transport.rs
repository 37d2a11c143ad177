//! HTTP delivery against a mock queue endpoint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use brandscore::adapters::agents::simulated_catalog;
use brandscore::adapters::transports::{HttpTransport, InProcessTransport, TransportChain};
use brandscore::domain::models::{names, TaskStatus};
use brandscore::domain::ports::{DispatchRequest, Transport, TransportError};
use brandscore::services::QueueManager;
use mockito::{Matcher, Server};
use serde_json::json;
use uuid::Uuid;

use common::{in_memory_tracker, input};

fn request(agent_name: &str) -> DispatchRequest {
    DispatchRequest {
        evaluation_id: "eval-1".to_string(),
        execution_id: Uuid::new_v4(),
        agent_name: agent_name.to_string(),
        input: input("eval-1"),
    }
}

#[tokio::test]
async fn test_accepted_dispatch() {
    let mut server = Server::new_async().await;
    let request = request(names::CRAWL);
    let mock = server
        .mock("POST", "/api/agents/dispatch")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "evaluationId": "eval-1",
            "executionId": request.execution_id.to_string(),
            "agentName": "crawl_agent",
            "input": { "context": { "websiteUrl": "https://example.com" } }
        })))
        .with_status(202)
        .create_async()
        .await;

    let transport = HttpTransport::new(&format!("{}/", server.url()), "/api/agents/dispatch");
    assert_eq!(transport.url(), format!("{}/api/agents/dispatch", server.url()));

    transport.deliver(&request).await.expect("2xx should be accepted");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_status_is_rejected_with_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/dispatch")
        .with_status(500)
        .with_body("queue exploded")
        .create_async()
        .await;

    let transport = HttpTransport::new(&server.url(), "/dispatch");
    let err = transport.deliver(&request(names::CITATION)).await.unwrap_err();

    mock.assert_async().await;
    match err {
        TransportError::Rejected { transport, reason } => {
            assert_eq!(transport, format!("http:{}", server.url()));
            assert!(reason.contains("500"), "{reason}");
            assert!(reason.contains("queue exploded"), "{reason}");
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    // Nothing listens on the discard port.
    let transport = HttpTransport::with_timeout("http://127.0.0.1:9", "/dispatch", Duration::from_secs(2));
    let err = transport.deliver(&request(names::CITATION)).await.unwrap_err();
    assert!(matches!(err, TransportError::Unreachable { .. }), "{err:?}");
}

#[tokio::test]
async fn test_chain_falls_back_to_local_queue() {
    let tracker = in_memory_tracker();
    let queue = QueueManager::builder(tracker.clone(), simulated_catalog(names::ALL)).build();
    let chain = TransportChain::new()
        .with_transport(Arc::new(HttpTransport::with_timeout(
            "http://127.0.0.1:9",
            "/dispatch",
            Duration::from_secs(2),
        )))
        .with_transport(Arc::new(InProcessTransport::new(queue.clone())));

    let execution_id = tracker.start_execution("eval-1", names::CRAWL).await.unwrap();
    let request = DispatchRequest {
        execution_id,
        ..request(names::CRAWL)
    };

    let report = chain.deliver(&request).await.unwrap();
    assert_eq!(report.transport, "in_process");
    assert_eq!(report.skipped.len(), 1);
    assert!(matches!(report.skipped[0], TransportError::Unreachable { .. }));

    let task = queue.task("eval-1", names::CRAWL).await.unwrap();
    assert_eq!(task.status, TaskStatus::Running);
    assert_eq!(task.execution_id, execution_id);
}

#[tokio::test]
async fn test_chain_reports_every_refusal() {
    let mut first = Server::new_async().await;
    let _first = first.mock("POST", "/dispatch").with_status(429).create_async().await;
    let mut second = Server::new_async().await;
    let _second = second.mock("POST", "/dispatch").with_status(503).create_async().await;

    let chain = TransportChain::new()
        .with_transport(Arc::new(HttpTransport::new(&first.url(), "/dispatch")))
        .with_transport(Arc::new(HttpTransport::new(&second.url(), "/dispatch")));

    let failure = chain.deliver(&request(names::COMMERCE)).await.unwrap_err();
    assert_eq!(failure.agent_name, names::COMMERCE);
    assert_eq!(failure.attempts.len(), 2);
    let message = failure.to_string();
    assert!(message.starts_with("Delivery failed for commerce_agent after 2 transport(s)"));
    assert!(message.contains("429"));
    assert!(message.contains("503"));
}
