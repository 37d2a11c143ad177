//! Common test utilities for integration tests
//!
//! Shared fixtures for queue, tracker and orchestrator scenarios.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use brandscore::adapters::agents::{SimulatedAgent, SimulatedResponse};
use brandscore::adapters::memory::InMemoryExecutionRepository;
use brandscore::domain::models::{
    AgentInput, EvaluationContext, ExecutionRecord, ExecutionStatus, FallbackPolicy, QueueConfig, TimeoutStrategy,
};
use brandscore::domain::ports::ExecutionRepository;
use brandscore::domain::{DomainError, DomainResult};
use brandscore::services::{AgentCatalog, AgentRegistry, ExecutionTracker, QueueManager};
use tempfile::TempDir;
use uuid::Uuid;

/// Create a temporary test database
///
/// Returns the directory guard and a `sqlite:` URL inside it.
#[allow(dead_code)]
pub fn temp_db_url() -> (TempDir, String) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path: PathBuf = dir.path().join("executions.db");
    let url = format!("sqlite:{}", path.display());
    (dir, url)
}

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[allow(dead_code)]
pub fn in_memory_tracker() -> ExecutionTracker {
    ExecutionTracker::new(Arc::new(InMemoryExecutionRepository::new()))
}

#[allow(dead_code)]
pub fn context(evaluation_id: &str) -> EvaluationContext {
    EvaluationContext::new(evaluation_id, "brand-1", "https://example.com").with_industry("retail")
}

#[allow(dead_code)]
pub fn input(evaluation_id: &str) -> AgentInput {
    AgentInput::new(context(evaluation_id))
}

/// In-memory repository that rejects chosen updates once each.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct FlakyRepository {
    inner: InMemoryExecutionRepository,
    failures: Arc<Mutex<Vec<(String, ExecutionStatus)>>>,
}

#[allow(dead_code)]
impl FlakyRepository {
    /// Reject the next update that moves `agent_name` to `status`.
    pub fn fail_once(&self, agent_name: &str, status: ExecutionStatus) {
        self.failures.lock().unwrap().push((agent_name.to_string(), status));
    }
}

#[async_trait]
impl ExecutionRepository for FlakyRepository {
    async fn insert(&self, record: &ExecutionRecord) -> DomainResult<()> {
        self.inner.insert(record).await
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<ExecutionRecord>> {
        self.inner.get(id).await
    }

    async fn update(&self, record: &ExecutionRecord) -> DomainResult<()> {
        let rejected = {
            let mut failures = self.failures.lock().unwrap();
            failures
                .iter()
                .position(|(agent, status)| *agent == record.agent_name && *status == record.status)
                .map(|index| failures.remove(index))
                .is_some()
        };
        if rejected {
            return Err(DomainError::DatabaseError("disk I/O error".to_string()));
        }
        self.inner.update(record).await
    }

    async fn list_by_evaluation(&self, evaluation_id: &str) -> DomainResult<Vec<ExecutionRecord>> {
        self.inner.list_by_evaluation(evaluation_id).await
    }
}

/// Queue over a `FlakyRepository`.
#[allow(dead_code)]
pub fn flaky_queue(
    registry: AgentRegistry,
    catalog: AgentCatalog,
    max_concurrent: usize,
    repository: &FlakyRepository,
) -> QueueManager {
    QueueManager::builder(ExecutionTracker::new(Arc::new(repository.clone())), catalog)
        .with_registry(registry)
        .with_config(QueueConfig {
            max_concurrent,
            ..QueueConfig::default()
        })
        .build()
}

/// `attempts` rungs of `timeout_ms` each, with generous ceilings.
#[allow(dead_code)]
pub fn ladder(attempts: usize, timeout_ms: u64) -> TimeoutStrategy {
    TimeoutStrategy {
        initial_ms: timeout_ms,
        progressive_ms: vec![timeout_ms; attempts.saturating_sub(1)],
        max_total_ms: 600_000,
        circuit_breaker_ms: 600_000,
    }
}

#[allow(dead_code)]
pub const DEGRADE: FallbackPolicy = FallbackPolicy {
    enabled: true,
    minimal_mode: false,
    graceful_degradation: true,
    skip_if_failed: false,
};

#[allow(dead_code)]
pub const SKIP: FallbackPolicy = FallbackPolicy {
    enabled: false,
    minimal_mode: false,
    graceful_degradation: false,
    skip_if_failed: true,
};

/// Simulated agent answering after `latency_ms`.
#[allow(dead_code)]
pub fn agent(name: &str, latency_ms: u64) -> Arc<SimulatedAgent> {
    Arc::new(SimulatedAgent::with_default_response(
        name,
        SimulatedResponse::default().with_latency(Duration::from_millis(latency_ms)),
    ))
}

/// Simulated agent failing every call after `latency_ms`.
#[allow(dead_code)]
pub fn failing_agent(name: &str, latency_ms: u64) -> Arc<SimulatedAgent> {
    Arc::new(SimulatedAgent::with_default_response(
        name,
        SimulatedResponse::failure(format!("{name} is down")).with_latency(Duration::from_millis(latency_ms)),
    ))
}

#[allow(dead_code)]
pub fn catalog_of(agents: &[Arc<SimulatedAgent>]) -> AgentCatalog {
    agents
        .iter()
        .fold(AgentCatalog::new(), |catalog, agent| catalog.with_agent(agent.clone()))
}

#[allow(dead_code)]
pub fn queue_with(registry: AgentRegistry, catalog: AgentCatalog, max_concurrent: usize) -> QueueManager {
    QueueManager::builder(in_memory_tracker(), catalog)
        .with_registry(registry)
        .with_config(QueueConfig {
            max_concurrent,
            ..QueueConfig::default()
        })
        .build()
}

/// Create the tracker record, then enqueue under it.
#[allow(dead_code)]
pub async fn enqueue(queue: &QueueManager, agent_name: &str, evaluation_id: &str) -> Uuid {
    let execution_id = queue
        .tracker()
        .start_execution(evaluation_id, agent_name)
        .await
        .expect("Failed to start execution");
    queue
        .enqueue(agent_name, input(evaluation_id), evaluation_id, execution_id)
        .await
        .expect("Failed to enqueue");
    execution_id
}

/// Poll until the queue reports the evaluation as settled.
///
/// Intended for paused-clock tests, where sleeping only advances virtual time.
#[allow(dead_code)]
pub async fn settle(queue: &QueueManager, evaluation_id: &str) {
    for _ in 0..10_000 {
        if queue
            .evaluation_status(evaluation_id)
            .await
            .overall_status
            .is_settled()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("evaluation {evaluation_id} did not settle");
}
