//! Execution tracker: durable, write-then-verify bookkeeping of agent runs.
//!
//! Every mutation is followed by a read-back. If the stored row does not
//! reflect the write, the tracker raises `PersistenceInconsistency` because
//! status polling depends on the store being truthful.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::models::{AgentOutput, CompletionSummary, ExecutionRecord, ExecutionStatus};
use crate::domain::ports::ExecutionRepository;

/// Tracker failures. `PersistenceInconsistency` means a write did not stick.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Persistence inconsistency for execution {execution_id}: expected {expected}, found {found}")]
    PersistenceInconsistency {
        execution_id: Uuid,
        expected: String,
        found: String,
    },

    #[error("Execution not found: {0}")]
    NotFound(Uuid),

    #[error("Evaluation {evaluation_id} has {found} of {expected} expected executions")]
    MissingExecutions {
        evaluation_id: String,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Repository(#[from] DomainError),
}

/// Result alias for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Durable source of truth for agent run state.
#[derive(Clone)]
pub struct ExecutionTracker {
    repository: Arc<dyn ExecutionRepository>,
}

impl ExecutionTracker {
    /// Tracker over any `ExecutionRepository`.
    pub fn new(repository: Arc<dyn ExecutionRepository>) -> Self {
        Self { repository }
    }

    /// Create a `Pending` record and return its id.
    #[instrument(skip(self), err)]
    pub async fn start_execution(&self, evaluation_id: &str, agent_name: &str) -> TrackerResult<Uuid> {
        let record = ExecutionRecord::new(evaluation_id, agent_name);
        self.repository.insert(&record).await?;
        self.verify(record.id, ExecutionStatus::Pending, |_| true).await?;
        debug!(execution_id = %record.id, "execution started");
        Ok(record.id)
    }

    /// Mark a record running and stamp its start time.
    #[instrument(skip(self), err)]
    pub async fn mark_running(&self, execution_id: Uuid) -> TrackerResult<()> {
        let mut record = self.load(execution_id).await?;
        let now = Utc::now();
        record.status = ExecutionStatus::Running;
        record.started_at = Some(now);
        record.updated_at = now;
        self.repository.update(&record).await?;
        self.verify(execution_id, ExecutionStatus::Running, |r| r.started_at.is_some()).await
    }

    /// Store a result, including degraded placeholder outputs.
    #[instrument(skip(self, result), fields(agent = %result.agent_name), err)]
    pub async fn complete_execution(
        &self,
        execution_id: Uuid,
        result: &AgentOutput,
        duration_ms: u64,
    ) -> TrackerResult<()> {
        let mut record = self.load(execution_id).await?;
        let now = Utc::now();
        record.status = ExecutionStatus::Completed;
        record.completed_at = Some(now);
        record.result = Some(result.clone());
        record.error = None;
        record.execution_time_ms = Some(duration_ms);
        record.updated_at = now;
        self.repository.update(&record).await?;
        self.verify(execution_id, ExecutionStatus::Completed, |r| {
            r.result.is_some() && r.execution_time_ms == Some(duration_ms)
        })
        .await
    }

    /// Record a permanent failure.
    #[instrument(skip(self), err)]
    pub async fn fail_execution(&self, execution_id: Uuid, error: &str) -> TrackerResult<()> {
        self.finish_with_error(execution_id, ExecutionStatus::Failed, error).await
    }

    /// Record a skipped or cancelled run.
    #[instrument(skip(self), err)]
    pub async fn cancel_execution(&self, execution_id: Uuid, reason: &str) -> TrackerResult<()> {
        self.finish_with_error(execution_id, ExecutionStatus::Cancelled, reason).await
    }

    /// Look up a record; `None` when it does not exist.
    pub async fn get_execution(&self, execution_id: Uuid) -> TrackerResult<Option<ExecutionRecord>> {
        Ok(self.repository.get(execution_id).await?)
    }

    /// Whatever records exist for the evaluation; never fails on missing rows.
    pub async fn get_evaluation_executions(&self, evaluation_id: &str) -> TrackerResult<Vec<ExecutionRecord>> {
        Ok(self.repository.list_by_evaluation(evaluation_id).await?)
    }

    /// Latest record per agent.
    pub async fn latest_executions(&self, evaluation_id: &str) -> TrackerResult<HashMap<String, ExecutionRecord>> {
        let mut latest = HashMap::new();
        for record in self.get_evaluation_executions(evaluation_id).await? {
            latest.insert(record.agent_name.clone(), record);
        }
        Ok(latest)
    }

    /// Sort the expected agents by the state of their latest record.
    pub async fn are_all_agents_complete(
        &self,
        evaluation_id: &str,
        expected_agents: &[&str],
    ) -> TrackerResult<CompletionSummary> {
        let latest = self.latest_executions(evaluation_id).await?;
        let mut summary = CompletionSummary::default();

        for agent in expected_agents {
            match latest.get(*agent).map(|r| r.status) {
                Some(ExecutionStatus::Completed | ExecutionStatus::Cancelled) => {
                    summary.completed.push((*agent).to_string());
                }
                Some(ExecutionStatus::Failed) => summary.failed.push((*agent).to_string()),
                _ => summary.pending.push((*agent).to_string()),
            }
        }

        summary.complete = summary.pending.is_empty();
        Ok(summary)
    }

    /// Outputs of every completed agent, keyed by agent name.
    pub async fn get_completed_results(&self, evaluation_id: &str) -> TrackerResult<HashMap<String, AgentOutput>> {
        Ok(self
            .latest_executions(evaluation_id)
            .await?
            .into_iter()
            .filter(|(_, r)| r.status == ExecutionStatus::Completed)
            .filter_map(|(agent, r)| r.result.map(|output| (agent, output)))
            .collect())
    }

    /// Poll with backoff until `expected` records exist or `max_wait` passes,
    /// then return whatever is there.
    pub async fn wait_for_executions(
        &self,
        evaluation_id: &str,
        expected: usize,
        max_wait: Duration,
    ) -> TrackerResult<Vec<ExecutionRecord>> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(100))
            .with_max_interval(Duration::from_secs(2))
            .with_max_elapsed_time(Some(max_wait))
            .build();

        let outcome = backoff::future::retry(policy, move || async move {
            let rows = self
                .get_evaluation_executions(evaluation_id)
                .await
                .map_err(backoff::Error::permanent)?;
            if rows.len() < expected {
                return Err(backoff::Error::transient(TrackerError::MissingExecutions {
                    evaluation_id: evaluation_id.to_string(),
                    expected,
                    found: rows.len(),
                }));
            }
            Ok(rows)
        })
        .await;

        match outcome {
            Ok(rows) => Ok(rows),
            Err(TrackerError::MissingExecutions { found, .. }) => {
                warn!(evaluation_id, expected, found, "gave up waiting for execution records");
                self.get_evaluation_executions(evaluation_id).await
            }
            Err(e) => Err(e),
        }
    }

    async fn finish_with_error(&self, execution_id: Uuid, status: ExecutionStatus, error: &str) -> TrackerResult<()> {
        let mut record = self.load(execution_id).await?;
        let now = Utc::now();
        record.status = status;
        record.completed_at = Some(now);
        record.error = Some(error.to_string());
        record.updated_at = now;
        self.repository.update(&record).await?;
        self.verify(execution_id, status, |r| r.error.as_deref() == Some(error)).await
    }

    async fn load(&self, execution_id: Uuid) -> TrackerResult<ExecutionRecord> {
        self.repository
            .get(execution_id)
            .await?
            .ok_or(TrackerError::NotFound(execution_id))
    }

    async fn verify<F>(&self, execution_id: Uuid, expected: ExecutionStatus, check: F) -> TrackerResult<()>
    where
        F: Fn(&ExecutionRecord) -> bool + Send,
    {
        let stored = self.repository.get(execution_id).await?;
        match stored {
            Some(record) if record.status == expected && check(&record) => Ok(()),
            Some(record) => Err(TrackerError::PersistenceInconsistency {
                execution_id,
                expected: expected.as_str().to_string(),
                found: record.status.as_str().to_string(),
            }),
            None => Err(TrackerError::PersistenceInconsistency {
                execution_id,
                expected: expected.as_str().to_string(),
                found: "missing".to_string(),
            }),
        }
    }
}
