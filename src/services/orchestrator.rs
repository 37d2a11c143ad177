//! Orchestration front: runs fast agents under a wall-clock budget and hands
//! slow agents to the queue through the transport chain.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::agent_registry::{AgentCatalog, AgentRegistry};
use super::execution_tracker::{ExecutionTracker, TrackerError};
use super::profile::OrchestrationProfile;
use super::queue_manager::{QueueError, QueueManager};
use super::score_board::ScoreBoard;
use crate::adapters::transports::{DeliveryFailure, TransportChain};
use crate::domain::models::{
    AgentInput, AgentOutput, AgentProgress, EvaluationContext, EvaluationStatusView, ExecutionRecord,
    ExecutionStatus, OutputStatus, ScoreUpdate, TaskStatus,
};
use crate::domain::ports::{Agent, DispatchRequest};

/// Failures surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Result alias for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// What `run_evaluation` did before returning.
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    pub evaluation_id: String,
    /// Output of every fast agent, failed ones included
    pub fast_outputs: HashMap<String, AgentOutput>,
    /// Slow agent name to the transport that accepted it
    pub dispatched: HashMap<String, String>,
    pub delivery_failures: Vec<DeliveryFailure>,
    /// Score after the fast phase
    pub score: Option<ScoreUpdate>,
    pub fast_phase_elapsed: Duration,
}

impl EvaluationRun {
    /// Fast agents that failed or timed out.
    pub fn fast_failures(&self) -> usize {
        self.fast_outputs
            .values()
            .filter(|o| o.status == OutputStatus::Failed)
            .count()
    }
}

/// Runs evaluations under one `OrchestrationProfile`.
pub struct Orchestrator {
    profile: OrchestrationProfile,
    registry: AgentRegistry,
    catalog: AgentCatalog,
    tracker: ExecutionTracker,
    scores: ScoreBoard,
    transports: TransportChain,
    queue: Option<QueueManager>,
}

impl Orchestrator {
    /// Without a queue, slow agents are only delivered, never observed.
    pub fn new(
        profile: OrchestrationProfile,
        catalog: AgentCatalog,
        tracker: ExecutionTracker,
        transports: TransportChain,
    ) -> Self {
        Self {
            profile,
            registry: AgentRegistry::standard(),
            catalog,
            tracker,
            scores: ScoreBoard::new(),
            transports,
            queue: None,
        }
    }

    /// Observe and cancel through a local queue; adopts its registry and
    /// score board so both phases feed the same calculator.
    #[must_use]
    pub fn with_queue(mut self, queue: QueueManager) -> Self {
        self.registry = queue.registry().clone();
        self.scores = queue.scores().clone();
        self.queue = Some(queue);
        self
    }

    /// Use a shared score board. `with_queue` replaces it with the queue's.
    #[must_use]
    pub fn with_score_board(mut self, scores: ScoreBoard) -> Self {
        self.scores = scores;
        self
    }

    /// Profile this orchestrator runs.
    pub fn profile(&self) -> &OrchestrationProfile {
        &self.profile
    }

    /// Tracker every transition is written to.
    pub fn tracker(&self) -> &ExecutionTracker {
        &self.tracker
    }

    /// Scores fed by fast outputs and, with a queue, by slow ones.
    pub fn scores(&self) -> &ScoreBoard {
        &self.scores
    }

    /// Run the fast phase to completion, then dispatch every slow agent.
    #[instrument(skip(self, context), fields(evaluation_id = %context.evaluation_id), err)]
    pub async fn run_evaluation(&self, context: EvaluationContext) -> OrchestratorResult<EvaluationRun> {
        let evaluation_id = context.evaluation_id.clone();
        let started = Instant::now();

        let fast_outputs = self.run_fast_phase(&context).await?;
        let fast_phase_elapsed = started.elapsed();
        info!(
            agents = fast_outputs.len(),
            elapsed_ms = u64::try_from(fast_phase_elapsed.as_millis()).unwrap_or(u64::MAX),
            "fast phase finished"
        );

        let successful: HashMap<String, AgentOutput> = fast_outputs
            .iter()
            .filter(|(_, o)| o.status == OutputStatus::Completed)
            .map(|(name, o)| (name.clone(), o.clone()))
            .collect();
        let (dispatched, delivery_failures) = self.dispatch_slow_agents(&context, successful).await?;

        Ok(EvaluationRun {
            score: self.scores.snapshot(&evaluation_id).await,
            evaluation_id,
            fast_outputs,
            dispatched,
            delivery_failures,
            fast_phase_elapsed,
        })
    }

    async fn run_fast_phase(&self, context: &EvaluationContext) -> OrchestratorResult<HashMap<String, AgentOutput>> {
        let deadline = Instant::now() + self.profile.fast_budget;

        let mut runs = Vec::with_capacity(self.profile.fast_agents.len());
        for agent_name in &self.profile.fast_agents {
            let execution_id = self.tracker.start_execution(&context.evaluation_id, agent_name).await?;
            self.tracker.mark_running(execution_id).await?;
            let limit = self.profile.fast_timeout(agent_name);
            runs.push((agent_name.clone(), execution_id, limit, self.catalog.get(agent_name)));
        }

        let input = AgentInput::new(context.clone());
        let outcomes = join_all(runs.into_iter().map(|(agent_name, execution_id, limit, agent)| {
            let input = input.clone();
            async move {
                let started = Instant::now();
                let outcome = run_fast_agent(&agent_name, agent, input, limit, deadline).await;
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                (agent_name, execution_id, outcome, elapsed_ms)
            }
        }))
        .await;

        let mut outputs = HashMap::with_capacity(outcomes.len());
        for (agent_name, execution_id, outcome, elapsed_ms) in outcomes {
            let output = match outcome {
                Ok(output) => {
                    self.tracker.complete_execution(execution_id, &output, elapsed_ms).await?;
                    self.scores.record(&context.evaluation_id, &output).await;
                    output
                }
                Err(message) => {
                    warn!(agent = %agent_name, error = %message, "fast agent failed");
                    self.tracker.fail_execution(execution_id, &message).await?;
                    AgentOutput::failed(agent_name.clone(), message, elapsed_ms)
                }
            };
            outputs.insert(agent_name, output);
        }
        Ok(outputs)
    }

    async fn dispatch_slow_agents(
        &self,
        context: &EvaluationContext,
        previous_results: HashMap<String, AgentOutput>,
    ) -> OrchestratorResult<(HashMap<String, String>, Vec<DeliveryFailure>)> {
        let mut dispatched = HashMap::new();
        let mut failures = Vec::new();

        for agent_name in &self.profile.slow_agents {
            let execution_id = self.tracker.start_execution(&context.evaluation_id, agent_name).await?;
            let request = DispatchRequest {
                evaluation_id: context.evaluation_id.clone(),
                execution_id,
                agent_name: agent_name.clone(),
                input: AgentInput::new(context.clone()).with_previous_results(previous_results.clone()),
            };

            match self.transports.deliver(&request).await {
                Ok(report) => {
                    dispatched.insert(agent_name.clone(), report.transport);
                }
                Err(failure) => {
                    self.record_delivery_failure(execution_id, &failure).await?;
                    failures.push(failure);
                }
            }
        }
        Ok((dispatched, failures))
    }

    async fn record_delivery_failure(&self, execution_id: Uuid, failure: &DeliveryFailure) -> OrchestratorResult<()> {
        warn!(agent = %failure.agent_name, error = %failure, "slow agent could not be delivered");
        // The in-process transport may have settled the record before refusing.
        let already_terminal = self
            .tracker
            .get_execution(execution_id)
            .await?
            .is_some_and(|r| r.status.is_terminal());
        if !already_terminal {
            self.tracker.fail_execution(execution_id, &failure.to_string()).await?;
        }
        Ok(())
    }

    /// Status of an evaluation from tracker records, refined with queue
    /// estimates when a local queue is attached.
    pub async fn status(&self, evaluation_id: &str) -> OrchestratorResult<EvaluationStatusView> {
        let latest = self.tracker.latest_executions(evaluation_id).await?;
        let queued: HashMap<String, AgentProgress> = match &self.queue {
            Some(queue) => queue
                .agent_progress(evaluation_id)
                .await
                .into_iter()
                .map(|p| (p.agent_name.clone(), p))
                .collect(),
            None => HashMap::new(),
        };

        let mut agents: Vec<AgentProgress> = latest
            .values()
            .map(|record| {
                let mut progress = AgentProgress::new(record.agent_name.clone(), task_status(record));
                if let Some(task) = queued.get(&record.agent_name) {
                    if task.status == TaskStatus::TimedOut && progress.status == TaskStatus::Failed {
                        progress.status = TaskStatus::TimedOut;
                    } else if task.status.is_terminal() && !progress.status.is_terminal() {
                        // The queue settled it but could not update the record.
                        progress.status = task.status;
                    }
                    progress.remaining_ms = task.remaining_ms;
                }
                progress
            })
            .collect();

        for progress in &mut agents {
            progress.blocked =
                progress.status == TaskStatus::Pending && self.dependency_failed(&progress.agent_name, &latest);
        }
        agents.sort_by(|a, b| a.agent_name.cmp(&b.agent_name));

        Ok(EvaluationStatusView::from_progress(evaluation_id, &agents))
    }

    fn dependency_failed(&self, agent_name: &str, latest: &HashMap<String, ExecutionRecord>) -> bool {
        self.registry.get(agent_name).is_some_and(|spec| {
            spec.dependencies
                .iter()
                .any(|dep| latest.get(dep).is_some_and(|r| r.status == ExecutionStatus::Failed))
        })
    }

    /// Cancel queued work of an evaluation. Without a local queue nothing is
    /// cancelled.
    pub async fn cancel(&self, evaluation_id: &str) -> OrchestratorResult<usize> {
        match &self.queue {
            Some(queue) => Ok(queue.cancel_evaluation(evaluation_id).await?),
            None => Ok(0),
        }
    }

    /// Rebuild queue state and scores for an evaluation after a restart.
    pub async fn resume(&self, context: &EvaluationContext) -> OrchestratorResult<usize> {
        let Some(queue) = &self.queue else {
            return Ok(0);
        };
        let previous = self.tracker.get_completed_results(&context.evaluation_id).await?;
        for output in previous.values() {
            self.scores.record(&context.evaluation_id, output).await;
        }
        Ok(queue
            .resume_evaluation(context, &previous, &self.profile.slow_agents)
            .await?)
    }
}

async fn run_fast_agent(
    agent_name: &str,
    agent: Option<Arc<dyn Agent>>,
    input: AgentInput,
    limit: Duration,
    deadline: Instant,
) -> Result<AgentOutput, String> {
    let agent = agent.ok_or_else(|| format!("No implementation registered for agent: {agent_name}"))?;
    let remaining = deadline.saturating_duration_since(Instant::now());
    let limit = limit.min(remaining);

    match tokio::time::timeout(limit, agent.execute(input)).await {
        Ok(Ok(output)) if output.status == OutputStatus::Failed => Err(output
            .error_message
            .unwrap_or_else(|| format!("{agent_name} reported failure"))),
        Ok(Ok(output)) => output.validate().map(|()| output).map_err(|e| e.to_string()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("Agent {agent_name} timed out after {}ms", limit.as_millis())),
    }
}

fn task_status(record: &ExecutionRecord) -> TaskStatus {
    match record.status {
        ExecutionStatus::Pending => TaskStatus::Pending,
        ExecutionStatus::Running => TaskStatus::Running,
        ExecutionStatus::Completed if record.result.as_ref().is_some_and(AgentOutput::is_fallback) => {
            TaskStatus::FallbackApplied
        }
        ExecutionStatus::Completed => TaskStatus::Completed,
        ExecutionStatus::Failed => TaskStatus::Failed,
        ExecutionStatus::Cancelled => TaskStatus::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::agents::{simulated_catalog, SimulatedAgent, SimulatedResponse};
    use crate::adapters::memory::InMemoryExecutionRepository;
    use crate::domain::models::names;
    use crate::domain::models::OverallStatus;

    fn tracker() -> ExecutionTracker {
        ExecutionTracker::new(Arc::new(InMemoryExecutionRepository::new()))
    }

    fn context() -> EvaluationContext {
        EvaluationContext::new("eval-1", "brand-1", "https://example.com")
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_failure_does_not_abort_siblings() {
        let catalog = simulated_catalog(names::ALL).with_agent(Arc::new(SimulatedAgent::with_default_response(
            names::SCHEMA,
            SimulatedResponse::failure("parser crashed"),
        )));
        let profile = OrchestrationProfile::hybrid();
        let orchestrator = Orchestrator::new(profile, catalog, tracker(), TransportChain::new());

        let run = orchestrator.run_evaluation(context()).await.unwrap();

        assert_eq!(run.fast_outputs.len(), 6);
        assert_eq!(run.fast_failures(), 1);
        let schema = &run.fast_outputs[names::SCHEMA];
        assert_eq!(schema.error_message.as_deref(), Some("Agent execution failed: parser crashed"));
        assert!(run.score.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_phase_respects_budget() {
        let slow = SimulatedResponse::success(90.0).with_latency(Duration::from_secs(30));
        let catalog = simulated_catalog(names::ALL)
            .with_agent(Arc::new(SimulatedAgent::with_default_response(names::SEMANTIC, slow)));
        let profile = OrchestrationProfile::hybrid()
            .with_fast_budget(Duration::from_millis(1_000))
            .with_fast_timeout(names::SEMANTIC, 60_000);
        let orchestrator = Orchestrator::new(profile, catalog, tracker(), TransportChain::new());

        let run = orchestrator.run_evaluation(context()).await.unwrap();

        assert!(run.fast_phase_elapsed <= Duration::from_millis(1_100));
        let semantic = &run.fast_outputs[names::SEMANTIC];
        assert_eq!(semantic.status, OutputStatus::Failed);
        assert!(semantic.error_message.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undeliverable_slow_agents_are_marked_failed() {
        let tracker = tracker();
        let orchestrator = Orchestrator::new(
            OrchestrationProfile::hybrid(),
            simulated_catalog(names::ALL),
            tracker.clone(),
            TransportChain::new(),
        );

        let run = orchestrator.run_evaluation(context()).await.unwrap();
        assert_eq!(run.delivery_failures.len(), 6);
        assert!(run.dispatched.is_empty());

        let latest = tracker.latest_executions("eval-1").await.unwrap();
        let crawl = &latest[names::CRAWL];
        assert_eq!(crawl.status, ExecutionStatus::Failed);
        assert!(crawl.error.as_deref().unwrap().contains("no transports configured"));

        let status = orchestrator.status("eval-1").await.unwrap();
        assert_eq!(status.overall_status, OverallStatus::Failed);
        assert_eq!(status.total_agents, 12);
    }

    #[test]
    fn test_fallback_records_map_to_fallback_applied() {
        let mut record = ExecutionRecord::new("e", names::COMMERCE);
        record.status = ExecutionStatus::Completed;
        record.result = Some(crate::services::fallback::degraded_output(
            names::COMMERCE,
            Some("boom"),
            &crate::domain::models::FallbackScorePolicy::default(),
            0,
        ));
        assert_eq!(task_status(&record), TaskStatus::FallbackApplied);
    }
}
