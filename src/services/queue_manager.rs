//! Queue manager: dependency-aware, priority-ordered scheduling of slow agents.
//!
//! Admission is cooperative. Every state change (enqueue, attempt settled,
//! retry delay elapsed, cancellation) triggers a `process_queue` pass instead
//! of a long-lived scheduler loop. All scheduler state sits behind one async
//! mutex, and every transition is written to the execution tracker before the
//! in-memory task is updated.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::agent_registry::{AgentCatalog, AgentRegistry, AgentSpec};
use super::execution_tracker::{ExecutionTracker, TrackerError};
use super::fallback::degraded_output;
use super::score_board::ScoreBoard;
use crate::domain::errors::DomainError;
use crate::domain::models::{
    retry_backoff, AgentInput, AgentOutput, AgentPriority, AgentProgress, AgentTask, EvaluationContext,
    EvaluationStatusView, ExecutionStatus, FallbackScorePolicy, OutputStatus, QueueConfig,
    QueueMetrics, TaskStatus, TerminalAction,
};
use crate::domain::ports::Agent;

/// Why an enqueue or a queue pass failed.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The registry has no spec for the agent.
    #[error("No configuration found for agent: {0}")]
    UnknownAgent(String),

    /// The catalog has no implementation for the agent.
    #[error("No implementation registered for agent: {0}")]
    MissingImplementation(String),

    /// Pending tasks reached `max_queue_size`.
    #[error("Queue is at maximum capacity ({0} pending tasks)")]
    QueueFull(usize),

    /// A non-terminal task for the same evaluation and agent exists.
    #[error("Task {0} is already queued")]
    DuplicateTask(String),

    /// A tracker write or read failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// An invalid task transition.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Result alias for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Why an attempt did not produce a usable output.
#[derive(Debug, Clone)]
enum AttemptFailure {
    TimedOut(String),
    Failed(String),
}

impl AttemptFailure {
    fn message(&self) -> &str {
        match self {
            Self::TimedOut(msg) | Self::Failed(msg) => msg,
        }
    }

    const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

/// Everything a spawned attempt needs, captured at admission.
struct Launch {
    task_id: String,
    agent_name: String,
    attempt: u32,
    timeout: Duration,
    agent: Arc<dyn Agent>,
    input: AgentInput,
}

#[derive(Default)]
struct QueueState {
    tasks: HashMap<String, AgentTask>,
    next_sequence: u64,
}

impl QueueState {
    fn count(&self, status: TaskStatus) -> usize {
        self.tasks.values().filter(|t| t.status == status).count()
    }

    fn dependency(&self, task: &AgentTask, dependency: &str) -> Option<&AgentTask> {
        self.tasks.get(&AgentTask::task_id(&task.evaluation_id, dependency))
    }

    fn dependencies_satisfied(&self, task: &AgentTask) -> bool {
        task.dependencies.iter().all(|dep| {
            self.dependency(task, dep)
                .is_some_and(|d| d.status.unblocks_dependents())
        })
    }

    /// Waiting on a dependency that failed permanently, directly or through
    /// another blocked dependency.
    fn is_blocked(&self, task: &AgentTask) -> bool {
        self.is_blocked_within(task, self.tasks.len())
    }

    fn is_blocked_within(&self, task: &AgentTask, depth: usize) -> bool {
        if depth == 0 || task.status != TaskStatus::Pending {
            return false;
        }
        task.dependencies.iter().any(|dep| match self.dependency(task, dep) {
            Some(d) if d.status.is_failed() => true,
            Some(d) => self.is_blocked_within(d, depth - 1),
            None => false,
        })
    }
}

struct Inner {
    config: QueueConfig,
    registry: AgentRegistry,
    catalog: AgentCatalog,
    tracker: ExecutionTracker,
    fallback: FallbackScorePolicy,
    scores: ScoreBoard,
    state: Mutex<QueueState>,
}

/// Shared handle to the scheduler. Clones drive the same queue.
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<Inner>,
}

/// Builder returned by `QueueManager::builder`.
pub struct QueueManagerBuilder {
    config: QueueConfig,
    registry: AgentRegistry,
    catalog: AgentCatalog,
    tracker: ExecutionTracker,
    fallback: FallbackScorePolicy,
    scores: ScoreBoard,
}

impl QueueManagerBuilder {
    /// Concurrency, capacity and retention limits.
    #[must_use]
    pub fn with_config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the standard registry.
    #[must_use]
    pub fn with_registry(mut self, registry: AgentRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Score and confidence of degraded outputs.
    #[must_use]
    pub const fn with_fallback_policy(mut self, fallback: FallbackScorePolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Share a score board with the orchestrator.
    #[must_use]
    pub fn with_score_board(mut self, scores: ScoreBoard) -> Self {
        self.scores = scores;
        self
    }

    /// Finish the builder with an empty queue.
    pub fn build(self) -> QueueManager {
        QueueManager {
            inner: Arc::new(Inner {
                config: self.config,
                registry: self.registry,
                catalog: self.catalog,
                tracker: self.tracker,
                fallback: self.fallback,
                scores: self.scores,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }
}

impl QueueManager {
    /// Standard registry, default limits and fallback policy.
    pub fn builder(tracker: ExecutionTracker, catalog: AgentCatalog) -> QueueManagerBuilder {
        QueueManagerBuilder {
            config: QueueConfig::default(),
            registry: AgentRegistry::standard(),
            catalog,
            tracker,
            fallback: FallbackScorePolicy::default(),
            scores: ScoreBoard::new(),
        }
    }

    /// Limits this queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Specs used to build tasks.
    pub fn registry(&self) -> &AgentRegistry {
        &self.inner.registry
    }

    /// Tracker every transition is written to.
    pub fn tracker(&self) -> &ExecutionTracker {
        &self.inner.tracker
    }

    /// Scores of every evaluation this queue has completed work for.
    pub fn scores(&self) -> &ScoreBoard {
        &self.inner.scores
    }

    /// Add an agent run for an evaluation and try to start it.
    #[instrument(skip(self, input), err)]
    pub async fn enqueue(
        &self,
        agent_name: &str,
        input: AgentInput,
        evaluation_id: &str,
        execution_id: Uuid,
    ) -> QueueResult<()> {
        let spec = self.spec(agent_name)?;
        {
            let mut state = self.inner.state.lock().await;

            let pending = state.count(TaskStatus::Pending);
            if pending >= self.inner.config.max_queue_size {
                return Err(QueueError::QueueFull(pending));
            }

            let task_id = AgentTask::task_id(evaluation_id, agent_name);
            if state.tasks.get(&task_id).is_some_and(|t| !t.status.is_terminal()) {
                return Err(QueueError::DuplicateTask(task_id));
            }

            let task = build_task(&mut state, spec, input, evaluation_id, execution_id);
            info!(
                agent = agent_name,
                evaluation_id,
                priority = spec.priority.as_str(),
                estimated_duration_ms = spec.estimated_duration_ms,
                "enqueued agent"
            );
            state.tasks.insert(task.id.clone(), task);
        }

        // The task is queued whatever this pass does to other tasks.
        self.run_pass("enqueue").await;
        Ok(())
    }

    /// Admit every ready task that fits in the free slots. Idempotent.
    ///
    /// Returns the number of attempts started.
    pub fn process_queue(&self) -> BoxFuture<'static, QueueResult<usize>> {
        let this = self.clone();
        async move { this.admit_ready().await }.boxed()
    }

    async fn admit_ready(&self) -> QueueResult<usize> {
        let mut launches = Vec::new();
        let mut first_error = None;
        {
            let mut state = self.inner.state.lock().await;
            loop {
                let now = Instant::now();
                // Admitted tasks are already `Running` in state.
                let running = state.count(TaskStatus::Running);
                let slots = self.inner.config.max_concurrent.saturating_sub(running);
                if slots == 0 {
                    debug!(running, max = self.inner.config.max_concurrent, "no free slots");
                    break;
                }

                let mut ready: Vec<(AgentPriority, u64, String)> = state
                    .tasks
                    .values()
                    .filter(|t| t.is_due(now) && state.dependencies_satisfied(t))
                    .map(|t| (t.priority, t.sequence, t.id.clone()))
                    .collect();
                if ready.is_empty() {
                    break;
                }
                ready.sort();

                let mut started = 0;
                let mut settled_without_attempt = false;
                for (_, _, task_id) in ready {
                    if started >= slots {
                        break;
                    }
                    let Some(task) = state.tasks.get_mut(&task_id) else {
                        continue;
                    };

                    if task.circuit_tripped(now) {
                        let elapsed = task.elapsed_since_queued(now);
                        task.last_error = Some(format!(
                            "Circuit breaker activated: total time {}ms exceeds {}ms",
                            elapsed.as_millis(),
                            task.timeout_strategy.circuit_breaker_ms
                        ));
                        task.last_attempt_timed_out = true;
                        warn!(agent = %task.agent_name, evaluation_id = %task.evaluation_id, "circuit breaker tripped");
                        if let Err(e) = self.apply_terminal_policy(task, now).await {
                            first_error.get_or_insert(e);
                        }
                        settled_without_attempt = true;
                        continue;
                    }

                    match self.admit(task, now).await {
                        Ok(launch) => {
                            launches.push(launch);
                            started += 1;
                        }
                        Err(e) => {
                            let e = self.defer_admission(task, now, e);
                            first_error.get_or_insert(e);
                        }
                    }
                }

                // A tripped breaker may have unblocked dependents.
                if !settled_without_attempt {
                    break;
                }
            }
        }

        let admitted = launches.len();
        for launch in launches {
            tokio::spawn(self.clone().run_attempt(launch));
        }
        first_error.map_or(Ok(admitted), Err)
    }

    /// Run a pass whose failure must not reach the caller.
    async fn run_pass(&self, trigger: &'static str) {
        if let Err(e) = self.process_queue().await {
            error!(trigger, error = %e, "queue pass failed");
        }
    }

    /// A task whose admission could not be recorded stays `Pending` and is
    /// retried by a later pass; a task that cannot run at all is failed.
    fn defer_admission(&self, task: &mut AgentTask, now: Instant, err: QueueError) -> QueueError {
        if !matches!(err, QueueError::Tracker(_)) {
            return abandon(task, now, err);
        }
        let delay = retry_backoff(1);
        task.retry_at = Some(now + delay);
        warn!(
            agent = %task.agent_name,
            evaluation_id = %task.evaluation_id,
            error = %err,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "admission not recorded, deferring"
        );
        self.wake_after(delay);
        err
    }

    async fn admit(&self, task: &mut AgentTask, now: Instant) -> QueueResult<Launch> {
        let spec = self.spec(&task.agent_name)?;
        let agent = self
            .inner
            .catalog
            .get(&task.agent_name)
            .ok_or_else(|| QueueError::MissingImplementation(task.agent_name.clone()))?;

        self.inner.tracker.mark_running(task.execution_id).await?;
        task.begin_attempt(now)?;

        let timeout = task.current_timeout();
        let input = spec.input_for_attempt(task.input.clone(), task.attempts);
        if task.attempts > 1 && spec.fallback_policy.minimal_mode {
            task.input = input.clone();
            debug!(agent = %task.agent_name, "applying minimal mode for retry");
        }

        info!(
            agent = %task.agent_name,
            evaluation_id = %task.evaluation_id,
            attempt = task.attempts,
            max_attempts = task.max_attempts,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "starting agent attempt"
        );

        Ok(Launch {
            task_id: task.id.clone(),
            agent_name: task.agent_name.clone(),
            attempt: task.attempts,
            timeout,
            agent,
            input,
        })
    }

    async fn run_attempt(self, launch: Launch) {
        let outcome = tokio::time::timeout(launch.timeout, launch.agent.execute(launch.input.clone())).await;

        let result = match outcome {
            Ok(Ok(output)) if output.status == OutputStatus::Failed => Err(AttemptFailure::Failed(
                output
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("{} reported failure", launch.agent_name)),
            )),
            Ok(Ok(output)) => output
                .validate()
                .map(|()| output)
                .map_err(|e| AttemptFailure::Failed(e.to_string())),
            Ok(Err(e)) => Err(AttemptFailure::Failed(e.to_string())),
            Err(_) => Err(AttemptFailure::TimedOut(format!(
                "Agent {} timed out after {}ms",
                launch.agent_name,
                launch.timeout.as_millis()
            ))),
        };

        if let Err(e) = self.settle_attempt(&launch, result).await {
            error!(agent = %launch.agent_name, error = %e, "failed to record attempt outcome");
        }
        self.run_pass("attempt settled").await;
    }

    async fn settle_attempt(&self, launch: &Launch, result: Result<AgentOutput, AttemptFailure>) -> QueueResult<()> {
        let mut state = self.inner.state.lock().await;
        let now = Instant::now();

        let Some(task) = state.tasks.get_mut(&launch.task_id) else {
            debug!(task_id = %launch.task_id, "discarding result for evicted task");
            return Ok(());
        };
        if task.status != TaskStatus::Running || task.attempts != launch.attempt {
            debug!(
                task_id = %launch.task_id,
                status = task.status.as_str(),
                "discarding late result"
            );
            return Ok(());
        }

        match result {
            Ok(output) => {
                let duration_ms = task.attempt_elapsed_ms(now);
                if let Err(e) = self
                    .inner
                    .tracker
                    .complete_execution(task.execution_id, &output, duration_ms)
                    .await
                {
                    return Err(abandon(task, now, e.into()));
                }
                task.finish(TaskStatus::Completed, now)?;
                self.inner.scores.record(&task.evaluation_id, &output).await;
                task.result = Some(output);
                info!(
                    agent = %task.agent_name,
                    evaluation_id = %task.evaluation_id,
                    duration_ms,
                    "agent completed"
                );
            }
            Err(failure) => {
                warn!(
                    agent = %task.agent_name,
                    attempt = task.attempts,
                    error = failure.message(),
                    "agent attempt failed"
                );
                task.last_error = Some(failure.message().to_string());
                task.last_attempt_timed_out = failure.is_timeout();

                if task.can_retry(now) {
                    let delay = retry_backoff(task.attempts);
                    task.schedule_retry(now + delay)?;
                    info!(
                        agent = %task.agent_name,
                        next_attempt = task.attempts + 1,
                        max_attempts = task.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "retry scheduled"
                    );
                    self.wake_after(delay);
                } else {
                    self.apply_terminal_policy(task, now).await?;
                }
            }
        }
        Ok(())
    }

    /// Degrade, skip or fail a task that has no attempts left. If the outcome
    /// cannot be recorded the task is abandoned as `Failed`.
    async fn apply_terminal_policy(&self, task: &mut AgentTask, now: Instant) -> QueueResult<()> {
        let reason = task.last_error.clone().unwrap_or_else(|| "unknown error".to_string());

        match task.fallback_policy.terminal_action() {
            TerminalAction::Degrade => {
                let output = degraded_output(
                    &task.agent_name,
                    Some(&reason),
                    &self.inner.fallback,
                    task.attempt_elapsed_ms(now),
                );
                if let Err(e) = self
                    .inner
                    .tracker
                    .complete_execution(task.execution_id, &output, output.execution_time_ms)
                    .await
                {
                    return Err(abandon(task, now, e.into()));
                }
                task.finish(TaskStatus::FallbackApplied, now)?;
                self.inner.scores.record(&task.evaluation_id, &output).await;
                task.result = Some(output);
                warn!(agent = %task.agent_name, reason = %reason, "graceful degradation applied");
            }
            TerminalAction::Skip => {
                if let Err(e) = self
                    .inner
                    .tracker
                    .cancel_execution(task.execution_id, &format!("Agent skipped due to failure: {reason}"))
                    .await
                {
                    return Err(abandon(task, now, e.into()));
                }
                task.finish(TaskStatus::Cancelled, now)?;
                info!(agent = %task.agent_name, "agent skipped, dependents continue");
            }
            TerminalAction::Fail => {
                if let Err(e) = self
                    .inner
                    .tracker
                    .fail_execution(
                        task.execution_id,
                        &format!("Permanent failure after {} attempts: {reason}", task.attempts),
                    )
                    .await
                {
                    return Err(abandon(task, now, e.into()));
                }
                let status = if task.last_attempt_timed_out {
                    TaskStatus::TimedOut
                } else {
                    TaskStatus::Failed
                };
                task.finish(status, now)?;
                error!(agent = %task.agent_name, "agent failed permanently, dependents stay blocked");
            }
        }
        Ok(())
    }

    fn wake_after(&self, delay: Duration) {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.run_pass("retry delay elapsed").await;
        });
    }

    /// Cancel every pending or running task of an evaluation.
    ///
    /// In-flight calls are not interrupted; their results are discarded.
    /// Tasks are cancelled even when their record cannot be updated; the
    /// first such tracker error is returned after the pass.
    #[instrument(skip(self), err)]
    pub async fn cancel_evaluation(&self, evaluation_id: &str) -> QueueResult<usize> {
        let (cancelled, first_error) = {
            let mut state = self.inner.state.lock().await;
            let now = Instant::now();
            let mut cancelled = 0;
            let mut first_error = None;

            for task in state.tasks.values_mut() {
                if task.evaluation_id != evaluation_id || task.status.is_terminal() {
                    continue;
                }
                if let Err(e) = self
                    .inner
                    .tracker
                    .cancel_execution(task.execution_id, "Evaluation cancelled")
                    .await
                {
                    error!(agent = %task.agent_name, error = %e, "cancellation not recorded");
                    first_error.get_or_insert(QueueError::from(e));
                }
                task.finish(TaskStatus::Cancelled, now)?;
                cancelled += 1;
            }
            (cancelled, first_error)
        };

        info!(evaluation_id, cancelled, "evaluation cancelled");
        // Freed slots may admit work from other evaluations.
        self.run_pass("evaluation cancelled").await;
        first_error.map_or(Ok(cancelled), Err)
    }

    /// Rebuild in-memory state for an evaluation from tracker records.
    ///
    /// Finished runs are restored as terminal tasks so their dependents can
    /// admit; unfinished runs of `agents` are re-enqueued under their
    /// existing execution ids.
    #[instrument(skip(self, context, previous_results, agents), fields(evaluation_id = %context.evaluation_id), err)]
    pub async fn resume_evaluation(
        &self,
        context: &EvaluationContext,
        previous_results: &HashMap<String, AgentOutput>,
        agents: &[String],
    ) -> QueueResult<usize> {
        let evaluation_id = context.evaluation_id.as_str();
        let latest = self.inner.tracker.latest_executions(evaluation_id).await?;
        let mut requeued = 0;

        {
            let mut state = self.inner.state.lock().await;
            for agent_name in agents {
                let Some(record) = latest.get(agent_name) else {
                    continue;
                };
                let spec = self.spec(agent_name)?;
                let task_id = AgentTask::task_id(evaluation_id, agent_name);
                if state.tasks.contains_key(&task_id) {
                    continue;
                }

                let input = AgentInput::new(context.clone()).with_previous_results(previous_results.clone());
                let mut task = build_task(&mut state, spec, input, evaluation_id, record.id);
                task.status = match record.status {
                    ExecutionStatus::Completed => {
                        task.result.clone_from(&record.result);
                        TaskStatus::Completed
                    }
                    ExecutionStatus::Cancelled => TaskStatus::Cancelled,
                    ExecutionStatus::Failed => TaskStatus::Failed,
                    ExecutionStatus::Pending | ExecutionStatus::Running => {
                        requeued += 1;
                        TaskStatus::Pending
                    }
                };
                if task.status.is_terminal() {
                    task.finished_at = record.completed_at;
                    task.finished_instant = Some(Instant::now());
                }
                state.tasks.insert(task_id, task);
            }
        }

        info!(requeued, "evaluation resumed from tracker");
        self.run_pass("evaluation resumed").await;
        Ok(requeued)
    }

    /// Status of one evaluation as seen by the queue.
    pub async fn evaluation_status(&self, evaluation_id: &str) -> EvaluationStatusView {
        EvaluationStatusView::from_progress(evaluation_id, &self.agent_progress(evaluation_id).await)
    }

    /// Per-agent progress of one evaluation's queue-managed tasks.
    pub async fn agent_progress(&self, evaluation_id: &str) -> Vec<AgentProgress> {
        let state = self.inner.state.lock().await;
        let now = Instant::now();

        let mut tasks: Vec<&AgentTask> = state
            .tasks
            .values()
            .filter(|t| t.evaluation_id == evaluation_id)
            .collect();
        tasks.sort_by_key(|t| t.sequence);

        tasks
            .into_iter()
            .map(|t| {
                let remaining_ms = if t.status == TaskStatus::Running {
                    t.estimated_duration_ms.saturating_sub(t.attempt_elapsed_ms(now))
                } else {
                    0
                };
                AgentProgress {
                    agent_name: t.agent_name.clone(),
                    status: t.status,
                    blocked: state.is_blocked(t),
                    remaining_ms,
                }
            })
            .collect()
    }

    /// Counts and averages over every task held in memory.
    pub async fn metrics(&self) -> QueueMetrics {
        let state = self.inner.state.lock().await;

        let total_queued = state.count(TaskStatus::Pending);
        let total_running = state.count(TaskStatus::Running);
        let completed: Vec<&AgentTask> = state.tasks.values().filter(|t| t.status.is_completed()).collect();
        let total_failed = state.tasks.values().filter(|t| t.status.is_failed()).count();

        let waits: Vec<f64> = state
            .tasks
            .values()
            .filter_map(|t| t.first_started_instant.map(|s| millis(s - t.queued_instant)))
            .collect();
        let executions: Vec<f64> = completed
            .iter()
            .filter_map(|t| match (t.started_instant, t.finished_instant) {
                (Some(start), Some(end)) => Some(millis(end.saturating_duration_since(start))),
                _ => None,
            })
            .collect();

        let finished = completed.len() + total_failed;
        QueueMetrics {
            total_queued,
            total_running,
            total_completed: completed.len(),
            total_failed,
            average_wait_time_ms: mean(&waits),
            average_execution_time_ms: mean(&executions),
            success_rate: if finished == 0 {
                0.0
            } else {
                completed.len() as f64 / finished as f64
            },
            resource_utilization: if self.inner.config.max_concurrent == 0 {
                0.0
            } else {
                total_running as f64 / self.inner.config.max_concurrent as f64
            },
        }
    }

    /// Copy of a task, if it is still held in memory.
    pub async fn task(&self, evaluation_id: &str, agent_name: &str) -> Option<AgentTask> {
        self.inner
            .state
            .lock()
            .await
            .tasks
            .get(&AgentTask::task_id(evaluation_id, agent_name))
            .cloned()
    }

    /// Evict terminal tasks that finished longer ago than the retention window.
    ///
    /// An evaluation's score calculator goes with its last task.
    pub async fn cleanup_expired(&self) -> usize {
        let retention = Duration::from_secs(self.inner.config.retention_secs);
        let now = Instant::now();
        let (evicted, expired_evaluations) = {
            let mut state = self.inner.state.lock().await;
            let before = state.tasks.len();
            let mut expired_evaluations = HashSet::new();

            state.tasks.retain(|_, t| {
                let expired = t.status.is_terminal()
                    && t
                        .finished_instant
                        .is_some_and(|f| now.saturating_duration_since(f) >= retention);
                if expired {
                    expired_evaluations.insert(t.evaluation_id.clone());
                }
                !expired
            });
            expired_evaluations.retain(|id| !state.tasks.values().any(|t| &t.evaluation_id == id));
            (before - state.tasks.len(), expired_evaluations)
        };

        for evaluation_id in expired_evaluations {
            self.inner.scores.remove(&evaluation_id).await;
            debug!(evaluation_id = %evaluation_id, "evicted score calculator");
        }
        if evicted > 0 {
            debug!(evicted, "evicted finished tasks");
        }
        evicted
    }

    /// Run `cleanup_expired` on the configured interval until aborted.
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        let this = self.clone();
        let period = Duration::from_secs(self.inner.config.cleanup_interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                this.cleanup_expired().await;
            }
        })
    }

    fn spec(&self, agent_name: &str) -> QueueResult<&AgentSpec> {
        let spec = self
            .inner
            .registry
            .get(agent_name)
            .ok_or_else(|| QueueError::UnknownAgent(agent_name.to_string()))?;
        if self.inner.catalog.get(agent_name).is_none() {
            return Err(QueueError::MissingImplementation(agent_name.to_string()));
        }
        Ok(spec)
    }
}

/// Take a task out of scheduling after its outcome could not be recorded.
/// Its slot is freed and dependents stay blocked.
fn abandon(task: &mut AgentTask, now: Instant, err: QueueError) -> QueueError {
    task.last_error = Some(format!("Execution record not updated: {err}"));
    if let Err(e) = task.finish(TaskStatus::Failed, now) {
        warn!(task_id = %task.id, error = %e, "task already settled");
    }
    error!(
        agent = %task.agent_name,
        evaluation_id = %task.evaluation_id,
        error = %err,
        "tracker write failed, task abandoned"
    );
    err
}

fn build_task(
    state: &mut QueueState,
    spec: &AgentSpec,
    input: AgentInput,
    evaluation_id: &str,
    execution_id: Uuid,
) -> AgentTask {
    let sequence = state.next_sequence;
    state.next_sequence += 1;

    AgentTask {
        id: AgentTask::task_id(evaluation_id, &spec.name),
        sequence,
        evaluation_id: evaluation_id.to_string(),
        execution_id,
        agent_name: spec.name.clone(),
        input,
        priority: spec.priority,
        dependencies: spec.dependencies.clone(),
        attempts: 0,
        max_attempts: spec.max_attempts(),
        timeout_strategy: spec.timeout_strategy.clone(),
        fallback_policy: spec.fallback_policy,
        status: TaskStatus::Pending,
        queued_at: chrono::Utc::now(),
        started_at: None,
        finished_at: None,
        last_error: None,
        last_attempt_timed_out: false,
        estimated_duration_ms: spec.estimated_duration_ms,
        result: None,
        queued_instant: Instant::now(),
        first_started_instant: None,
        started_instant: None,
        finished_instant: None,
        retry_at: None,
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
