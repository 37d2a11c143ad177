//! Queue-managed agent task.
//!
//! An `AgentTask` is created when a slow agent is enqueued and is mutated only
//! by the queue manager. Its lifecycle is
//! `Pending -> Running -> {terminal | Pending (retry)}`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use super::agent::AgentPriority;
use super::evaluation::{AgentInput, AgentOutput};
use crate::domain::errors::{DomainError, DomainResult};

/// Base delay of the first retry.
pub const BASE_BACKOFF_MS: u64 = 1_000;
/// Upper bound for any retry delay.
pub const MAX_BACKOFF_MS: u64 = 30_000;

/// Delay before re-queueing a task that has made `attempts` attempts.
///
/// `min(1000 * 2^(attempts - 1), 30000)` milliseconds.
pub fn retry_backoff(attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(16);
    let delay = BASE_BACKOFF_MS.saturating_mul(1u64 << exponent);
    Duration::from_millis(delay.min(MAX_BACKOFF_MS))
}

/// Status of a task inside the queue manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for dependencies, a free slot, or a retry delay
    Pending,
    /// An attempt is in flight
    Running,
    /// Finished with a real result
    Completed,
    /// Failed permanently; dependents stay blocked
    Failed,
    /// Failed permanently after a timed-out final attempt
    TimedOut,
    /// Skipped or cancelled; dependents proceed without its result
    Cancelled,
    /// Finished with a synthesized placeholder result
    FallbackApplied,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::FallbackApplied => "fallback_applied",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "timed_out" | "timedout" => Some(Self::TimedOut),
            "cancelled" | "canceled" | "skipped" => Some(Self::Cancelled),
            "fallback_applied" => Some(Self::FallbackApplied),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Finished with a result dependents can consume.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed | Self::FallbackApplied)
    }

    /// Failed permanently.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }

    /// Whether dependents of a task in this status may be admitted.
    pub fn unblocks_dependents(&self) -> bool {
        matches!(self, Self::Completed | Self::FallbackApplied | Self::Cancelled)
    }

    pub fn valid_transitions(&self) -> &'static [Self] {
        match self {
            // Pending can short-circuit to a terminal status when the
            // circuit breaker trips before an attempt starts.
            Self::Pending => &[
                Self::Running,
                Self::Cancelled,
                Self::Failed,
                Self::TimedOut,
                Self::FallbackApplied,
            ],
            Self::Running => &[
                Self::Pending,
                Self::Completed,
                Self::Failed,
                Self::TimedOut,
                Self::Cancelled,
                Self::FallbackApplied,
            ],
            _ => &[],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Progressive timeout ladder plus hard ceilings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutStrategy {
    /// Timeout of the first attempt
    pub initial_ms: u64,
    /// Timeouts of attempts 2.. (last entry repeats)
    pub progressive_ms: Vec<u64>,
    /// No retry is scheduled once this much time has passed since enqueue
    pub max_total_ms: u64,
    /// No attempt starts once this much time has passed since enqueue
    pub circuit_breaker_ms: u64,
}

impl TimeoutStrategy {
    /// Timeout for a 1-based attempt number.
    pub fn timeout_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.progressive_ms.is_empty() {
            return Duration::from_millis(self.initial_ms);
        }
        let index = (attempt as usize - 2).min(self.progressive_ms.len() - 1);
        Duration::from_millis(self.progressive_ms[index])
    }

    /// One attempt per ladder rung.
    pub fn max_attempts(&self) -> u32 {
        u32::try_from(self.progressive_ms.len() + 1).unwrap_or(u32::MAX)
    }

    pub const fn max_total(&self) -> Duration {
        Duration::from_millis(self.max_total_ms)
    }

    pub const fn circuit_breaker(&self) -> Duration {
        Duration::from_millis(self.circuit_breaker_ms)
    }
}

/// What to do once a task has no attempts left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FallbackPolicy {
    pub enabled: bool,
    /// Retries run with a reduced-scope input
    pub minimal_mode: bool,
    /// Substitute a placeholder result and unblock dependents
    pub graceful_degradation: bool,
    /// Cancel instead of failing so dependents proceed
    pub skip_if_failed: bool,
}

/// Resolution applied when a task runs out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalAction {
    Degrade,
    Skip,
    Fail,
}

impl FallbackPolicy {
    pub const fn terminal_action(&self) -> TerminalAction {
        if self.enabled && self.graceful_degradation {
            TerminalAction::Degrade
        } else if self.skip_if_failed {
            TerminalAction::Skip
        } else {
            TerminalAction::Fail
        }
    }
}

/// A slow agent run owned by the queue manager.
#[derive(Debug, Clone)]
pub struct AgentTask {
    /// `{evaluation_id}-{agent_name}`
    pub id: String,
    /// Enqueue order, breaks ties between equal priorities
    pub sequence: u64,
    pub evaluation_id: String,
    pub execution_id: Uuid,
    pub agent_name: String,
    pub input: AgentInput,
    pub priority: AgentPriority,
    pub dependencies: Vec<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub timeout_strategy: TimeoutStrategy,
    pub fallback_policy: FallbackPolicy,
    pub status: TaskStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_attempt_timed_out: bool,
    pub estimated_duration_ms: u64,
    pub result: Option<AgentOutput>,
    /// Monotonic enqueue time; all elapsed-time checks use this
    pub queued_instant: Instant,
    pub first_started_instant: Option<Instant>,
    pub started_instant: Option<Instant>,
    pub finished_instant: Option<Instant>,
    /// Earliest time a retry may be admitted
    pub retry_at: Option<Instant>,
}

impl AgentTask {
    pub fn task_id(evaluation_id: &str, agent_name: &str) -> String {
        format!("{evaluation_id}-{agent_name}")
    }

    pub fn elapsed_since_queued(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.queued_instant)
    }

    /// Ready to be admitted once dependencies are satisfied.
    pub fn is_due(&self, now: Instant) -> bool {
        self.status == TaskStatus::Pending && self.retry_at.map_or(true, |at| at <= now)
    }

    pub fn circuit_tripped(&self, now: Instant) -> bool {
        self.elapsed_since_queued(now) > self.timeout_strategy.circuit_breaker()
    }

    pub fn can_retry(&self, now: Instant) -> bool {
        self.attempts < self.max_attempts && self.elapsed_since_queued(now) < self.timeout_strategy.max_total()
    }

    /// Timeout of the attempt currently in flight.
    pub fn current_timeout(&self) -> Duration {
        self.timeout_strategy.timeout_for_attempt(self.attempts)
    }

    pub fn transition_to(&mut self, next: TaskStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
                reason: format!("task {}", self.id),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Enter `Running` for a new attempt.
    pub fn begin_attempt(&mut self, now: Instant) -> DomainResult<()> {
        self.transition_to(TaskStatus::Running)?;
        self.attempts += 1;
        self.retry_at = None;
        self.started_at = Some(Utc::now());
        self.started_instant = Some(now);
        self.first_started_instant.get_or_insert(now);
        Ok(())
    }

    /// Return to `Pending`, admissible again at `retry_at`.
    pub fn schedule_retry(&mut self, retry_at: Instant) -> DomainResult<()> {
        self.transition_to(TaskStatus::Pending)?;
        self.retry_at = Some(retry_at);
        Ok(())
    }

    /// Move into a terminal status and stamp the finish time.
    pub fn finish(&mut self, status: TaskStatus, now: Instant) -> DomainResult<()> {
        self.transition_to(status)?;
        self.finished_at = Some(Utc::now());
        self.finished_instant = Some(now);
        Ok(())
    }

    /// Milliseconds the current or last attempt has been running.
    pub fn attempt_elapsed_ms(&self, now: Instant) -> u64 {
        let since = self.started_instant.unwrap_or(self.queued_instant);
        u64::try_from(now.saturating_duration_since(since).as_millis()).unwrap_or(u64::MAX)
    }
}
