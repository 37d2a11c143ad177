//! Read models served to pollers: per-evaluation status and queue metrics.

use serde::{Deserialize, Serialize};

use super::agent::names;
use super::agent_task::TaskStatus;

/// Coarse state of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Work is still in flight or admissible
    Running,
    /// Nothing can progress further, but some agents failed or stay blocked
    Partial,
    /// Every agent finished without a permanent failure
    Completed,
    /// A critical-path agent failed permanently
    Failed,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Partial => "partial",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Where one agent stands within an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProgress {
    pub agent_name: String,
    pub status: TaskStatus,
    /// Pending on a dependency that failed permanently
    pub blocked: bool,
    /// Estimated time left for a running agent
    pub remaining_ms: u64,
}

impl AgentProgress {
    pub fn new(agent_name: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            agent_name: agent_name.into(),
            status,
            blocked: false,
            remaining_ms: 0,
        }
    }
}

/// Status view polled by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationStatusView {
    pub evaluation_id: String,
    pub total_agents: usize,
    pub completed_agents: usize,
    pub running_agents: usize,
    pub failed_agents: usize,
    pub progress_percent: f64,
    pub estimated_time_remaining_ms: u64,
    pub overall_status: OverallStatus,
}

impl EvaluationStatusView {
    pub fn from_progress(evaluation_id: impl Into<String>, agents: &[AgentProgress]) -> Self {
        let total_agents = agents.len();
        let completed_agents = agents
            .iter()
            .filter(|a| a.status.is_completed() || a.status == TaskStatus::Cancelled)
            .count();
        let running_agents = agents.iter().filter(|a| a.status == TaskStatus::Running).count();
        let failed_agents = agents.iter().filter(|a| a.status.is_failed()).count();
        let waiting = agents
            .iter()
            .filter(|a| a.status == TaskStatus::Pending && !a.blocked)
            .count();
        let blocked = agents
            .iter()
            .filter(|a| a.status == TaskStatus::Pending && a.blocked)
            .count();

        let progress_percent = if total_agents == 0 {
            0.0
        } else {
            completed_agents as f64 / total_agents as f64 * 100.0
        };

        let estimated_time_remaining_ms = agents
            .iter()
            .filter(|a| a.status == TaskStatus::Running)
            .map(|a| a.remaining_ms)
            .max()
            .unwrap_or(0);

        let critical_failed = agents
            .iter()
            .any(|a| a.status.is_failed() && names::is_critical(&a.agent_name));

        let overall_status = if critical_failed {
            OverallStatus::Failed
        } else if total_agents == 0 || running_agents > 0 || waiting > 0 {
            OverallStatus::Running
        } else if failed_agents == 0 && blocked == 0 {
            OverallStatus::Completed
        } else {
            OverallStatus::Partial
        };

        Self {
            evaluation_id: evaluation_id.into(),
            total_agents,
            completed_agents,
            running_agents,
            failed_agents,
            progress_percent,
            estimated_time_remaining_ms,
            overall_status,
        }
    }
}

/// Operational metrics of the queue manager.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMetrics {
    pub total_queued: usize,
    pub total_running: usize,
    pub total_completed: usize,
    pub total_failed: usize,
    pub average_wait_time_ms: f64,
    pub average_execution_time_ms: f64,
    pub success_rate: f64,
    pub resource_utilization: f64,
}
