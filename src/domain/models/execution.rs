//! Durable execution records.
//!
//! An `ExecutionRecord` is the crash-recoverable projection of one agent run.
//! In-memory queue state is a cache over these rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::evaluation::AgentOutput;

/// Persisted status of an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// One agent run for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub evaluation_id: String,
    pub agent_name: String,
    pub status: ExecutionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<AgentOutput>,
    pub error: Option<String>,
    pub execution_time_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRecord {
    /// A fresh `Pending` record.
    pub fn new(evaluation_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            evaluation_id: evaluation_id.into(),
            agent_name: agent_name.into(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            execution_time_ms: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Completion summary of an evaluation's expected agents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionSummary {
    /// Every expected agent has a terminal record
    pub complete: bool,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    /// Expected agents without a terminal record (including missing rows)
    pub pending: Vec<String>,
}
