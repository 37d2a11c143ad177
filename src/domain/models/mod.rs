//! Domain models.

pub mod agent;
pub mod agent_task;
pub mod config;
pub mod evaluation;
pub mod execution;
pub mod score;
pub mod status;

pub use agent::{names, AgentPriority, Pillar};
pub use agent_task::{
    retry_backoff, AgentTask, FallbackPolicy, TaskStatus, TerminalAction, TimeoutStrategy,
};
pub use config::{
    Config, DatabaseConfig, DeliveryConfig, FallbackScorePolicy, LoggingConfig, OrchestrationConfig,
    ProfileKind, QueueConfig,
};
pub use evaluation::{
    AgentInput, AgentOutput, AgentResult, EvaluationContext, EvaluationType, OutputStatus,
};
pub use execution::{CompletionSummary, ExecutionRecord, ExecutionStatus};
pub use score::{AgentWeight, CompletionStats, Importance, PillarBreakdown, ScoreUpdate};
pub use status::{AgentProgress, EvaluationStatusView, OverallStatus, QueueMetrics};
