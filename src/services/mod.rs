//! Services: scheduling, tracking, scoring and orchestration.

pub mod agent_registry;
pub mod execution_tracker;
pub mod fallback;
pub mod orchestrator;
pub mod profile;
pub mod queue_manager;
pub mod score_board;
pub mod score_calculator;

pub use agent_registry::{AgentCatalog, AgentRegistry, AgentSpec};
pub use execution_tracker::{ExecutionTracker, TrackerError, TrackerResult};
pub use fallback::degraded_output;
pub use orchestrator::{EvaluationRun, Orchestrator, OrchestratorError, OrchestratorResult};
pub use profile::OrchestrationProfile;
pub use queue_manager::{QueueError, QueueManager, QueueManagerBuilder, QueueResult};
pub use score_board::ScoreBoard;
pub use score_calculator::{ProgressiveScoreCalculator, ScoreWeights};
