//! Agent port - the single contract every analysis agent implements.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{AgentInput, AgentOutput};

/// Failure reported by an agent run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("Agent execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Agent returned invalid output: {0}")]
    InvalidOutput(String),

    #[error("Agent unavailable: {0}")]
    Unavailable(String),
}

/// An opaque analysis unit with bounded but variable latency.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Registry name, e.g. `crawl_agent`.
    fn name(&self) -> &str;

    /// Run the analysis for one evaluation.
    async fn execute(&self, input: AgentInput) -> Result<AgentOutput, AgentError>;
}
