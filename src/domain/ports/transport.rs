//! Transport port - how slow agents are handed to the queue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::AgentInput;

/// Request to run one slow agent in the background.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub evaluation_id: String,
    pub execution_id: Uuid,
    pub agent_name: String,
    pub input: AgentInput,
}

/// Why one transport did not take a dispatch request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The transport answered and refused.
    #[error("Transport {transport} rejected dispatch: {reason}")]
    Rejected { transport: String, reason: String },

    /// The transport could not be reached.
    #[error("Transport {transport} unreachable: {reason}")]
    Unreachable { transport: String, reason: String },
}

/// One way of delivering a dispatch request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short identifier used in logs and delivery reports.
    fn name(&self) -> &str;

    /// Hand the request over. `Ok` means the receiver owns it now.
    async fn deliver(&self, request: &DispatchRequest) -> Result<(), TransportError>;
}
