//! Ordered delivery with fallthrough.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::domain::ports::{DispatchRequest, Transport, TransportError};

/// Which transport accepted a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub transport: String,
    /// Failures of the transports tried before it
    pub skipped: Vec<TransportError>,
}

/// Every transport refused or could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Delivery failed for {agent_name} after {} transport(s): {}", .attempts.len(), summarize(.attempts))]
pub struct DeliveryFailure {
    pub agent_name: String,
    pub attempts: Vec<TransportError>,
}

fn summarize(attempts: &[TransportError]) -> String {
    if attempts.is_empty() {
        return "no transports configured".to_string();
    }
    attempts.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Transports tried in order until one accepts.
#[derive(Clone, Default)]
pub struct TransportChain {
    transports: Vec<Arc<dyn Transport>>,
}

impl TransportChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    pub fn len(&self) -> usize {
        self.transports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.transports.iter().map(|t| t.name()).collect()
    }

    /// Try each transport in order until one accepts.
    pub async fn deliver(&self, request: &DispatchRequest) -> Result<DeliveryReport, DeliveryFailure> {
        let mut failures = Vec::new();

        for transport in &self.transports {
            match transport.deliver(request).await {
                Ok(()) => {
                    info!(
                        agent = %request.agent_name,
                        evaluation_id = %request.evaluation_id,
                        transport = transport.name(),
                        "slow agent dispatched"
                    );
                    return Ok(DeliveryReport {
                        transport: transport.name().to_string(),
                        skipped: failures,
                    });
                }
                Err(e) => {
                    warn!(agent = %request.agent_name, error = %e, "transport failed, trying next");
                    failures.push(e);
                }
            }
        }

        Err(DeliveryFailure {
            agent_name: request.agent_name.clone(),
            attempts: failures,
        })
    }
}

impl std::fmt::Debug for TransportChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportChain").field("transports", &self.names()).finish()
    }
}
