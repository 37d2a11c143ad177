//! Hands dispatch requests straight to a local queue manager.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{DispatchRequest, Transport, TransportError};
use crate::services::queue_manager::{QueueError, QueueManager};

/// Delivers to a `QueueManager` in this process.
pub struct InProcessTransport {
    queue: QueueManager,
}

impl InProcessTransport {
    pub fn new(queue: QueueManager) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    fn name(&self) -> &str {
        "in_process"
    }

    async fn deliver(&self, request: &DispatchRequest) -> Result<(), TransportError> {
        self.queue
            .enqueue(
                &request.agent_name,
                request.input.clone(),
                &request.evaluation_id,
                request.execution_id,
            )
            .await
            .map_err(|e| match e {
                QueueError::QueueFull(_) => TransportError::Unreachable {
                    transport: self.name().to_string(),
                    reason: e.to_string(),
                },
                other => TransportError::Rejected {
                    transport: self.name().to_string(),
                    reason: other.to_string(),
                },
            })?;
        debug!(agent = %request.agent_name, "dispatched in process");
        Ok(())
    }
}
