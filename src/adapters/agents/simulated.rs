//! Simulated agents for local runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::RwLock;

use crate::domain::models::{AgentInput, AgentOutput, AgentResult};
use crate::domain::ports::{Agent, AgentError};
use crate::services::agent_registry::AgentCatalog;

/// Behaviour of one simulated run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedResponse {
    /// Normalized score reported on success
    pub score: f64,
    pub confidence: f64,
    /// Time spent before answering
    pub latency: Duration,
    /// Fail every call
    pub fail: bool,
    /// Fail this many calls before succeeding
    pub failures_before_success: u32,
    pub error_message: Option<String>,
}

impl Default for SimulatedResponse {
    fn default() -> Self {
        Self {
            score: 70.0,
            confidence: 0.8,
            latency: Duration::from_millis(100),
            fail: false,
            failures_before_success: 0,
            error_message: None,
        }
    }
}

impl SimulatedResponse {
    pub fn success(score: f64) -> Self {
        Self {
            score,
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            fail: true,
            error_message: Some(error.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub const fn with_failures_before_success(mut self, failures: u32) -> Self {
        self.failures_before_success = failures;
        self
    }
}

/// Agent that sleeps, then answers according to a `SimulatedResponse`.
///
/// Responses can be overridden per evaluation.
pub struct SimulatedAgent {
    name: String,
    default_response: SimulatedResponse,
    response_overrides: Arc<RwLock<HashMap<String, SimulatedResponse>>>,
    calls: AtomicU32,
}

impl SimulatedAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_default_response(name, SimulatedResponse::default())
    }

    pub fn with_default_response(name: impl Into<String>, response: SimulatedResponse) -> Self {
        Self {
            name: name.into(),
            default_response: response,
            response_overrides: Arc::new(RwLock::new(HashMap::new())),
            calls: AtomicU32::new(0),
        }
    }

    /// Set a specific response for one evaluation.
    pub async fn set_response_for_evaluation(&self, evaluation_id: &str, response: SimulatedResponse) {
        let mut overrides = self.response_overrides.write().await;
        overrides.insert(evaluation_id.to_string(), response);
    }

    async fn response_for(&self, evaluation_id: &str) -> SimulatedResponse {
        let overrides = self.response_overrides.read().await;
        overrides
            .get(evaluation_id)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone())
    }

    /// Number of `execute` calls so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for SimulatedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: AgentInput) -> Result<AgentOutput, AgentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.response_for(&input.context.evaluation_id).await;

        tokio::time::sleep(response.latency).await;

        if response.fail || call < response.failures_before_success {
            return Err(AgentError::ExecutionFailed(
                response
                    .error_message
                    .unwrap_or_else(|| format!("{} simulated failure", self.name)),
            ));
        }

        let latency_ms = u64::try_from(response.latency.as_millis()).unwrap_or(u64::MAX);
        let result = AgentResult::new(format!("{}_score", self.name), response.score, response.confidence)
            .with_evidence(json!({
                "simulated": true,
                "websiteUrl": input.context.website_url,
                "minimal": !input.config.is_empty(),
            }));
        Ok(AgentOutput::completed(self.name.clone(), vec![result], latency_ms))
    }
}

/// Catalog with a default `SimulatedAgent` for every name.
pub fn simulated_catalog<'a>(names: impl IntoIterator<Item = &'a str>) -> AgentCatalog {
    names
        .into_iter()
        .fold(AgentCatalog::new(), |catalog, name| {
            catalog.with_agent(Arc::new(SimulatedAgent::new(name)))
        })
}
