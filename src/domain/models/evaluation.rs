//! Evaluation context and the input/output contract every agent speaks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::errors::{DomainError, DomainResult};

/// Kind of evaluation being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationType {
    Standard,
    AdiPremium,
    Benchmark,
}

impl Default for EvaluationType {
    fn default() -> Self {
        Self::Standard
    }
}

impl EvaluationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::AdiPremium => "adi_premium",
            Self::Benchmark => "benchmark",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "adi_premium" | "premium" => Some(Self::AdiPremium),
            "benchmark" => Some(Self::Benchmark),
            _ => None,
        }
    }
}

/// Immutable identifiers threaded through every agent call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationContext {
    pub evaluation_id: String,
    pub brand_id: String,
    pub website_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_id: Option<String>,
    #[serde(default)]
    pub evaluation_type: EvaluationType,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl EvaluationContext {
    pub fn new(
        evaluation_id: impl Into<String>,
        brand_id: impl Into<String>,
        website_url: impl Into<String>,
    ) -> Self {
        Self {
            evaluation_id: evaluation_id.into(),
            brand_id: brand_id.into(),
            website_url: website_url.into(),
            industry_id: None,
            evaluation_type: EvaluationType::Standard,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_industry(mut self, industry_id: impl Into<String>) -> Self {
        self.industry_id = Some(industry_id.into());
        self
    }

    #[must_use]
    pub const fn with_evaluation_type(mut self, evaluation_type: EvaluationType) -> Self {
        self.evaluation_type = evaluation_type;
        self
    }
}

/// Input handed to `Agent::execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInput {
    pub context: EvaluationContext,
    #[serde(default)]
    pub previous_results: HashMap<String, AgentOutput>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl AgentInput {
    pub fn new(context: EvaluationContext) -> Self {
        Self {
            context,
            previous_results: HashMap::new(),
            config: Map::new(),
        }
    }

    #[must_use]
    pub fn with_previous_results(mut self, previous_results: HashMap<String, AgentOutput>) -> Self {
        self.previous_results = previous_results;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    /// Shallow-merge `overrides` into the agent config, overrides winning.
    #[must_use]
    pub fn merged_config(mut self, overrides: &Map<String, Value>) -> Self {
        for (key, value) in overrides {
            self.config.insert(key.clone(), value.clone());
        }
        self
    }
}

/// Status an agent reports for its own run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// A single scored finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub result_type: String,
    pub raw_value: f64,
    pub normalized_score: f64,
    pub confidence_level: f64,
    #[serde(default)]
    pub evidence: Value,
}

impl AgentResult {
    pub fn new(result_type: impl Into<String>, normalized_score: f64, confidence_level: f64) -> Self {
        Self {
            result_type: result_type.into(),
            raw_value: normalized_score,
            normalized_score,
            confidence_level,
            evidence: Value::Object(Map::new()),
        }
    }

    #[must_use]
    pub fn with_evidence(mut self, evidence: Value) -> Self {
        self.evidence = evidence;
        self
    }
}

/// What an agent returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOutput {
    pub agent_name: String,
    pub status: OutputStatus,
    #[serde(default)]
    pub results: Vec<AgentResult>,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AgentOutput {
    pub fn completed(agent_name: impl Into<String>, results: Vec<AgentResult>, execution_time_ms: u64) -> Self {
        Self {
            agent_name: agent_name.into(),
            status: OutputStatus::Completed,
            results,
            execution_time_ms,
            error_message: None,
            metadata: Map::new(),
        }
    }

    pub fn failed(agent_name: impl Into<String>, error: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            agent_name: agent_name.into(),
            status: OutputStatus::Failed,
            results: Vec::new(),
            execution_time_ms,
            error_message: Some(error.into()),
            metadata: Map::new(),
        }
    }

    /// Mean normalized score across results, `None` when there are none.
    pub fn score(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        let total: f64 = self.results.iter().map(|r| r.normalized_score).sum();
        Some(total / self.results.len() as f64)
    }

    pub fn is_fallback(&self) -> bool {
        self.metadata
            .get("fallback")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Rejects outputs whose scores or confidences are out of range.
    pub fn validate(&self) -> DomainResult<()> {
        for result in &self.results {
            if !(0.0..=100.0).contains(&result.normalized_score) {
                return Err(DomainError::ValidationFailed(format!(
                    "{}: normalized score {} outside 0-100 for {}",
                    self.agent_name, result.normalized_score, result.result_type
                )));
            }
            if !(0.0..=1.0).contains(&result.confidence_level) {
                return Err(DomainError::ValidationFailed(format!(
                    "{}: confidence {} outside 0-1 for {}",
                    self.agent_name, result.confidence_level, result.result_type
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> EvaluationContext {
        EvaluationContext::new("eval-1", "brand-1", "https://example.com")
    }

    #[test]
    fn test_output_score_is_mean_of_results() {
        let output = AgentOutput::completed(
            "schema_agent",
            vec![AgentResult::new("markup", 80.0, 0.9), AgentResult::new("coverage", 60.0, 0.8)],
            120,
        );
        assert_eq!(output.score(), Some(70.0));
        assert_eq!(AgentOutput::failed("schema_agent", "boom", 5).score(), None);
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let too_high = AgentOutput::completed("crawl_agent", vec![AgentResult::new("pages", 120.0, 0.5)], 1);
        assert!(too_high.validate().is_err());

        let bad_confidence = AgentOutput::completed("crawl_agent", vec![AgentResult::new("pages", 50.0, 1.5)], 1);
        assert!(bad_confidence.validate().is_err());

        let ok = AgentOutput::completed("crawl_agent", vec![AgentResult::new("pages", 50.0, 0.5)], 1);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_merged_config_overrides_existing_keys() {
        let mut base = Map::new();
        base.insert("maxQueries".to_string(), json!(10));
        base.insert("region".to_string(), json!("eu"));
        let mut overrides = Map::new();
        overrides.insert("maxQueries".to_string(), json!(2));

        let input = AgentInput::new(context()).with_config(base).merged_config(&overrides);
        assert_eq!(input.config["maxQueries"], json!(2));
        assert_eq!(input.config["region"], json!("eu"));
    }

    #[test]
    fn test_context_serializes_camel_case() {
        let ctx = context().with_evaluation_type(EvaluationType::AdiPremium);
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["evaluationId"], json!("eval-1"));
        assert_eq!(value["evaluationType"], json!("adi_premium"));
        assert!(value.get("industryId").is_none());
    }
}
