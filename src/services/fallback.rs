//! Placeholder results for gracefully degraded agents.

use serde_json::{json, Map, Value};

use crate::domain::models::config::MAX_FALLBACK_CONFIDENCE;
use crate::domain::models::{AgentOutput, AgentResult, FallbackScorePolicy, OutputStatus};

/// Build the low-confidence output substituted for an agent that ran out of
/// attempts.
pub fn degraded_output(
    agent_name: &str,
    last_error: Option<&str>,
    policy: &FallbackScorePolicy,
    execution_time_ms: u64,
) -> AgentOutput {
    let reason = last_error.unwrap_or("unknown error");
    let result = AgentResult {
        result_type: format!("{agent_name}_fallback"),
        raw_value: 0.0,
        normalized_score: policy.score.clamp(0.0, 100.0),
        confidence_level: policy.confidence.clamp(0.0, MAX_FALLBACK_CONFIDENCE),
        evidence: json!({
            "fallback": true,
            "reason": reason,
            "message": "Graceful degradation applied after exhausting retries",
        }),
    };

    let mut metadata = Map::new();
    metadata.insert("fallback".to_string(), Value::Bool(true));
    metadata.insert("originalError".to_string(), Value::String(reason.to_string()));

    AgentOutput {
        agent_name: agent_name.to_string(),
        status: OutputStatus::Completed,
        results: vec![result],
        execution_time_ms,
        error_message: None,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_output() {
        let output = degraded_output("sentiment_agent", Some("timed out"), &FallbackScorePolicy::default(), 90);
        assert!(output.is_fallback());
        assert_eq!(output.results.len(), 1);

        let result = &output.results[0];
        assert_eq!(result.result_type, "sentiment_agent_fallback");
        assert!((result.normalized_score - 25.0).abs() < f64::EPSILON);
        assert!(result.confidence_level <= 0.2);
        assert_eq!(result.evidence["fallback"], json!(true));
        assert_eq!(result.evidence["reason"], json!("timed out"));
    }

    #[test]
    fn test_confidence_never_exceeds_ceiling() {
        let policy = FallbackScorePolicy { score: 40.0, confidence: 0.9 };
        let output = degraded_output("commerce_agent", None, &policy, 0);
        assert!(output.results[0].confidence_level <= MAX_FALLBACK_CONFIDENCE);
        assert_eq!(output.score(), Some(40.0));
    }
}
