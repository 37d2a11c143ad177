//! `brandscore status`

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::transports::TransportChain;
use crate::cli::output::{output, styled_status, CommandOutput};
use crate::domain::models::{Config, EvaluationStatusView, ScoreUpdate};
use crate::services::{AgentCatalog, Orchestrator, OrchestrationProfile};

use super::open_tracker;

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    #[serde(flatten)]
    pub status: EvaluationStatusView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreUpdate>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let s = &self.status;
        let mut lines = vec![
            format!("Evaluation: {}", s.evaluation_id),
            format!("Status:     {}", styled_status(s.overall_status.as_str())),
            format!(
                "Agents:     {}/{} done, {} running, {} failed",
                s.completed_agents, s.total_agents, s.running_agents, s.failed_agents
            ),
            format!("Progress:   {:.0}%", s.progress_percent),
        ];
        if s.estimated_time_remaining_ms > 0 {
            lines.push(format!("Remaining:  ~{}s", s.estimated_time_remaining_ms.div_ceil(1_000)));
        }
        if let Some(score) = &self.score {
            lines.push(format!(
                "Score:      {} (confidence {:.2}, {}, estimated final {})",
                score.current_score, score.confidence, score.data_completeness, score.estimated_final_score
            ));
        }
        lines.join("\n")
    }
}

pub async fn execute(evaluation_id: String, config: &Config, json: bool) -> Result<()> {
    let tracker = open_tracker(config).await?;
    let orchestrator = Orchestrator::new(
        OrchestrationProfile::from_config(&config.orchestration),
        AgentCatalog::new(),
        tracker.clone(),
        TransportChain::new(),
    );

    let status = orchestrator
        .status(&evaluation_id)
        .await
        .with_context(|| format!("Failed to read status of {evaluation_id}"))?;
    if status.total_agents == 0 {
        anyhow::bail!("No executions recorded for evaluation {evaluation_id}");
    }

    // Rebuild the score from completed outputs.
    let scores = orchestrator.scores();
    for result in tracker.get_completed_results(&evaluation_id).await?.values() {
        scores.record(&evaluation_id, result).await;
    }

    output(
        &StatusOutput {
            status,
            score: scores.snapshot(&evaluation_id).await,
        },
        json,
    );
    Ok(())
}
