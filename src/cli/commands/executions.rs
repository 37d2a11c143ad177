//! `brandscore executions`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{new_table, output, styled_status, truncate, CommandOutput};
use crate::domain::models::{AgentOutput, Config, ExecutionRecord};

use super::open_tracker;

#[derive(Debug, Serialize)]
pub struct ExecutionRow {
    pub id: String,
    pub agent_name: String,
    pub status: String,
    pub score: Option<f64>,
    pub execution_time_ms: Option<u64>,
    pub error: Option<String>,
    pub fallback: bool,
}

impl From<&ExecutionRecord> for ExecutionRow {
    fn from(record: &ExecutionRecord) -> Self {
        Self {
            id: record.id.to_string(),
            agent_name: record.agent_name.clone(),
            status: record.status.as_str().to_string(),
            score: record.result.as_ref().and_then(AgentOutput::score),
            execution_time_ms: record.execution_time_ms,
            error: record.error.clone(),
            fallback: record.result.as_ref().is_some_and(AgentOutput::is_fallback),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExecutionListOutput {
    pub evaluation_id: String,
    pub executions: Vec<ExecutionRow>,
    pub total: usize,
}

impl CommandOutput for ExecutionListOutput {
    fn to_human(&self) -> String {
        if self.executions.is_empty() {
            return format!("No executions found for {}.", self.evaluation_id);
        }

        let mut table = new_table(&["ID", "Agent", "Status", "Score", "Time (ms)", "Error"]);
        for row in &self.executions {
            let status = if row.fallback {
                format!("{} (fallback)", styled_status(&row.status))
            } else {
                styled_status(&row.status).to_string()
            };
            table.add_row(vec![
                row.id[..8].to_string(),
                row.agent_name.clone(),
                status,
                row.score.map_or_else(|| "-".to_string(), |s| format!("{s:.1}")),
                row.execution_time_ms.map_or_else(|| "-".to_string(), |t| t.to_string()),
                row.error.as_deref().map_or_else(|| "-".to_string(), |e| truncate(e, 48)),
            ]);
        }
        format!("Found {} execution(s):\n{table}", self.total)
    }
}

pub async fn execute(evaluation_id: String, config: &Config, json: bool) -> Result<()> {
    let tracker = open_tracker(config).await?;
    let records = tracker.get_evaluation_executions(&evaluation_id).await?;

    let executions: Vec<ExecutionRow> = records.iter().map(ExecutionRow::from).collect();
    output(
        &ExecutionListOutput {
            total: executions.len(),
            evaluation_id,
            executions,
        },
        json,
    );
    Ok(())
}
