//! `brandscore agents`

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{new_table, output, CommandOutput};
use crate::domain::models::{Config, TerminalAction};
use crate::services::{AgentRegistry, AgentSpec, OrchestrationProfile};

#[derive(Debug, Serialize)]
pub struct AgentRow {
    pub name: String,
    pub phase: &'static str,
    pub priority: String,
    pub timeouts_ms: Vec<u64>,
    pub circuit_breaker_ms: u64,
    pub dependencies: Vec<String>,
    pub on_failure: &'static str,
}

impl AgentRow {
    fn new(spec: &AgentSpec, profile: &OrchestrationProfile) -> Self {
        let fast = profile.fast_agents.contains(&spec.name);
        let mut timeouts_ms = vec![spec.timeout_strategy.initial_ms];
        timeouts_ms.extend(&spec.timeout_strategy.progressive_ms);
        if fast {
            timeouts_ms = vec![u64::try_from(profile.fast_timeout(&spec.name).as_millis()).unwrap_or(u64::MAX)];
        }

        let policy = spec.fallback_policy;
        let on_failure = match policy.terminal_action() {
            TerminalAction::Degrade if policy.skip_if_failed => "degrade/skip",
            TerminalAction::Degrade => "degrade",
            TerminalAction::Skip => "skip",
            TerminalAction::Fail => "fail",
        };

        Self {
            name: spec.name.clone(),
            phase: if fast { "fast" } else { "queued" },
            priority: spec.priority.as_str().to_string(),
            timeouts_ms,
            circuit_breaker_ms: spec.timeout_strategy.circuit_breaker_ms,
            dependencies: spec.dependencies.clone(),
            on_failure,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AgentListOutput {
    pub profile: String,
    pub agents: Vec<AgentRow>,
}

impl CommandOutput for AgentListOutput {
    fn to_human(&self) -> String {
        let mut table = new_table(&["Agent", "Phase", "Priority", "Timeouts (ms)", "Depends on", "On failure"]);
        for agent in &self.agents {
            table.add_row(vec![
                agent.name.clone(),
                agent.phase.to_string(),
                agent.priority.clone(),
                agent
                    .timeouts_ms
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" > "),
                if agent.dependencies.is_empty() {
                    "-".to_string()
                } else {
                    agent.dependencies.join(", ")
                },
                agent.on_failure.to_string(),
            ]);
        }
        format!("Profile: {}\n{table}", self.profile)
    }
}

pub fn execute(config: &Config, json: bool) -> Result<()> {
    let profile = OrchestrationProfile::from_config(&config.orchestration);
    let registry = AgentRegistry::standard();

    output(
        &AgentListOutput {
            profile: format!("{:?}", profile.kind).to_lowercase(),
            agents: registry.specs().map(|spec| AgentRow::new(spec, &profile)).collect(),
        },
        json,
    );
    Ok(())
}
