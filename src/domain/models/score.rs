//! Score weights and snapshots produced by the progressive calculator.

use serde::{Deserialize, Serialize};

use super::agent::Pillar;

/// How much an agent matters for confidence reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Critical,
    High,
    Medium,
    Low,
}

/// Fixed contribution of one agent to the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentWeight {
    pub weight: f64,
    pub pillar: Pillar,
    pub importance: Importance,
}

/// Rounded per-pillar scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PillarBreakdown {
    pub infrastructure: u32,
    pub perception: u32,
    pub commerce: u32,
}

/// State of the composite score after an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub current_score: u32,
    pub confidence: f64,
    /// Fraction of scoring agents that have reported, 0.0-1.0
    pub completeness: f64,
    /// Human readable form, e.g. "4/11 agents"
    pub data_completeness: String,
    pub completed_agents: usize,
    pub total_agents: usize,
    pub estimated_final_score: u32,
    pub per_pillar: PillarBreakdown,
}

/// How many scoring agents have reported, overall and on the critical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub critical_completed: usize,
    pub critical_remaining: usize,
}
