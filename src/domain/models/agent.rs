//! Agent identity: names, scheduling priority and score pillars.

use serde::{Deserialize, Serialize};

/// Canonical agent names.
pub mod names {
    pub const CRAWL: &str = "crawl_agent";
    pub const SCHEMA: &str = "schema_agent";
    pub const SEMANTIC: &str = "semantic_agent";
    pub const KNOWLEDGE_GRAPH: &str = "knowledge_graph_agent";
    pub const CONVERSATIONAL_COPY: &str = "conversational_copy_agent";
    pub const LLM_TEST: &str = "llm_test_agent";
    pub const CITATION: &str = "citation_agent";
    pub const SENTIMENT: &str = "sentiment_agent";
    pub const GEO_VISIBILITY: &str = "geo_visibility_agent";
    pub const COMMERCE: &str = "commerce_agent";
    pub const BRAND_HERITAGE: &str = "brand_heritage_agent";
    pub const SCORE_AGGREGATOR: &str = "score_aggregator";

    /// Every known agent, in registry order.
    pub const ALL: [&str; 12] = [
        CRAWL,
        SCHEMA,
        SEMANTIC,
        KNOWLEDGE_GRAPH,
        CONVERSATIONAL_COPY,
        LLM_TEST,
        CITATION,
        SENTIMENT,
        GEO_VISIBILITY,
        COMMERCE,
        BRAND_HERITAGE,
        SCORE_AGGREGATOR,
    ];

    /// Agents whose permanent failure fails the whole evaluation.
    pub const CRITICAL: [&str; 2] = [CRAWL, LLM_TEST];

    /// Returns true for agents on the critical path.
    pub fn is_critical(agent_name: &str) -> bool {
        CRITICAL.contains(&agent_name)
    }
}

/// Scheduling priority. Lower numeric value is admitted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPriority {
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
    Optional = 5,
}

impl Default for AgentPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl AgentPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Optional => "optional",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "optional" => Some(Self::Optional),
            _ => None,
        }
    }

    pub const fn value(self) -> u8 {
        self as u8
    }
}

/// Score grouping an agent contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Infrastructure,
    Perception,
    Commerce,
}

impl Pillar {
    pub const ALL: [Self; 3] = [Self::Infrastructure, Self::Perception, Self::Commerce];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::Perception => "perception",
            Self::Commerce => "commerce",
        }
    }

    /// Stable slot used by per-pillar accumulators.
    pub const fn index(self) -> usize {
        match self {
            Self::Infrastructure => 0,
            Self::Perception => 1,
            Self::Commerce => 2,
        }
    }
}
