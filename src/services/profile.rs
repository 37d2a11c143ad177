//! Orchestration profiles: which agents run synchronously and how long they get.

use std::collections::HashMap;
use std::time::Duration;

use crate::domain::models::agent::names;
use crate::domain::models::{OrchestrationConfig, ProfileKind};

/// Fast/slow split plus fast-phase time limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationProfile {
    pub kind: ProfileKind,
    /// Run concurrently under the phase budget
    pub fast_agents: Vec<String>,
    /// Handed to the queue through the transport chain
    pub slow_agents: Vec<String>,
    pub fast_budget: Duration,
    pub fast_timeouts: HashMap<String, u64>,
    pub default_fast_timeout_ms: u64,
}

const FAST_BUDGET_MS: u64 = 8_000;
const DEFAULT_FAST_TIMEOUT_MS: u64 = 2_000;

impl OrchestrationProfile {
    /// Static analysis in-process, network-heavy agents queued.
    pub fn hybrid() -> Self {
        Self {
            kind: ProfileKind::Hybrid,
            fast_agents: to_strings(&[
                names::SCHEMA,
                names::SEMANTIC,
                names::CONVERSATIONAL_COPY,
                names::KNOWLEDGE_GRAPH,
                names::BRAND_HERITAGE,
                names::SCORE_AGGREGATOR,
            ]),
            slow_agents: to_strings(&[
                names::CRAWL,
                names::LLM_TEST,
                names::SENTIMENT,
                names::CITATION,
                names::GEO_VISIBILITY,
                names::COMMERCE,
            ]),
            fast_budget: Duration::from_millis(FAST_BUDGET_MS),
            fast_timeouts: HashMap::new(),
            default_fast_timeout_ms: DEFAULT_FAST_TIMEOUT_MS,
        }
    }

    /// Every agent in-process with a tight timeout table.
    pub fn performance() -> Self {
        let fast_timeouts = [
            (names::CRAWL, 4_000),
            (names::SCHEMA, 1_500),
            (names::SEMANTIC, 2_000),
            (names::KNOWLEDGE_GRAPH, 2_000),
            (names::CONVERSATIONAL_COPY, 1_500),
            (names::LLM_TEST, 3_000),
            (names::GEO_VISIBILITY, 2_000),
            (names::CITATION, 2_000),
            (names::SENTIMENT, 1_500),
            (names::COMMERCE, 2_000),
            (names::BRAND_HERITAGE, 1_500),
            (names::SCORE_AGGREGATOR, 1_000),
        ]
        .into_iter()
        .map(|(name, ms)| (name.to_string(), ms))
        .collect();

        Self {
            kind: ProfileKind::Performance,
            fast_agents: to_strings(&names::ALL),
            slow_agents: Vec::new(),
            fast_budget: Duration::from_millis(FAST_BUDGET_MS),
            fast_timeouts,
            default_fast_timeout_ms: DEFAULT_FAST_TIMEOUT_MS,
        }
    }

    /// Preset selected by config, with the configured budget and default timeout.
    pub fn from_config(config: &OrchestrationConfig) -> Self {
        let preset = match config.profile {
            ProfileKind::Hybrid => Self::hybrid(),
            ProfileKind::Performance => Self::performance(),
        };
        Self {
            fast_budget: Duration::from_millis(config.fast_budget_ms),
            default_fast_timeout_ms: config.default_fast_timeout_ms,
            ..preset
        }
    }

    #[must_use]
    pub fn with_fast_budget(mut self, budget: Duration) -> Self {
        self.fast_budget = budget;
        self
    }

    #[must_use]
    pub fn with_fast_timeout(mut self, agent_name: &str, timeout_ms: u64) -> Self {
        self.fast_timeouts.insert(agent_name.to_string(), timeout_ms);
        self
    }

    /// Per-agent fast timeout, or the profile default.
    pub fn fast_timeout(&self, agent_name: &str) -> Duration {
        Duration::from_millis(
            self.fast_timeouts
                .get(agent_name)
                .copied()
                .unwrap_or(self.default_fast_timeout_ms),
        )
    }

    /// Fast agents, then slow agents.
    pub fn all_agents(&self) -> impl Iterator<Item = &str> {
        self.fast_agents.iter().chain(&self.slow_agents).map(String::as_str)
    }
}

impl Default for OrchestrationProfile {
    fn default() -> Self {
        Self::hybrid()
    }
}

fn to_strings(agents: &[&str]) -> Vec<String> {
    agents.iter().map(|a| (*a).to_string()).collect()
}
