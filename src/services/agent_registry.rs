//! Agent registry and catalog.
//!
//! `AgentRegistry` is the static scheduling table (priority, timeout ladder,
//! fallback policy, dependencies). `AgentCatalog` maps the same names to the
//! `Agent` implementations that actually run, populated at process start.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::domain::models::agent::names;
use crate::domain::models::{AgentInput, AgentPriority, FallbackPolicy, TimeoutStrategy};
use crate::domain::ports::Agent;

/// Scheduling configuration of one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSpec {
    pub name: String,
    pub priority: AgentPriority,
    pub timeout_strategy: TimeoutStrategy,
    pub fallback_policy: FallbackPolicy,
    pub estimated_duration_ms: u64,
    pub dependencies: Vec<String>,
    /// Config keys merged into the input on retries when minimal mode is on
    pub minimal_overrides: Map<String, Value>,
}

impl AgentSpec {
    /// One attempt, no fallback, no dependencies.
    pub fn single_attempt(name: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            name: name.into(),
            priority: AgentPriority::Optional,
            timeout_strategy: TimeoutStrategy {
                initial_ms: timeout_ms,
                progressive_ms: Vec::new(),
                max_total_ms: timeout_ms,
                circuit_breaker_ms: timeout_ms,
            },
            fallback_policy: FallbackPolicy::default(),
            estimated_duration_ms: timeout_ms,
            dependencies: Vec::new(),
            minimal_overrides: Map::new(),
        }
    }

    /// Attempts allowed by the timeout ladder.
    pub fn max_attempts(&self) -> u32 {
        self.timeout_strategy.max_attempts()
    }

    /// Input for an attempt; attempts after the first run in minimal mode
    /// when the fallback policy allows it.
    pub fn input_for_attempt(&self, input: AgentInput, attempt: u32) -> AgentInput {
        if attempt > 1 && self.fallback_policy.minimal_mode && !self.minimal_overrides.is_empty() {
            input.merged_config(&self.minimal_overrides)
        } else {
            input
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: AgentPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Agents that must settle before this one may start.
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| (*d).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_timeout_strategy(mut self, timeout_strategy: TimeoutStrategy) -> Self {
        self.estimated_duration_ms = timeout_strategy.initial_ms;
        self.timeout_strategy = timeout_strategy;
        self
    }

    #[must_use]
    pub const fn with_fallback_policy(mut self, fallback_policy: FallbackPolicy) -> Self {
        self.fallback_policy = fallback_policy;
        self
    }
}

/// Static table of every schedulable agent.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    specs: HashMap<String, AgentSpec>,
    order: Vec<String>,
}

/// Fast agents run in-process with a single short attempt.
const FAST_AGENT_TIMEOUT_MS: u64 = 2_000;

impl AgentRegistry {
    /// Empty registry, filled with `with_spec`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Production table for all twelve agents.
    pub fn standard() -> Self {
        let degrade = FallbackPolicy {
            enabled: true,
            minimal_mode: true,
            graceful_degradation: true,
            skip_if_failed: false,
        };
        let degrade_or_skip = FallbackPolicy {
            skip_if_failed: true,
            ..degrade
        };

        let mut registry = Self::new()
            .with_spec(slow_spec(
                names::CRAWL,
                AgentPriority::Critical,
                ladder(180_000, &[300_000, 600_000, 900_000], 900_000),
                degrade,
                &[],
                overrides(json!({
                    "skipSitemapProcessing": true,
                    "maxUrlsToCrawl": 1,
                    "timeout": 30_000
                })),
            ))
            .with_spec(slow_spec(
                names::LLM_TEST,
                AgentPriority::High,
                ladder(120_000, &[180_000, 300_000], 300_000),
                degrade,
                &[names::CRAWL],
                overrides(json!({ "maxQueries": 2, "maxModels": 1, "timeout": 60_000 })),
            ))
            .with_spec(slow_spec(
                names::SENTIMENT,
                AgentPriority::Medium,
                ladder(90_000, &[120_000, 180_000], 180_000),
                degrade_or_skip,
                &[names::CRAWL],
                overrides(json!({ "fastMode": true, "maxSamples": 5 })),
            ))
            .with_spec(slow_spec(
                names::GEO_VISIBILITY,
                AgentPriority::High,
                ladder(120_000, &[180_000, 240_000], 240_000),
                degrade,
                &[names::CRAWL],
                Map::new(),
            ))
            .with_spec(slow_spec(
                names::COMMERCE,
                AgentPriority::Medium,
                ladder(90_000, &[120_000, 180_000], 180_000),
                degrade_or_skip,
                &[names::CRAWL],
                Map::new(),
            ))
            .with_spec(slow_spec(
                names::CITATION,
                AgentPriority::Low,
                ladder(60_000, &[90_000, 120_000], 120_000),
                degrade_or_skip,
                &[names::CRAWL],
                Map::new(),
            ));

        for name in [
            names::SCHEMA,
            names::SEMANTIC,
            names::KNOWLEDGE_GRAPH,
            names::CONVERSATIONAL_COPY,
            names::BRAND_HERITAGE,
            names::SCORE_AGGREGATOR,
        ] {
            registry = registry.with_spec(AgentSpec::single_attempt(name, FAST_AGENT_TIMEOUT_MS));
        }

        registry
    }

    /// Insert or replace a spec.
    #[must_use]
    pub fn with_spec(mut self, spec: AgentSpec) -> Self {
        if !self.specs.contains_key(&spec.name) {
            self.order.push(spec.name.clone());
        }
        self.specs.insert(spec.name.clone(), spec);
        self
    }

    /// Spec of an agent, if registered.
    pub fn get(&self, agent_name: &str) -> Option<&AgentSpec> {
        self.specs.get(agent_name)
    }

    pub fn contains(&self, agent_name: &str) -> bool {
        self.specs.contains_key(agent_name)
    }

    /// Specs in registration order.
    pub fn specs(&self) -> impl Iterator<Item = &AgentSpec> {
        self.order.iter().filter_map(|name| self.specs.get(name))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn ladder(initial_ms: u64, progressive_ms: &[u64], ceiling_ms: u64) -> TimeoutStrategy {
    TimeoutStrategy {
        initial_ms,
        progressive_ms: progressive_ms.to_vec(),
        max_total_ms: ceiling_ms,
        circuit_breaker_ms: ceiling_ms,
    }
}

fn overrides(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn slow_spec(
    name: &str,
    priority: AgentPriority,
    timeout_strategy: TimeoutStrategy,
    fallback_policy: FallbackPolicy,
    dependencies: &[&str],
    minimal_overrides: Map<String, Value>,
) -> AgentSpec {
    AgentSpec {
        name: name.to_string(),
        priority,
        estimated_duration_ms: timeout_strategy.initial_ms,
        timeout_strategy,
        fallback_policy,
        dependencies: dependencies.iter().map(|d| (*d).to_string()).collect(),
        minimal_overrides,
    }
}

/// Runnable agents keyed by name.
#[derive(Clone, Default)]
pub struct AgentCatalog {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under its own name, replacing any previous one.
    #[must_use]
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    /// Add or replace an implementation.
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    pub fn get(&self, agent_name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(agent_name).cloned()
    }

    /// Registered agent names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for AgentCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCatalog").field("agents", &self.names()).finish()
    }
}
