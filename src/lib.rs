//! Brandscore - agent orchestration and progressive brand scoring
//!
//! Runs a fixed set of analysis agents for a brand evaluation: cheap agents
//! synchronously under a wall-clock budget, expensive ones through a
//! dependency-aware queue with progressive timeouts, retries, circuit
//! breakers and graceful degradation. Every run is recorded durably and
//! folded into a weighted score as results arrive.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the ports services depend on
//! - **Service Layer** (`services`): queue manager, execution tracker, score calculator, orchestrator
//! - **Adapters** (`adapters`): SQLite and in-memory persistence, delivery transports, simulated agents
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use brandscore::adapters::agents::simulated_catalog;
//! use brandscore::domain::models::{names, EvaluationContext};
//! use brandscore::services::{ExecutionTracker, OrchestrationProfile, Orchestrator, QueueManager};
//!
//! let queue = QueueManager::builder(tracker.clone(), catalog.clone()).build();
//! let orchestrator = Orchestrator::new(OrchestrationProfile::hybrid(), catalog, tracker, transports)
//!     .with_queue(queue);
//! let run = orchestrator.run_evaluation(EvaluationContext::new("eval-1", "brand", "https://example.com")).await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    AgentInput, AgentOutput, AgentPriority, AgentResult, Config, EvaluationContext, EvaluationStatusView,
    ExecutionRecord, ExecutionStatus, OverallStatus, QueueMetrics, ScoreUpdate, TaskStatus,
};
pub use domain::ports::{Agent, AgentError, ExecutionRepository, Transport};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ExecutionTracker, Orchestrator, OrchestrationProfile, ProgressiveScoreCalculator, QueueError, QueueManager,
};
