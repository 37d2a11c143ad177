//! Per-evaluation score calculators shared by the fast phase and the queue.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::score_calculator::{ProgressiveScoreCalculator, ScoreWeights};
use crate::domain::models::{AgentOutput, ScoreUpdate};

/// Per-evaluation score calculators. Clones share the same board.
#[derive(Clone, Default)]
pub struct ScoreBoard {
    weights: ScoreWeights,
    calculators: Arc<Mutex<HashMap<String, ProgressiveScoreCalculator>>>,
}

impl ScoreBoard {
    /// Standard weights.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self {
            weights,
            calculators: Arc::default(),
        }
    }

    /// Feed an output's score into its evaluation. Outputs without results
    /// contribute nothing and return `None`.
    pub async fn record(&self, evaluation_id: &str, output: &AgentOutput) -> Option<ScoreUpdate> {
        let score = output.score()?;
        let mut calculators = self.calculators.lock().await;
        let calculator = calculators
            .entry(evaluation_id.to_string())
            .or_insert_with(|| ProgressiveScoreCalculator::with_weights(self.weights.clone()));
        Some(calculator.update_score(&output.agent_name, score))
    }

    /// Current score of an evaluation, if anything has been recorded.
    pub async fn snapshot(&self, evaluation_id: &str) -> Option<ScoreUpdate> {
        self.calculators
            .lock()
            .await
            .get(evaluation_id)
            .map(ProgressiveScoreCalculator::current)
    }

    /// Drop the calculator of a finished evaluation.
    pub async fn remove(&self, evaluation_id: &str) -> Option<ScoreUpdate> {
        self.calculators
            .lock()
            .await
            .remove(evaluation_id)
            .map(|c| c.current())
    }
}
