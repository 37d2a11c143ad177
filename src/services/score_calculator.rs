//! Progressive, confidence-weighted composite scoring.
//!
//! Scores arrive one agent at a time. The calculator keeps a running weighted
//! sum so a meaningful partial score exists long before every agent reports.
//! A second report for the same agent replaces the first contribution.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::models::agent::names;
use crate::domain::models::{
    AgentWeight, CompletionStats, Importance, Pillar, PillarBreakdown, ScoreUpdate,
};

/// Completion ratio from which the final score is extrapolated.
const EXTRAPOLATION_THRESHOLD: f64 = 0.8;
/// Below this many reports confidence is halved.
const MIN_REPORTS_FOR_FULL_CONFIDENCE: usize = 3;
const MIN_CONFIDENCE: f64 = 0.1;
const MAX_CONFIDENCE: f64 = 0.95;

/// Fixed agent weights and pillar assignments.
#[derive(Debug, Clone)]
pub struct ScoreWeights {
    weights: HashMap<String, AgentWeight>,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::standard()
    }
}

impl ScoreWeights {
    /// Infrastructure 40%, perception 40%, commerce 20%.
    pub fn standard() -> Self {
        use Importance::{Critical, High, Medium};
        use Pillar::{Commerce, Infrastructure, Perception};

        let table = [
            (names::CRAWL, 0.12, Infrastructure, Critical),
            (names::SCHEMA, 0.10, Infrastructure, High),
            (names::SEMANTIC, 0.08, Infrastructure, High),
            (names::KNOWLEDGE_GRAPH, 0.06, Infrastructure, Medium),
            (names::CONVERSATIONAL_COPY, 0.04, Infrastructure, Medium),
            (names::LLM_TEST, 0.15, Perception, Critical),
            (names::CITATION, 0.10, Perception, High),
            (names::SENTIMENT, 0.08, Perception, High),
            (names::GEO_VISIBILITY, 0.07, Perception, Medium),
            (names::COMMERCE, 0.12, Commerce, High),
            (names::BRAND_HERITAGE, 0.08, Commerce, Medium),
            // The aggregator consumes the others and contributes nothing itself.
            (names::SCORE_AGGREGATOR, 0.0, Infrastructure, Critical),
        ];

        Self::from_entries(table.into_iter().map(|(name, weight, pillar, importance)| {
            (name.to_string(), AgentWeight { weight, pillar, importance })
        }))
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, AgentWeight)>) -> Self {
        Self {
            weights: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, agent_name: &str) -> Option<&AgentWeight> {
        self.weights.get(agent_name)
    }

    /// Agents with a non-zero weight.
    pub fn scoring_agents(&self) -> impl Iterator<Item = (&str, &AgentWeight)> {
        self.weights
            .iter()
            .filter(|(_, w)| w.weight > 0.0)
            .map(|(name, w)| (name.as_str(), w))
    }

    pub fn scoring_agent_count(&self) -> usize {
        self.scoring_agents().count()
    }

    pub fn total_weight(&self) -> f64 {
        self.scoring_agents().map(|(_, w)| w.weight).sum()
    }

    /// Sum of the weights in one pillar.
    pub fn pillar_total(&self, pillar: Pillar) -> f64 {
        self.scoring_agents()
            .filter(|(_, w)| w.pillar == pillar)
            .map(|(_, w)| w.weight)
            .sum()
    }
}

/// Running composite score for one evaluation.
#[derive(Debug, Clone)]
pub struct ProgressiveScoreCalculator {
    weights: ScoreWeights,
    contributions: HashMap<String, f64>,
    running_score_sum: f64,
    completed_weight: f64,
    per_pillar_sum: [f64; 3],
    per_pillar_count: [usize; 3],
}

impl Default for ProgressiveScoreCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressiveScoreCalculator {
    pub fn new() -> Self {
        Self::with_weights(ScoreWeights::standard())
    }

    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self {
            weights,
            contributions: HashMap::new(),
            running_score_sum: 0.0,
            completed_weight: 0.0,
            per_pillar_sum: [0.0; 3],
            per_pillar_count: [0; 3],
        }
    }

    /// Record `raw_score` (clamped to 0-100) for `agent_name`.
    ///
    /// Unknown and zero-weight agents leave the score untouched. Reporting the
    /// same agent twice replaces its earlier contribution.
    pub fn update_score(&mut self, agent_name: &str, raw_score: f64) -> ScoreUpdate {
        let Some(config) = self.weights.get(agent_name).copied() else {
            warn!(agent_name, "score reported for unknown agent, ignoring");
            return self.current();
        };
        if config.weight <= 0.0 {
            return self.current();
        }

        let score = if raw_score.is_nan() { 0.0 } else { raw_score.clamp(0.0, 100.0) };
        let pillar_total = self.weights.pillar_total(config.pillar);
        let slot = config.pillar.index();

        if let Some(previous) = self.contributions.insert(agent_name.to_string(), score) {
            debug!(agent_name, previous, score, "replacing earlier score report");
            self.running_score_sum -= previous * config.weight;
            self.per_pillar_sum[slot] -= previous * config.weight / pillar_total;
        } else {
            self.completed_weight += config.weight;
            self.per_pillar_count[slot] += 1;
        }

        self.running_score_sum += score * config.weight;
        self.per_pillar_sum[slot] += score * config.weight / pillar_total;

        let update = self.current();
        debug!(
            agent_name,
            score,
            current = update.current_score,
            confidence = update.confidence,
            "progressive score updated"
        );
        update
    }

    /// Snapshot without recording anything.
    pub fn current(&self) -> ScoreUpdate {
        let total_agents = self.weights.scoring_agent_count();
        let completed_agents = self.contributions.len();

        ScoreUpdate {
            current_score: round_score(self.running_score_sum),
            confidence: self.confidence(),
            completeness: self.completion_ratio(),
            data_completeness: format!("{completed_agents}/{total_agents} agents"),
            completed_agents,
            total_agents,
            estimated_final_score: self.estimate_final_score(),
            per_pillar: PillarBreakdown {
                infrastructure: round_score(self.per_pillar_sum[Pillar::Infrastructure.index()]),
                perception: round_score(self.per_pillar_sum[Pillar::Perception.index()]),
                commerce: round_score(self.per_pillar_sum[Pillar::Commerce.index()]),
            },
        }
    }

    pub fn confidence(&self) -> f64 {
        let critical_ratio = names::CRITICAL
            .iter()
            .filter(|agent| self.contributions.contains_key(**agent))
            .count() as f64
            / names::CRITICAL.len() as f64;

        let mut confidence = 0.7f64.mul_add(self.completion_ratio(), 0.3 * critical_ratio);
        if self.contributions.len() < MIN_REPORTS_FOR_FULL_CONFIDENCE {
            confidence *= 0.5;
        }
        confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }

    /// Projected final score.
    ///
    /// From 80% completion the missing weight is filled with the average
    /// per-weight score seen so far; below that the partial sum is returned.
    pub fn estimate_final_score(&self) -> u32 {
        if self.completion_ratio() < EXTRAPOLATION_THRESHOLD || self.completed_weight <= 0.0 {
            return round_score(self.running_score_sum);
        }
        let average = self.running_score_sum / self.completed_weight;
        let missing_weight = (self.weights.total_weight() - self.completed_weight).max(0.0);
        round_score(average.mul_add(missing_weight, self.running_score_sum))
    }

    /// Share of scoring agents that have reported.
    pub fn completion_ratio(&self) -> f64 {
        let total = self.weights.scoring_agent_count();
        if total == 0 {
            return 0.0;
        }
        self.contributions.len() as f64 / total as f64
    }

    pub fn has_reported(&self, agent_name: &str) -> bool {
        self.contributions.contains_key(agent_name)
    }

    /// Reports received per pillar.
    pub const fn pillar_report_count(&self, pillar: Pillar) -> usize {
        self.per_pillar_count[pillar.index()]
    }

    pub fn agent_weight(&self, agent_name: &str) -> Option<AgentWeight> {
        self.weights.get(agent_name).copied()
    }

    pub fn completion_stats(&self) -> CompletionStats {
        let total = self.weights.scoring_agent_count();
        let completed = self.contributions.len();
        let critical: Vec<&str> = self
            .weights
            .scoring_agents()
            .filter(|(_, w)| w.importance == Importance::Critical)
            .map(|(name, _)| name)
            .collect();
        let critical_completed = critical.iter().filter(|a| self.has_reported(a)).count();

        CompletionStats {
            total,
            completed,
            remaining: total.saturating_sub(completed),
            critical_completed,
            critical_remaining: critical.len() - critical_completed,
        }
    }

    /// Forget every report, keeping the weights.
    pub fn reset(&mut self) {
        self.contributions.clear();
        self.running_score_sum = 0.0;
        self.completed_weight = 0.0;
        self.per_pillar_sum = [0.0; 3];
        self.per_pillar_count = [0; 3];
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_score(value: f64) -> u32 {
    value.round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let weights = ScoreWeights::standard();
        assert!((weights.total_weight() - 1.0).abs() < 1e-6);
        assert_eq!(weights.scoring_agent_count(), 11);
        assert!((weights.pillar_total(Pillar::Infrastructure) - 0.40).abs() < 1e-9);
        assert!((weights.pillar_total(Pillar::Perception) - 0.40).abs() < 1e-9);
        assert!((weights.pillar_total(Pillar::Commerce) - 0.20).abs() < 1e-9);
    }

    #[test]
    fn test_two_updates_produce_weighted_sum() {
        let mut calc = ProgressiveScoreCalculator::new();
        calc.update_score(names::CRAWL, 80.0);
        let update = calc.update_score(names::SCHEMA, 60.0);
        assert_eq!(update.current_score, (80.0f64 * 0.12 + 60.0 * 0.10).round() as u32);
        assert_eq!(update.current_score, 16);
        assert_eq!(update.completed_agents, 2);
        assert_eq!(update.data_completeness, "2/11 agents");
    }

    #[test]
    fn test_duplicate_report_replaces_contribution() {
        let mut calc = ProgressiveScoreCalculator::new();
        calc.update_score(names::CRAWL, 80.0);
        let update = calc.update_score(names::CRAWL, 40.0);
        assert_eq!(update.completed_agents, 1);
        assert_eq!(update.current_score, (40.0f64 * 0.12).round() as u32);
        assert_eq!(calc.pillar_report_count(Pillar::Infrastructure), 1);
    }

    #[test]
    fn test_raw_score_is_clamped() {
        let mut calc = ProgressiveScoreCalculator::new();
        let update = calc.update_score(names::LLM_TEST, 250.0);
        assert_eq!(update.current_score, 15);
        let update = calc.update_score(names::CITATION, -10.0);
        assert_eq!(update.current_score, 15);
    }

    #[test]
    fn test_unknown_and_aggregator_are_ignored() {
        let mut calc = ProgressiveScoreCalculator::new();
        calc.update_score("mystery_agent", 90.0);
        calc.update_score(names::SCORE_AGGREGATOR, 90.0);
        let update = calc.current();
        assert_eq!(update.completed_agents, 0);
        assert_eq!(update.current_score, 0);
    }

    #[test]
    fn test_confidence_is_halved_below_three_reports() {
        let mut calc = ProgressiveScoreCalculator::new();
        calc.update_score(names::CRAWL, 70.0);
        calc.update_score(names::LLM_TEST, 70.0);
        // 0.5 * (0.7 * 2/11 + 0.3 * 1.0)
        let expected = 0.5 * (0.7 * 2.0 / 11.0 + 0.3);
        assert!((calc.confidence() - expected).abs() < 1e-9);

        calc.update_score(names::SCHEMA, 70.0);
        let expected = 0.7 * 3.0 / 11.0 + 0.3;
        assert!((calc.confidence() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_bounds() {
        let calc = ProgressiveScoreCalculator::new();
        assert!((calc.confidence() - 0.1).abs() < f64::EPSILON);

        let mut full = ProgressiveScoreCalculator::new();
        for name in names::ALL {
            full.update_score(name, 100.0);
        }
        assert!((full.confidence() - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_estimate_below_threshold_is_partial_sum() {
        let mut calc = ProgressiveScoreCalculator::new();
        calc.update_score(names::CRAWL, 90.0);
        calc.update_score(names::LLM_TEST, 90.0);
        assert_eq!(calc.estimate_final_score(), calc.current().current_score);
    }

    #[test]
    fn test_estimate_extrapolates_from_eighty_percent() {
        let mut calc = ProgressiveScoreCalculator::new();
        // Nine of eleven agents (81.8%) all scoring 50 -> final projects to 50.
        for name in names::ALL.iter().filter(|n| **n != names::COMMERCE && **n != names::BRAND_HERITAGE) {
            calc.update_score(name, 50.0);
        }
        assert!(calc.completion_ratio() >= 0.8);
        assert_eq!(calc.current().current_score, 40);
        assert_eq!(calc.estimate_final_score(), 50);
    }

    #[test]
    fn test_estimate_at_full_completion_equals_running_score() {
        let mut calc = ProgressiveScoreCalculator::new();
        for (i, name) in names::ALL.iter().enumerate() {
            calc.update_score(name, 30.0 + i as f64 * 5.0);
        }
        let update = calc.current();
        assert_eq!(update.estimated_final_score, update.current_score);
    }

    #[test]
    fn test_pillar_breakdown_is_normalized_per_pillar() {
        let mut calc = ProgressiveScoreCalculator::new();
        calc.update_score(names::COMMERCE, 100.0);
        calc.update_score(names::BRAND_HERITAGE, 100.0);
        let update = calc.current();
        assert_eq!(update.per_pillar.commerce, 100);
        assert_eq!(update.per_pillar.infrastructure, 0);
    }

    #[test]
    fn test_completion_stats_and_reset() {
        let mut calc = ProgressiveScoreCalculator::new();
        calc.update_score(names::CRAWL, 70.0);
        calc.update_score(names::SENTIMENT, 70.0);
        let stats = calc.completion_stats();
        assert_eq!(stats.total, 11);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.remaining, 9);
        assert_eq!(stats.critical_completed, 1);
        assert_eq!(stats.critical_remaining, 1);

        calc.reset();
        assert_eq!(calc.current().completed_agents, 0);
        assert!(calc.agent_weight(names::CRAWL).is_some());
    }
}
