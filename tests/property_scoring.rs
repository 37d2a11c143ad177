//! Property tests for scoring, backoff and timeout ladders.

use std::time::Duration;

use brandscore::domain::models::{names, retry_backoff, Pillar, TimeoutStrategy};
use brandscore::services::{ProgressiveScoreCalculator, ScoreWeights};
use proptest::prelude::*;
use test_strategy::Arbitrary;

/// Agents that carry weight in the standard table.
const SCORING_AGENTS: [&str; 11] = [
    names::CRAWL,
    names::SCHEMA,
    names::SEMANTIC,
    names::KNOWLEDGE_GRAPH,
    names::CONVERSATIONAL_COPY,
    names::LLM_TEST,
    names::CITATION,
    names::SENTIMENT,
    names::GEO_VISIBILITY,
    names::COMMERCE,
    names::BRAND_HERITAGE,
];

#[derive(Debug, Clone, Arbitrary)]
struct Report {
    #[strategy(0usize..11)]
    agent: usize,
    #[strategy(-50.0f64..150.0)]
    score: f64,
}

#[test]
fn test_standard_weights_sum_to_one() {
    let weights = ScoreWeights::standard();
    assert!((weights.total_weight() - 1.0).abs() < 1e-9);
    assert!((weights.pillar_total(Pillar::Infrastructure) - 0.40).abs() < 1e-9);
    assert!((weights.pillar_total(Pillar::Perception) - 0.40).abs() < 1e-9);
    assert!((weights.pillar_total(Pillar::Commerce) - 0.20).abs() < 1e-9);
    assert_eq!(weights.scoring_agent_count(), 11);
}

#[test]
fn test_two_reports_give_weighted_partial_score() {
    let mut calculator = ProgressiveScoreCalculator::new();
    calculator.update_score(names::CRAWL, 80.0);
    let update = calculator.update_score(names::SCHEMA, 60.0);

    // 80 * 0.12 + 60 * 0.10 = 15.6
    assert_eq!(update.current_score, 16);
    assert_eq!(update.completed_agents, 2);
    assert_eq!(update.data_completeness, "2/11 agents");
    // Below the extrapolation threshold the estimate is the partial sum.
    assert_eq!(update.estimated_final_score, 16);
}

proptest! {
    /// Property: retry delays never shrink and never exceed 30 seconds
    #[test]
    fn prop_backoff_is_monotonic_and_capped(attempts in 1u32..64) {
        let delay = retry_backoff(attempts);
        prop_assert!(delay <= Duration::from_millis(30_000));
        prop_assert!(retry_backoff(attempts + 1) >= delay);
        prop_assert!(delay >= Duration::from_millis(1_000));
    }

    /// Property: scores stay within 0-100 whatever agents report
    #[test]
    fn prop_scores_are_clamped(reports in proptest::collection::vec(any::<Report>(), 0..40)) {
        let mut calculator = ProgressiveScoreCalculator::new();
        for report in &reports {
            let update = calculator.update_score(SCORING_AGENTS[report.agent], report.score);
            prop_assert!(update.current_score <= 100);
            prop_assert!(update.estimated_final_score <= 100);
            prop_assert!(update.per_pillar.infrastructure <= 100);
            prop_assert!(update.per_pillar.perception <= 100);
            prop_assert!(update.per_pillar.commerce <= 100);
            prop_assert!((0.1..=0.95).contains(&update.confidence));
            prop_assert!(update.completed_agents <= 11);
        }
    }

    /// Property: reporting the same agent again replaces its contribution
    #[test]
    fn prop_repeated_report_is_idempotent(score in 0.0f64..=100.0, earlier in 0.0f64..=100.0) {
        let mut twice = ProgressiveScoreCalculator::new();
        twice.update_score(names::COMMERCE, earlier);
        let replaced = twice.update_score(names::COMMERCE, score);

        let mut once = ProgressiveScoreCalculator::new();
        let direct = once.update_score(names::COMMERCE, score);

        prop_assert_eq!(replaced, direct);
    }

    /// Property: once every agent has reported, the estimate is the score
    #[test]
    fn prop_complete_estimate_matches_current(scores in proptest::collection::vec(0.0f64..=100.0, 11)) {
        let mut calculator = ProgressiveScoreCalculator::new();
        for (agent, score) in SCORING_AGENTS.iter().zip(&scores) {
            calculator.update_score(agent, *score);
        }
        let update = calculator.current();
        prop_assert!((update.completeness - 1.0).abs() < f64::EPSILON);
        prop_assert_eq!(update.estimated_final_score, update.current_score);
    }

    /// Property: the ladder hands out each rung once, then repeats the last
    #[test]
    fn prop_timeout_ladder_clamps(
        rungs in proptest::collection::vec(1_000u64..900_000, 0..5),
        attempt in 1u32..20
    ) {
        let strategy = TimeoutStrategy {
            initial_ms: 500,
            progressive_ms: rungs.clone(),
            max_total_ms: 900_000,
            circuit_breaker_ms: 900_000,
        };
        let timeout = strategy.timeout_for_attempt(attempt);
        let expected = if attempt == 1 || rungs.is_empty() {
            500
        } else {
            rungs[(attempt as usize - 2).min(rungs.len() - 1)]
        };
        prop_assert_eq!(timeout, Duration::from_millis(expected));
        prop_assert_eq!(strategy.max_attempts() as usize, rungs.len() + 1);
    }
}

#[test_strategy::proptest]
fn prop_confidence_grows_with_reports(#[strategy(3usize..=11)] reported: usize) {
    let mut calculator = ProgressiveScoreCalculator::new();
    let mut previous = 0.0;
    for agent in SCORING_AGENTS.iter().take(reported) {
        let update = calculator.update_score(agent, 50.0);
        if calculator.completion_stats().completed >= 3 {
            prop_assert!(update.confidence >= previous);
        }
        previous = update.confidence;
    }
}
