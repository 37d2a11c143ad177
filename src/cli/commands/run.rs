//! `brandscore run`: one evaluation end to end with simulated agents.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::adapters::agents::{SimulatedAgent, SimulatedResponse};
use crate::adapters::memory::InMemoryExecutionRepository;
use crate::adapters::transports::{HttpTransport, InProcessTransport, TransportChain};
use crate::cli::output::{create_spinner, output, styled_status, CommandOutput};
use crate::domain::models::{names, Config, EvaluationContext, EvaluationStatusView, ProfileKind, ScoreUpdate};
use crate::services::{AgentCatalog, ExecutionTracker, OrchestrationProfile, Orchestrator, QueueManager};

use super::open_tracker;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Website to evaluate
    #[arg(short, long)]
    pub url: String,

    /// Brand identifier
    #[arg(short, long, default_value = "local-brand")]
    pub brand_id: String,

    /// Evaluation ID (generated when omitted)
    #[arg(short, long)]
    pub evaluation_id: Option<String>,

    /// Override the configured orchestration profile (hybrid, performance)
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Make an agent fail every attempt (repeatable)
    #[arg(long = "fail")]
    pub failing_agents: Vec<String>,

    /// Simulated latency of every agent
    #[arg(long, default_value = "250")]
    pub latency_ms: u64,

    /// Keep executions in memory instead of the configured database
    #[arg(long)]
    pub ephemeral: bool,

    /// Give up waiting after this many seconds
    #[arg(long, default_value = "1800")]
    pub max_wait_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub evaluation_id: String,
    pub status: EvaluationStatusView,
    pub score: Option<ScoreUpdate>,
    pub fast_failures: usize,
    pub delivery_failures: Vec<String>,
    pub elapsed_ms: u64,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Evaluation {} finished as {}", self.evaluation_id, styled_status(self.status.overall_status.as_str())),
            format!(
                "Agents: {}/{} done, {} failed ({} fast failures)",
                self.status.completed_agents, self.status.total_agents, self.status.failed_agents, self.fast_failures
            ),
        ];
        if let Some(score) = &self.score {
            lines.push(format!(
                "Score: {} (confidence {:.2}, {})",
                score.current_score, score.confidence, score.data_completeness
            ));
            lines.push(format!(
                "Pillars: infrastructure {}, perception {}, commerce {}",
                score.per_pillar.infrastructure, score.per_pillar.perception, score.per_pillar.commerce
            ));
        }
        for failure in &self.delivery_failures {
            lines.push(format!("Undelivered: {failure}"));
        }
        lines.push(format!("Elapsed: {:.1}s", self.elapsed_ms as f64 / 1_000.0));
        lines.join("\n")
    }
}

fn parse_profile(profile: &str) -> Result<ProfileKind> {
    match profile.to_lowercase().as_str() {
        "hybrid" => Ok(ProfileKind::Hybrid),
        "performance" => Ok(ProfileKind::Performance),
        other => anyhow::bail!("Unknown profile: {other}. Must be one of: hybrid, performance"),
    }
}

fn simulated_catalog(args: &RunArgs) -> Result<AgentCatalog> {
    if let Some(unknown) = args.failing_agents.iter().find(|a| !names::ALL.contains(&a.as_str())) {
        anyhow::bail!("Unknown agent: {unknown}");
    }

    let latency = Duration::from_millis(args.latency_ms);
    Ok(names::ALL.iter().fold(AgentCatalog::new(), |catalog, name| {
        let response = if args.failing_agents.iter().any(|a| a == name) {
            SimulatedResponse::failure(format!("{name} simulated outage"))
        } else {
            SimulatedResponse::default()
        };
        catalog.with_agent(Arc::new(SimulatedAgent::with_default_response(
            *name,
            response.with_latency(latency),
        )))
    }))
}

pub async fn execute(args: RunArgs, config: &Config, json: bool) -> Result<()> {
    let mut orchestration = config.orchestration.clone();
    if let Some(profile) = &args.profile {
        orchestration.profile = parse_profile(profile)?;
    }
    let profile = OrchestrationProfile::from_config(&orchestration);

    let tracker = if args.ephemeral {
        ExecutionTracker::new(Arc::new(InMemoryExecutionRepository::new()))
    } else {
        open_tracker(config).await?
    };
    let catalog = simulated_catalog(&args)?;

    let queue = QueueManager::builder(tracker.clone(), catalog.clone())
        .with_config(config.queue.clone())
        .with_fallback_policy(config.fallback)
        .build();
    let cleanup = queue.spawn_cleanup();

    let mut transports = TransportChain::new();
    if config.delivery.in_process {
        transports = transports.with_transport(Arc::new(InProcessTransport::new(queue.clone())));
    }
    for endpoint in &config.delivery.endpoints {
        transports = transports.with_transport(Arc::new(HttpTransport::with_timeout(
            endpoint,
            &config.delivery.path,
            Duration::from_secs(config.delivery.timeout_secs),
        )));
    }

    let orchestrator = Orchestrator::new(profile, catalog, tracker, transports).with_queue(queue);

    let evaluation_id = args.evaluation_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    let context = EvaluationContext::new(&evaluation_id, &args.brand_id, &args.url);
    let started = Instant::now();

    let run = orchestrator
        .run_evaluation(context)
        .await
        .context("Evaluation failed to start")?;
    info!(evaluation_id = %evaluation_id, dispatched = run.dispatched.len(), "waiting for queued agents");

    let spinner = (!json).then(|| create_spinner("running agents"));
    let deadline = started + Duration::from_secs(args.max_wait_secs);
    let status = loop {
        let status = orchestrator.status(&evaluation_id).await?;
        if let Some(spinner) = &spinner {
            spinner.set_message(format!(
                "{:.0}% ({} running, {} done)",
                status.progress_percent, status.running_agents, status.completed_agents
            ));
        }
        if status.overall_status.is_settled() || Instant::now() >= deadline {
            break status;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    };
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    cleanup.abort();

    output(
        &RunOutput {
            score: orchestrator.scores().snapshot(&evaluation_id).await,
            evaluation_id,
            status,
            fast_failures: run.fast_failures(),
            delivery_failures: run.delivery_failures.iter().map(ToString::to_string).collect(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        },
        json,
    );
    Ok(())
}
