//! The `run` command: drill the selected resource kinds

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Args;
use drill_core::sim::{seed_catalog, InMemoryBackupCatalog, SimulatedProvisioner};
use drill_core::{cancellation, DrillEvent, KindPlan, TokioClock, VerificationPipeline};
use drill_types::{ResourceKind, RunSummary};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::config::DrillConfig;
use crate::error::{CliError, CliResult};
use crate::output::{format_duration, render_summary, OutputFormat};

/// Arguments for `drill run`
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Resource kind to drill (database, volume); repeatable, defaults to all enabled kinds
    #[arg(short, long = "kind")]
    pub kinds: Vec<ResourceKind>,

    /// Summary output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Drill against in-memory backends instead of a cloud account
    #[arg(long)]
    pub simulate: bool,

    /// Cancel the run after this many seconds
    #[arg(long, env = "DRILL_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,
}

/// Execute a drill run; returns the process exit status
pub async fn execute(args: RunArgs, config: &DrillConfig) -> CliResult<u8> {
    let kinds: BTreeSet<ResourceKind> = if args.kinds.is_empty() {
        config.enabled_kinds()
    } else {
        args.kinds.iter().copied().collect()
    };
    if kinds.is_empty() {
        return Err(CliError::NoKinds);
    }

    if !args.simulate {
        return Err(CliError::Unsupported(
            "no cloud provider backend is compiled in; pass --simulate to drill against in-memory backends"
                .to_string(),
        ));
    }

    let pipeline = simulated_pipeline(config, &kinds)?;
    let deadline = args
        .deadline_secs
        .or(config.run.deadline_secs)
        .map(Duration::from_secs);

    let progress = tokio::spawn(log_progress(pipeline.subscribe()));
    let summary = run_until_interrupted(&pipeline, &kinds, deadline).await;
    drop(pipeline);
    let _ = progress.await;
    let summary = summary?;

    println!("{}", render_summary(&summary, args.output)?);
    Ok(summary.exit_code())
}

/// Build a pipeline over in-memory backends seeded with one backup per kind
fn simulated_pipeline(
    config: &DrillConfig,
    kinds: &BTreeSet<ResourceKind>,
) -> CliResult<VerificationPipeline> {
    let now = Utc::now();
    let catalog = Arc::new(InMemoryBackupCatalog::new());

    let mut pipeline = VerificationPipeline::new(catalog.clone(), Arc::new(TokioClock::new()))
        .with_name_prefix(config.run.name_prefix.clone());

    for &kind in kinds {
        let selector = config.selector(kind)?;
        seed_catalog(&catalog, kind, &selector, now - chrono::Duration::hours(1));

        let provisioner = SimulatedProvisioner::new(kind)
            .with_ready_after(config.simulation.ready_after_polls);
        let poll = config.simulated_poll_policy(kind);

        let mut plan = KindPlan::new(config.target_spec(kind, now.date_naive())?, Arc::new(provisioner))
            .with_selector(selector)
            .with_poll(poll);
        if let Some(objective) = config.rto_objective(kind) {
            plan = plan.with_rto_objective(objective);
        }
        pipeline.add_plan(plan)?;
    }

    Ok(pipeline)
}

/// Run the pipeline, cancelling on Ctrl+C or when the deadline passes
async fn run_until_interrupted(
    pipeline: &VerificationPipeline,
    kinds: &BTreeSet<ResourceKind>,
    deadline: Option<Duration>,
) -> CliResult<RunSummary> {
    let (cancel, token) = cancellation();
    let run = pipeline.run(kinds, &token);
    tokio::pin!(run);

    let interrupt = async {
        tokio::select! {
            _ = wait_for_deadline(deadline) => "deadline reached",
            _ = wait_for_ctrl_c() => "interrupted",
        }
    };
    tokio::pin!(interrupt);

    let summary = tokio::select! {
        result = &mut run => result,
        reason = &mut interrupt => {
            warn!(reason, "Cancelling drill; restores already issued are left in place");
            cancel.cancel();
            run.await
        }
    };

    Ok(summary?)
}

async fn wait_for_deadline(deadline: Option<Duration>) {
    match deadline {
        Some(deadline) => tokio::time::sleep(deadline).await,
        None => std::future::pending().await,
    }
}

async fn wait_for_ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn log_progress(mut events: broadcast::Receiver<DrillEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Progress events dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let kind = event.kind();
        match event {
            DrillEvent::StageStarted { stage, .. } => {
                info!(kind = %kind, stage = %stage, "Stage started");
            }
            DrillEvent::StageFinished { result, .. } => {
                info!(
                    kind = %kind,
                    stage = %result.stage,
                    outcome = %result.outcome,
                    elapsed = %format_duration(result.elapsed),
                    detail = %result.detail,
                    "Stage finished"
                );
            }
            DrillEvent::KindFinished { passed, rto_secs, .. } => {
                info!(kind = %kind, passed, rto_secs, "Kind finished");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_run_passes_with_defaults() {
        let config = DrillConfig::default();
        let kinds = config.enabled_kinds();
        let pipeline = simulated_pipeline(&config, &kinds).unwrap();

        let summary = run_until_interrupted(&pipeline, &kinds, None).await.unwrap();

        assert!(summary.overall_pass());
        for kind in kinds {
            let result = summary.get(kind).unwrap();
            assert!(result.passed());
            assert!(result.rto().is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_slow_simulation() {
        let mut config = DrillConfig::default();
        config.simulation.ready_after_polls = 1_000;
        config.simulation.time_scale = 15;
        let kinds = BTreeSet::from([ResourceKind::Volume]);
        let pipeline = simulated_pipeline(&config, &kinds).unwrap();

        let summary = run_until_interrupted(&pipeline, &kinds, Some(Duration::from_secs(5)))
            .await
            .unwrap();

        assert!(!summary.overall_pass());
        let failed = summary.get(ResourceKind::Volume).unwrap().failed_stage().unwrap();
        assert!(failed.detail.contains("cancelled"));
    }

    #[tokio::test]
    async fn test_run_without_simulate_is_unsupported() {
        let args = RunArgs {
            kinds: vec![ResourceKind::Database],
            output: OutputFormat::Json,
            simulate: false,
            deadline_secs: None,
        };
        let result = execute(args, &DrillConfig::default()).await;
        assert!(matches!(result, Err(CliError::Unsupported(_))));
    }
}
