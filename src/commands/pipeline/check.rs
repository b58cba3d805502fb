use async_trait::async_trait;
use clap::{Args, Parser};
use log::debug;

use crate::api::GoCdApi;
use crate::commands::{Command, CommandContext, CommandOutput};
use crate::error::Result;
use crate::pipeline::{
    resolve, AlertResult, EvaluationContext, PipelineEvaluator, PipelineSnapshot,
    RunTimeThresholds, TimeOfDay, DEFAULT_CRIT_RUN_TIME, DEFAULT_WARN_RUN_TIME,
};

/// Options shared by `check` and `monitor`.
#[derive(Args, Debug)]
pub struct WindowArgs {
    /// Critical unless the run started after this time of day (HH:MM or HH:MM:SS)
    #[arg(long)]
    ran_after: Option<String>,
    /// Minutes a run may take before warning
    #[arg(long, default_value_t = DEFAULT_WARN_RUN_TIME)]
    warn_run_time: u64,
    /// Minutes a run may take before it's critical
    #[arg(long, default_value_t = DEFAULT_CRIT_RUN_TIME)]
    crit_run_time: u64,
    /// Evaluate paused pipelines instead of reporting them as unknown
    #[arg(long)]
    ignore_paused: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Pipeline name
    name: String,
    /// Check this run instead of the latest one
    #[arg(long)]
    counter: Option<u64>,
    #[command(flatten)]
    window: WindowArgs,
}

#[derive(Parser, Debug)]
pub struct MonitorArgs {
    /// Pipeline name
    name: String,
    #[command(flatten)]
    window: WindowArgs,
}

/// Which run of a pipeline to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Latest,
    Counter(u64),
    /// Newest entry of the history listing
    History,
}

impl SnapshotSource {
    async fn fetch(self, api: &dyn GoCdApi, name: &str) -> Result<Option<PipelineSnapshot>> {
        match self {
            Self::Latest => api.latest_instance(name).await,
            Self::Counter(counter) => api.instance(name, counter).await.map(Some),
            Self::History => Ok(api.history(name).await?.into_iter().next()),
        }
    }
}

/// Fetches what the evaluation needs and classifies the pipeline.
///
/// The pause state is looked up first and no run is fetched for a paused
/// pipeline, unless paused pipelines are ignored.
pub(super) async fn check_pipeline(
    api: &dyn GoCdApi,
    ctx: &EvaluationContext,
    source: SnapshotSource,
    now_ms: i64,
) -> Result<AlertResult> {
    let paused = !ctx.ignore_paused && api.pipeline_status(&ctx.pipeline_name).await?.paused;
    let snapshot = if paused {
        None
    } else {
        source.fetch(api, &ctx.pipeline_name).await?
    };

    debug!(
        "Evaluating {} run {:?}",
        ctx.pipeline_name,
        snapshot.as_ref().map(|s| s.counter)
    );

    Ok(PipelineEvaluator::new(ctx, now_ms).evaluate_with_pause(paused, snapshot.as_ref()))
}

/// Nagios style check of a single pipeline run.
#[derive(Debug)]
pub struct Check {
    name: String,
    source: SnapshotSource,
    ran_after: Option<String>,
    thresholds: RunTimeThresholds,
    ignore_paused: bool,
}

impl Check {
    pub fn latest(args: CheckArgs) -> Result<Self> {
        let source = args.counter.map_or(SnapshotSource::Latest, SnapshotSource::Counter);
        Self::new(args.name, source, args.window)
    }

    pub fn monitor(args: MonitorArgs) -> Result<Self> {
        Self::new(args.name, SnapshotSource::History, args.window)
    }

    /// Validates the time of day and thresholds before anything is fetched.
    fn new(name: String, source: SnapshotSource, window: WindowArgs) -> Result<Self> {
        if let Some(ran_after) = window.ran_after.as_deref().filter(|s| !s.trim().is_empty()) {
            TimeOfDay::parse(ran_after)?;
        }

        Ok(Self {
            name,
            source,
            ran_after: window.ran_after,
            thresholds: RunTimeThresholds::from_minutes(window.warn_run_time, window.crit_run_time)?,
            ignore_paused: window.ignore_paused,
        })
    }

    fn evaluation_context(&self, now_ms: i64) -> Result<EvaluationContext> {
        Ok(EvaluationContext {
            pipeline_name: self.name.clone(),
            ran_after_threshold: resolve(self.ran_after.as_deref(), now_ms)?,
            thresholds: self.thresholds,
            ignore_paused: self.ignore_paused,
        })
    }
}

#[async_trait]
impl Command for Check {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let api = ctx.api()?;
        let evaluation = self.evaluation_context(ctx.now_ms())?;
        let result = check_pipeline(api, &evaluation, self.source, ctx.now_ms()).await?;

        Ok(result.into())
    }
}
