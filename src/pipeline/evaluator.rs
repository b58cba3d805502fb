use super::alert::{AlertResult, AlertStatus};
use super::snapshot::{PipelineSnapshot, Stage, StageResult};
use super::time_window::format_timestamp;
use crate::error::{GoCdError, Result};

pub const DEFAULT_WARN_RUN_TIME: u64 = 30;
pub const DEFAULT_CRIT_RUN_TIME: u64 = 60;

const MS_PER_MINUTE: i64 = 60 * 1000;

/// Run-time limits for a pipeline that is currently running, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTimeThresholds {
    warn_ms: i64,
    crit_ms: i64,
}

impl RunTimeThresholds {
    /// Builds thresholds from minutes, rejecting a warning limit above the critical one.
    pub fn from_minutes(warn_minutes: u64, crit_minutes: u64) -> Result<Self> {
        if warn_minutes > crit_minutes {
            return Err(GoCdError::Config(format!(
                "warn_run_time ({warn_minutes}) must not be greater than crit_run_time ({crit_minutes})"
            )));
        }

        Ok(Self {
            warn_ms: minutes_to_ms(warn_minutes)?,
            crit_ms: minutes_to_ms(crit_minutes)?,
        })
    }

    pub fn warn_ms(&self) -> i64 {
        self.warn_ms
    }

    pub fn crit_ms(&self) -> i64 {
        self.crit_ms
    }
}

impl Default for RunTimeThresholds {
    fn default() -> Self {
        Self {
            warn_ms: DEFAULT_WARN_RUN_TIME as i64 * MS_PER_MINUTE,
            crit_ms: DEFAULT_CRIT_RUN_TIME as i64 * MS_PER_MINUTE,
        }
    }
}

fn minutes_to_ms(minutes: u64) -> Result<i64> {
    i64::try_from(minutes)
        .ok()
        .and_then(|m| m.checked_mul(MS_PER_MINUTE))
        .ok_or_else(|| GoCdError::Config(format!("run time of {minutes} minutes is too large")))
}

/// Inputs for evaluating a single pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationContext {
    pub pipeline_name: String,
    /// Epoch milliseconds the pipeline should have started after
    pub ran_after_threshold: Option<i64>,
    pub thresholds: RunTimeThresholds,
    /// Evaluate paused pipelines like any other instead of reporting them as unknown
    pub ignore_paused: bool,
}

impl EvaluationContext {
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            ran_after_threshold: None,
            thresholds: RunTimeThresholds::default(),
            ignore_paused: false,
        }
    }
}

/// Running state gathered while walking the stages of one snapshot.
#[derive(Debug, Default)]
struct RunProgress {
    currently_running: bool,
    longest_running: Option<i64>,
    started_at: Option<i64>,
}

impl RunProgress {
    fn record_in_flight(&mut self, stage: &Stage) {
        if !self.currently_running {
            self.currently_running = stage.has_running_jobs();
        }

        if let Some(scheduled_at) = stage.earliest_scheduled() {
            self.longest_running = Some(min_with(self.longest_running, scheduled_at));
            self.record_started(scheduled_at);
        }
    }

    fn record_finished(&mut self, stage: &Stage) {
        if let Some(scheduled_at) = stage.earliest_scheduled() {
            self.record_started(scheduled_at);
        }
    }

    fn record_started(&mut self, scheduled_at: i64) {
        self.started_at = Some(min_with(self.started_at, scheduled_at));
    }
}

fn min_with(current: Option<i64>, value: i64) -> i64 {
    current.map_or(value, |c| c.min(value))
}

/// Classifies a pipeline snapshot into an alerting state.
///
/// Evaluation is a pure function of the context, the snapshot and `now_ms`.
pub struct PipelineEvaluator<'a> {
    ctx: &'a EvaluationContext,
    now_ms: i64,
}

impl<'a> PipelineEvaluator<'a> {
    pub fn new(ctx: &'a EvaluationContext, now_ms: i64) -> Self {
        Self { ctx, now_ms }
    }

    /// Evaluates taking the pipeline's pause state into account.
    ///
    /// A paused pipeline is reported as unknown without looking at any stage
    /// unless the context asks for paused pipelines to be ignored.
    pub fn evaluate_with_pause(
        &self,
        paused: bool,
        snapshot: Option<&PipelineSnapshot>,
    ) -> AlertResult {
        if paused && !self.ctx.ignore_paused {
            return self.paused();
        }

        self.evaluate(snapshot)
    }

    fn paused(&self) -> AlertResult {
        AlertResult::new(
            AlertStatus::Unknown,
            format!("Pipeline \"{}\" is paused", self.ctx.pipeline_name),
        )
    }

    /// Evaluates a snapshot, `None` meaning the pipeline has never been scheduled.
    pub fn evaluate(&self, snapshot: Option<&PipelineSnapshot>) -> AlertResult {
        let stages = snapshot.map_or(&[][..], |s| s.stages.as_slice());
        let mut progress = RunProgress::default();

        for stage in stages {
            match stage.result {
                StageResult::Failed => return self.failed(stage),
                _ if !stage.scheduled || stage.jobs.is_empty() => {}
                StageResult::Unknown => progress.record_in_flight(stage),
                _ => progress.record_finished(stage),
            }
        }

        self.classify(&progress)
    }

    fn classify(&self, progress: &RunProgress) -> AlertResult {
        if progress.currently_running {
            let longest_running = progress.longest_running.unwrap_or(self.now_ms);
            return self.running_for(self.now_ms - longest_running);
        }

        match (progress.started_at, self.ctx.ran_after_threshold) {
            (None, Some(threshold)) => self.not_run_after(threshold),
            (None, None) => AlertResult::ok("No scheduled runs"),
            (Some(started_at), Some(threshold)) if started_at < threshold => {
                self.not_run_after(threshold)
            }
            _ => AlertResult::ok("Successful"),
        }
    }

    fn running_for(&self, elapsed_ms: i64) -> AlertResult {
        let status = if elapsed_ms >= self.ctx.thresholds.crit_ms() {
            AlertStatus::Critical
        } else if elapsed_ms >= self.ctx.thresholds.warn_ms() {
            AlertStatus::Warning
        } else {
            return AlertResult::ok("Successful");
        };

        AlertResult::new(
            status,
            format!(
                "Pipeline \"{}\" stalled at \"{}\", running for {} seconds",
                self.ctx.pipeline_name,
                format_timestamp(self.now_ms),
                elapsed_ms / 1000
            ),
        )
    }

    fn failed(&self, stage: &Stage) -> AlertResult {
        let message = match stage.jobs.first() {
            Some(job) => format!(
                "Pipeline \"{}\" failed (scheduled at \"{}\")",
                self.ctx.pipeline_name,
                format_timestamp(job.scheduled_date)
            ),
            None => format!("Pipeline \"{}\" failed", self.ctx.pipeline_name),
        };

        AlertResult::new(AlertStatus::Critical, message)
    }

    fn not_run_after(&self, threshold: i64) -> AlertResult {
        AlertResult::new(
            AlertStatus::Critical,
            format!(
                "Pipeline \"{}\" has not run after \"{}\".",
                self.ctx.pipeline_name,
                format_timestamp(threshold)
            ),
        )
    }
}
