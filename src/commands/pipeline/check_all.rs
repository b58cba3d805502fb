use std::collections::HashSet;

use async_trait::async_trait;
use clap::Parser;
use log::{debug, info};

use super::check::{check_pipeline, SnapshotSource};
use crate::api::pipeline_names;
use crate::commands::{Command, CommandContext, CommandOutput};
use crate::error::Result;
use crate::pipeline::{
    AlertResult, AlertStatus, EvaluationContext, RunTimeThresholds, DEFAULT_CRIT_RUN_TIME,
    DEFAULT_WARN_RUN_TIME,
};
use crate::settings::Settings;

const SECTION: &str = "check_all";

/// Checks every pipeline on the server.
///
/// Thresholds are taken from, in order: a `<pipeline>_warn_run_time` /
/// `<pipeline>_crit_run_time` setting, the command line, the `warn_run_time`
/// / `crit_run_time` settings of the `[check_all]` section and finally the
/// built-in defaults. Pipelines listed in `ignored_pipelines` are skipped.
#[derive(Parser, Debug)]
pub struct CheckAll {
    /// Minutes a run may take before warning
    #[arg(long)]
    warn_run_time: Option<u64>,
    /// Minutes a run may take before it's critical
    #[arg(long)]
    crit_run_time: Option<u64>,
    /// Report paused pipelines instead of skipping them
    #[arg(long)]
    no_skip_paused: bool,
}

impl CheckAll {
    fn default_minutes(&self, settings: &Settings) -> Result<(u64, u64)> {
        let warn = match self.warn_run_time {
            Some(minutes) => minutes,
            None => settings.get_parsed("warn_run_time")?.unwrap_or(DEFAULT_WARN_RUN_TIME),
        };
        let crit = match self.crit_run_time {
            Some(minutes) => minutes,
            None => settings.get_parsed("crit_run_time")?.unwrap_or(DEFAULT_CRIT_RUN_TIME),
        };

        Ok((warn, crit))
    }
}

fn pipeline_thresholds(settings: &Settings, name: &str, (warn, crit): (u64, u64)) -> Result<RunTimeThresholds> {
    let warn = settings
        .get_parsed(&format!("{name}_warn_run_time"))?
        .unwrap_or(warn);
    let crit = settings
        .get_parsed(&format!("{name}_crit_run_time"))?
        .unwrap_or(crit);

    RunTimeThresholds::from_minutes(warn, crit)
}

/// Results collected over one `check-all` invocation.
#[derive(Debug)]
struct CheckAllReport {
    skip_paused: bool,
    exit_code: i32,
    messages: Vec<String>,
}

impl CheckAllReport {
    fn new(skip_paused: bool) -> Self {
        Self {
            skip_paused,
            exit_code: 0,
            messages: Vec::new(),
        }
    }

    fn record(&mut self, result: &AlertResult) {
        match result.status() {
            AlertStatus::Ok => {}
            AlertStatus::Unknown if self.skip_paused => {}
            status => {
                // Paused pipelines are listed but never decide the exit code
                if status != AlertStatus::Unknown {
                    self.exit_code = self.exit_code.max(status.exit_code());
                }
                self.messages.push(result.to_string());
            }
        }
    }

    fn into_output(self) -> CommandOutput {
        if self.messages.is_empty() {
            CommandOutput::new("OK: All green", 0)
        } else {
            CommandOutput::new(self.messages.join("\n"), self.exit_code)
        }
    }
}

#[async_trait]
impl Command for CheckAll {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let settings = ctx.settings(SECTION)?;
        let defaults = self.default_minutes(&settings)?;
        // Reject bad defaults before talking to the server
        RunTimeThresholds::from_minutes(defaults.0, defaults.1)?;

        let ignored: HashSet<String> = settings.get_list("ignored_pipelines").into_iter().collect();
        let api = ctx.api()?;
        let names = pipeline_names(&api.pipeline_groups().await?);
        info!("Checking {} pipelines, ignoring {}", names.len(), ignored.len());

        let mut report = CheckAllReport::new(!self.no_skip_paused);
        for name in names.iter().filter(|name| !ignored.contains(*name)) {
            let evaluation = EvaluationContext {
                thresholds: pipeline_thresholds(&settings, name, defaults)?,
                ..EvaluationContext::new(name.as_str())
            };
            let result =
                check_pipeline(api, &evaluation, SnapshotSource::Latest, ctx.now_ms()).await?;
            debug!("{name} is {}: {}", result.status().label(), result.message());
            report.record(&result);
        }

        Ok(report.into_output())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_worst_exit_code() {
        let mut report = CheckAllReport::new(true);
        report.record(&AlertResult::new(AlertStatus::Warning, "slow"));
        report.record(&AlertResult::new(AlertStatus::Critical, "broken"));
        report.record(&AlertResult::ok("fine"));

        let output = report.into_output();

        assert_eq!(output.exit_code, 2);
        assert_eq!(output.output.as_deref(), Some("WARNING: slow\nCRITICAL: broken"));
    }

    #[test]
    fn test_report_skips_paused_unless_asked() {
        let paused = AlertResult::new(AlertStatus::Unknown, "Pipeline \"Deploy\" is paused");

        let mut skipping = CheckAllReport::new(true);
        skipping.record(&paused);
        assert_eq!(skipping.into_output(), CommandOutput::new("OK: All green", 0));

        let mut reporting = CheckAllReport::new(false);
        reporting.record(&paused);
        let output = reporting.into_output();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.output.as_deref(), Some("UNKNOWN: Pipeline \"Deploy\" is paused"));
    }

    #[test]
    fn test_reported_paused_pipeline_does_not_mask_warning() {
        let mut report = CheckAllReport::new(false);
        report.record(&AlertResult::new(AlertStatus::Warning, "Pipeline \"Build\" stalled"));
        report.record(&AlertResult::new(AlertStatus::Unknown, "Pipeline \"Deploy\" is paused"));

        let output = report.into_output();

        assert_eq!(output.exit_code, 1);
        assert_eq!(output.output.unwrap().lines().count(), 2);
    }
}
