use async_trait::async_trait;
use clap::Parser;

use crate::api::ScheduleOutcome;
use crate::commands::{Command, CommandContext, CommandOutput};
use crate::error::{GoCdError, Result};
use crate::pipeline::{retrigger_failed, RetriggerOutcome, RetriggerScope};

#[derive(Parser, Debug)]
pub struct RetriggerFailedArgs {
    /// Pipeline name
    name: String,
    /// Run to inspect, defaults to the newest one
    #[arg(long)]
    counter: Option<String>,
    /// Only retrigger when this stage is the one that failed
    #[arg(long)]
    stage: Option<String>,
    /// What to retrigger: `pipeline` or `stage`
    #[arg(long)]
    retrigger: Option<String>,
}

/// Retriggers a run that has a failed stage.
#[derive(Debug)]
pub struct RetriggerFailed {
    name: String,
    counter: Option<u64>,
    stage: Option<String>,
    scope: RetriggerScope,
}

impl TryFrom<RetriggerFailedArgs> for RetriggerFailed {
    type Error = GoCdError;

    fn try_from(args: RetriggerFailedArgs) -> Result<Self> {
        let counter = args
            .counter
            .as_deref()
            .map(|counter| {
                counter.trim().parse::<u64>().map_err(|_| {
                    GoCdError::AssertionViolation("\"counter\" needs to be an integer".to_string())
                })
            })
            .transpose()?;
        let scope = args
            .retrigger
            .as_deref()
            .map(str::parse::<RetriggerScope>)
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            name: args.name,
            counter,
            stage: args.stage,
            scope,
        })
    }
}

#[async_trait]
impl Command for RetriggerFailed {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let api = ctx.api()?;
        let snapshot = match self.counter {
            Some(counter) => api.instance(&self.name, counter).await?,
            None => match api.latest_instance(&self.name).await? {
                Some(snapshot) => snapshot,
                None => {
                    return Ok(CommandOutput::new(
                        format!("Pipeline \"{}\" has never run", self.name),
                        0,
                    ))
                }
            },
        };

        let outcome =
            retrigger_failed(api, &self.name, &snapshot, self.stage.as_deref(), self.scope).await?;

        Ok(match outcome {
            None => CommandOutput::new(
                format!(
                    "Nothing to retrigger for \"{}\" run {}",
                    self.name, snapshot.counter
                ),
                0,
            ),
            Some(RetriggerOutcome::Pipeline(ScheduleOutcome::Accepted(_))) => CommandOutput::new(
                format!("Retriggered pipeline \"{}\"", self.name),
                0,
            ),
            Some(RetriggerOutcome::Pipeline(ScheduleOutcome::Rejected { status, message })) => {
                CommandOutput::new(
                    format!("Failed to retrigger \"{}\" ({status}): {message}", self.name),
                    1,
                )
            }
            Some(RetriggerOutcome::Stage { counter, stage }) => CommandOutput::new(
                format!(
                    "Retriggered stage \"{stage}\" of \"{}\" run {counter}",
                    self.name
                ),
                0,
            ),
        })
    }
}
