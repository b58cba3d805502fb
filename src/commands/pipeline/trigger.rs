use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use log::{debug, info};
use tokio::time::sleep;

use super::unlock_if_locked;
use crate::api::{GoCdApi, ScheduleOutcome, Variables};
use crate::commands::{Command, CommandContext, CommandOutput};
use crate::error::{GoCdError, Result};
use crate::output::WaitProgress;
use crate::pipeline::PipelineSnapshot;

#[derive(Parser, Debug)]
pub struct TriggerArgs {
    /// Pipeline name
    name: String,
    /// Release the pipeline lock before scheduling
    #[arg(long)]
    unlock: bool,
    /// Pipeline variables as comma separated KEY=VALUE pairs
    #[arg(long)]
    variables: Option<String>,
    /// Secure pipeline variables as comma separated KEY=VALUE pairs
    #[arg(long)]
    secure_variables: Option<String>,
    /// Block until the scheduled run has finished, printing job console logs
    #[arg(long)]
    wait_until_finished: bool,
    /// Show progress while waiting
    #[arg(long)]
    verbose: bool,
    /// Seconds between polls while waiting
    #[arg(long, default_value_t = 30, hide = true)]
    poll_interval: u64,
}

/// Parses `KEY=VALUE,KEY2=VALUE2` keeping the given order.
fn parse_variables(option: &str, value: Option<&str>) -> Result<Variables> {
    let mut variables = Variables::new();

    for pair in value.unwrap_or("").split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            GoCdError::AssertionViolation(format!(
                "\"{option}\" needs to be in the format KEY=VALUE, got \"{pair}\""
            ))
        })?;
        variables.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(variables)
}

/// Schedules a pipeline and optionally follows the run to its end.
#[derive(Debug)]
pub struct Trigger {
    name: String,
    unlock: bool,
    variables: Variables,
    secure_variables: Variables,
    wait_until_finished: bool,
    verbose: bool,
    poll_interval: Duration,
}

impl TryFrom<TriggerArgs> for Trigger {
    type Error = GoCdError;

    fn try_from(args: TriggerArgs) -> Result<Self> {
        Ok(Self {
            variables: parse_variables("variables", args.variables.as_deref())?,
            secure_variables: parse_variables("secure-variables", args.secure_variables.as_deref())?,
            name: args.name,
            unlock: args.unlock,
            wait_until_finished: args.wait_until_finished,
            verbose: args.verbose,
            poll_interval: Duration::from_secs(args.poll_interval),
        })
    }
}

impl Trigger {
    /// Polls until a run newer than `previous` shows up.
    async fn wait_for_new_run(
        &self,
        api: &dyn GoCdApi,
        previous: Option<u64>,
    ) -> Result<PipelineSnapshot> {
        loop {
            if let Some(latest) = api.latest_instance(&self.name).await? {
                if previous.map_or(true, |counter| latest.counter > counter) {
                    return Ok(latest);
                }
            }
            debug!("No new run of {} yet", self.name);
            sleep(self.poll_interval).await;
        }
    }

    async fn follow_run(
        &self,
        api: &dyn GoCdApi,
        previous: Option<u64>,
    ) -> Result<CommandOutput> {
        let progress = self.verbose.then(|| WaitProgress::start(&self.name));

        let mut run = self.wait_for_new_run(api, previous).await?;
        while !run.stages_finished() {
            if let Some(progress) = &progress {
                progress.update(&run);
            }
            sleep(self.poll_interval).await;
            run = api.instance(&self.name, run.counter).await?;
        }

        if let Some(progress) = progress {
            progress.finish(&run);
        }

        let mut output = String::new();
        for console in api.console_output(&self.name, &run).await? {
            let _ = write!(
                output,
                "\n\n=== {} ===\n\n{}",
                console.masthead(),
                console.output.trim_end()
            );
        }

        let exit_code = if run.run_successful() { 0 } else { 2 };
        info!("Run {}/{} finished with exit code {exit_code}", self.name, run.counter);

        Ok(CommandOutput {
            output: Some(output.trim_start().to_string()).filter(|o| !o.is_empty()),
            exit_code,
        })
    }
}

#[async_trait]
impl Command for Trigger {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let api = ctx.api()?;

        if self.unlock {
            unlock_if_locked(api, &self.name).await?;
        }

        let previous = if self.wait_until_finished {
            api.latest_instance(&self.name).await?.map(|run| run.counter)
        } else {
            None
        };

        match api
            .schedule(&self.name, &self.variables, &self.secure_variables)
            .await?
        {
            ScheduleOutcome::Accepted(message) => {
                info!("Scheduled {}: {message}", self.name);
            }
            ScheduleOutcome::Rejected { status, message } => {
                return Ok(CommandOutput::new(
                    format!("Failed to trigger \"{}\" ({status}): {message}", self.name),
                    1,
                ));
            }
        }

        if self.wait_until_finished {
            self.follow_run(api, previous).await
        } else {
            Ok(CommandOutput::silent(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variables_keeps_order() {
        let variables = parse_variables("variables", Some("B=2, A=1,URL=http://x?y=z")).unwrap();

        assert_eq!(
            variables.into_iter().collect::<Vec<_>>(),
            vec![
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "1".to_string()),
                ("URL".to_string(), "http://x?y=z".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_variables_rejects_missing_separator() {
        let result = parse_variables("variables", Some("A=1,broken"));

        assert!(matches!(result, Err(GoCdError::AssertionViolation(_))));
    }

    #[test]
    fn test_no_variables_is_empty() {
        assert!(parse_variables("variables", None).unwrap().is_empty());
    }
}
