mod check;
mod check_all;
mod list;
mod retrigger_failed;
mod trigger;


use async_trait::async_trait;
use clap::Parser;
use log::info;

use super::{boxed, parse_args, Command, CommandContext, CommandOutput, Registry};
use crate::api::{GoCdApi, UnlockOutcome};
use crate::error::Result;

use check::{Check, CheckArgs, MonitorArgs};
use check_all::CheckAll;
use list::List;
use retrigger_failed::{RetriggerFailed, RetriggerFailedArgs};
use trigger::{Trigger, TriggerArgs};

pub(super) fn register(registry: &mut Registry) {
    registry.register(
        "pipeline trigger",
        "Triggers the named pipeline, optionally waiting for it to finish",
        |name: &str, args: &[String]| {
            Ok(boxed(Trigger::try_from(parse_args::<TriggerArgs>(name, args)?)?))
        },
    );
    registry.register(
        "pipeline unlock",
        "Unlocks the named pipeline if it's currently locked",
        |name: &str, args: &[String]| Ok(boxed(parse_args::<Unlock>(name, args)?)),
    );
    registry.register(
        "pipeline pause",
        "Pauses the named pipeline",
        |name: &str, args: &[String]| Ok(boxed(parse_args::<Pause>(name, args)?)),
    );
    registry.register(
        "pipeline unpause",
        "Unpauses the named pipeline",
        |name: &str, args: &[String]| Ok(boxed(parse_args::<Unpause>(name, args)?)),
    );
    registry.register(
        "pipeline check",
        "Checks whether a pipeline has run successfully, Nagios style",
        |name: &str, args: &[String]| Ok(boxed(Check::latest(parse_args::<CheckArgs>(name, args)?)?)),
    );
    registry.register(
        "pipeline monitor",
        "Checks the newest run in a pipeline's history, Nagios style",
        |name: &str, args: &[String]| {
            Ok(boxed(Check::monitor(parse_args::<MonitorArgs>(name, args)?)?))
        },
    );
    registry.register(
        "pipeline check-all",
        "Checks every pipeline on the server and reports the ones that need attention",
        |name: &str, args: &[String]| Ok(boxed(parse_args::<CheckAll>(name, args)?)),
    );
    registry.register(
        "pipeline list",
        "Lists all pipelines with their pause and lock state",
        |name: &str, args: &[String]| Ok(boxed(parse_args::<List>(name, args)?)),
    );
    registry.register(
        "pipeline retrigger-failed",
        "Retriggers the pipeline or stage of a run that has a failed stage",
        |name: &str, args: &[String]| {
            Ok(boxed(RetriggerFailed::try_from(parse_args::<RetriggerFailedArgs>(
                name, args,
            )?)?))
        },
    );
}

/// Releases the pipeline's lock, returns whether there was one to release.
async fn unlock_if_locked(api: &dyn GoCdApi, name: &str) -> Result<bool> {
    if !api.pipeline_status(name).await?.locked {
        return Ok(false);
    }

    let outcome = api.unlock(name).await?;
    info!("Unlocked {name}: {outcome:?}");

    Ok(outcome == UnlockOutcome::Unlocked)
}

#[derive(Parser, Debug)]
pub struct Unlock {
    /// Pipeline name
    name: String,
}

#[async_trait]
impl Command for Unlock {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        if unlock_if_locked(ctx.api()?, &self.name).await? {
            Ok(CommandOutput::new(format!("Unlocked pipeline \"{}\"", self.name), 0))
        } else {
            Ok(CommandOutput::new(format!("Pipeline \"{}\" is not locked", self.name), 0))
        }
    }
}

#[derive(Parser, Debug)]
pub struct Pause {
    /// Pipeline name
    name: String,
    /// Reason shown in GoCD while the pipeline is paused
    #[arg(long, default_value = "")]
    cause: String,
}

#[async_trait]
impl Command for Pause {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let api = ctx.api()?;
        if api.pipeline_status(&self.name).await?.paused {
            return Ok(CommandOutput::new(
                format!("Pipeline \"{}\" is already paused", self.name),
                0,
            ));
        }

        api.pause(&self.name, &self.cause).await?;
        Ok(CommandOutput::silent(0))
    }
}

#[derive(Parser, Debug)]
pub struct Unpause {
    /// Pipeline name
    name: String,
}

#[async_trait]
impl Command for Unpause {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let api = ctx.api()?;
        if !api.pipeline_status(&self.name).await?.paused {
            return Ok(CommandOutput::new(
                format!("Pipeline \"{}\" is not paused", self.name),
                0,
            ));
        }

        api.unpause(&self.name).await?;
        Ok(CommandOutput::silent(0))
    }
}
