use async_trait::async_trait;
use clap::Parser;
use futures::future::join_all;
use log::warn;

use crate::api::pipeline_names;
use crate::commands::{Command, CommandContext, CommandOutput};
use crate::error::Result;
use crate::output::status_table;

#[derive(Parser, Debug)]
pub struct List {}

#[async_trait]
impl Command for List {
    async fn run(&self, ctx: &CommandContext<'_>) -> Result<CommandOutput> {
        let api = ctx.api()?;
        let names = pipeline_names(&api.pipeline_groups().await?);
        if names.is_empty() {
            return Ok(CommandOutput::new("No pipelines found", 0));
        }

        let statuses = join_all(names.iter().map(|name| api.pipeline_status(name))).await;

        let mut rows = Vec::with_capacity(names.len());
        for (name, status) in names.into_iter().zip(statuses) {
            match status {
                Ok(status) => rows.push((name, status)),
                Err(e) => {
                    warn!("Status of {name} unavailable: {e}");
                    return Ok(CommandOutput::new(
                        format!("Error getting status for \"{name}\""),
                        3,
                    ));
                }
            }
        }

        Ok(CommandOutput::new(status_table(&rows).to_string(), 0))
    }
}
