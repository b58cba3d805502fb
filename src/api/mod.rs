mod client;
pub(crate) mod types;

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::PipelineSnapshot;

pub use client::GoCdClient;
pub use types::{
    pipeline_names, JobConsole, PipelineGroup, PipelineStatus, ScheduleOutcome, UnlockOutcome,
    Variables,
};

/// Operations the commands need from a GoCD server.
#[async_trait]
pub trait GoCdApi: Send + Sync {
    async fn pipeline_status(&self, name: &str) -> Result<PipelineStatus>;

    /// Runs of the pipeline, most recent first.
    async fn history(&self, name: &str) -> Result<Vec<PipelineSnapshot>>;

    async fn instance(&self, name: &str, counter: u64) -> Result<PipelineSnapshot>;

    /// The most recent run, `None` when the pipeline has never been scheduled.
    async fn latest_instance(&self, name: &str) -> Result<Option<PipelineSnapshot>> {
        Ok(self.history(name).await?.into_iter().next())
    }

    async fn unlock(&self, name: &str) -> Result<UnlockOutcome>;

    async fn schedule(
        &self,
        name: &str,
        variables: &Variables,
        secure_variables: &Variables,
    ) -> Result<ScheduleOutcome>;

    async fn retrigger_stage(&self, name: &str, counter: u64, stage: &str) -> Result<()>;

    async fn pause(&self, name: &str, cause: &str) -> Result<()>;

    async fn unpause(&self, name: &str) -> Result<()>;

    async fn pipeline_groups(&self) -> Result<Vec<PipelineGroup>>;

    /// Console logs for every job of every scheduled stage in the run.
    async fn console_output(
        &self,
        name: &str,
        snapshot: &PipelineSnapshot,
    ) -> Result<Vec<JobConsole>>;
}
