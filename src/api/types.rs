use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineSnapshot;

/// Pipeline variables passed when scheduling, in the order given.
pub type Variables = IndexMap<String, String>;

/// Current pause/lock state of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub paused: bool,
    pub locked: bool,
    #[serde(default)]
    pub schedulable: bool,
    #[serde(default)]
    pub paused_cause: Option<String>,
    #[serde(default)]
    pub paused_by: Option<String>,
}

/// Response of the pipeline history endpoint, most recent run first.
#[derive(Debug, Deserialize)]
pub(crate) struct History {
    pub pipelines: Vec<PipelineSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineGroup {
    pub name: String,
    #[serde(default)]
    pub pipelines: Vec<PipelineRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineRef {
    pub name: String,
}

/// All pipeline names across groups, in server order.
pub fn pipeline_names(groups: &[PipelineGroup]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|group| group.pipelines.iter().map(|p| p.name.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked,
    /// The server answered 406, the pipeline had no lock to release
    AlreadyUnlocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Accepted(String),
    Rejected { status: u16, message: String },
}

/// Console log of one job in a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConsole {
    pub pipeline: String,
    pub pipeline_counter: u64,
    pub stage: String,
    pub stage_counter: u64,
    pub job: String,
    pub output: String,
}

impl JobConsole {
    pub fn masthead(&self) -> String {
        format!(
            "pipeline=\"{}\", pipeline_counter=\"{}\", stage=\"{}\", stage_counter=\"{}\", job=\"{}\"",
            self.pipeline, self.pipeline_counter, self.stage, self.stage_counter, self.job
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_deserializes_camel_case() {
        let status: PipelineStatus = serde_json::from_str(
            r#"{"pausedCause": "maintenance", "pausedBy": "admin", "paused": true, "schedulable": false, "locked": false}"#,
        )
        .unwrap();

        assert!(status.paused);
        assert!(!status.locked);
        assert_eq!(status.paused_cause.as_deref(), Some("maintenance"));
    }

    #[test]
    fn test_pipeline_names_flatten_groups() {
        let groups: Vec<PipelineGroup> = serde_json::from_str(
            r#"[
                {"name": "first", "pipelines": [{"name": "Build", "label": "${COUNT}"}, {"name": "Deploy"}]},
                {"name": "empty", "pipelines": []},
                {"name": "second", "pipelines": [{"name": "Nightly"}]}
            ]"#,
        )
        .unwrap();

        assert_eq!(pipeline_names(&groups), vec!["Build", "Deploy", "Nightly"]);
    }
}
