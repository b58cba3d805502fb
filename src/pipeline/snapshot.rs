use serde::{Deserialize, Deserializer, Serialize};

/// A single run of a pipeline as reported by the GoCD server.
///
/// Stages are kept in pipeline order, which is also execution order.
/// Stages further down the pipeline that have not been reached yet are
/// present with `scheduled == false` and carry no meaningful jobs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    /// Pipeline name
    #[serde(default)]
    pub name: String,
    /// Run counter, increasing with every scheduled run
    #[serde(default, deserialize_with = "counter_from_any")]
    pub counter: u64,
    /// Stages in execution order
    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// A named phase of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    /// Stage re-run counter within the pipeline run (GoCD sends it as a string)
    #[serde(default, deserialize_with = "counter_from_any")]
    pub counter: u64,
    /// Whether the stage has been dispatched at all
    #[serde(default)]
    pub scheduled: bool,
    #[serde(default)]
    pub result: StageResult,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StageResult {
    Passed,
    Failed,
    Cancelled,
    /// Still in flight or not yet evaluated
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: JobState,
    /// Epoch milliseconds when the job was dispatched
    #[serde(default)]
    pub scheduled_date: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobState {
    Scheduled,
    Assigned,
    Preparing,
    Building,
    Completing,
    Completed,
    Passed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl JobState {
    /// States in which a job isn't doing anything more.
    pub fn is_final(self) -> bool {
        matches!(self, Self::Passed | Self::Failed)
    }
}

impl StageResult {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Cancelled)
    }
}

impl Stage {
    /// Earliest `scheduled_date` among the stage's jobs.
    pub fn earliest_scheduled(&self) -> Option<i64> {
        self.jobs.iter().map(|job| job.scheduled_date).min()
    }

    /// True when at least one job is still doing work.
    pub fn has_running_jobs(&self) -> bool {
        self.jobs.iter().any(|job| !job.state.is_final())
    }
}

impl PipelineSnapshot {
    /// True once no stage will make further progress on its own.
    ///
    /// Every scheduled stage must have a final result. Unscheduled stages
    /// only count as finished when an earlier stage failed or was cancelled,
    /// since GoCD never dispatches them after that.
    pub fn stages_finished(&self) -> bool {
        let scheduled_final = self
            .stages
            .iter()
            .filter(|stage| stage.scheduled)
            .all(|stage| stage.result.is_final());
        let halted = self
            .stages
            .iter()
            .any(|stage| matches!(stage.result, StageResult::Failed | StageResult::Cancelled));

        scheduled_final && (halted || self.stages.iter().all(|stage| stage.result.is_final()))
    }

    pub fn run_successful(&self) -> bool {
        !self
            .stages
            .iter()
            .any(|stage| stage.result == StageResult::Failed)
    }
}

fn counter_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Counter {
        Number(u64),
        Text(String),
    }

    match Counter::deserialize(deserializer)? {
        Counter::Number(n) => Ok(n),
        Counter::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
