use std::fmt;
use std::str::FromStr;

use log::info;

use super::snapshot::{PipelineSnapshot, Stage, StageResult};
use crate::api::{GoCdApi, ScheduleOutcome, UnlockOutcome, Variables};
use crate::error::{GoCdError, Result};

/// What gets re-run once a failed stage is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetriggerScope {
    #[default]
    Pipeline,
    Stage,
}

impl FromStr for RetriggerScope {
    type Err = GoCdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pipeline" => Ok(Self::Pipeline),
            "stage" => Ok(Self::Stage),
            _ => Err(GoCdError::AssertionViolation(
                "\"retrigger\" needs to be one of \"pipeline\" or \"stage\"".to_string(),
            )),
        }
    }
}

impl fmt::Display for RetriggerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipeline => f.write_str("pipeline"),
            Self::Stage => f.write_str("stage"),
        }
    }
}

/// First failed stage in execution order, restricted to `target_stage` when given.
pub fn decide<'a>(snapshot: &'a PipelineSnapshot, target_stage: Option<&str>) -> Option<&'a Stage> {
    snapshot.stages.iter().find(|stage| {
        stage.result == StageResult::Failed && target_stage.map_or(true, |t| t == stage.name)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetriggerOutcome {
    /// The whole pipeline was scheduled again
    Pipeline(ScheduleOutcome),
    /// Only the named stage of the given run was re-run
    Stage { counter: u64, stage: String },
}

/// Unlocks the pipeline and retriggers it when the run has a matching failed stage.
///
/// Returns `None` when nothing in the run needs retriggering.
pub async fn retrigger_failed(
    api: &dyn GoCdApi,
    name: &str,
    snapshot: &PipelineSnapshot,
    target_stage: Option<&str>,
    scope: RetriggerScope,
) -> Result<Option<RetriggerOutcome>> {
    let Some(stage) = decide(snapshot, target_stage) else {
        return Ok(None);
    };

    info!(
        "Stage {} of {name}/{} failed, retriggering {scope}",
        stage.name, snapshot.counter
    );

    if api.unlock(name).await? == UnlockOutcome::AlreadyUnlocked {
        info!("Pipeline {name} was already unlocked");
    }

    let outcome = match scope {
        RetriggerScope::Pipeline => RetriggerOutcome::Pipeline(
            api.schedule(name, &Variables::new(), &Variables::new())
                .await?,
        ),
        RetriggerScope::Stage => {
            api.retrigger_stage(name, snapshot.counter, &stage.name)
                .await?;
            RetriggerOutcome::Stage {
                counter: snapshot.counter,
                stage: stage.name.clone(),
            }
        }
    };

    Ok(Some(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(stages: &[(&str, StageResult)]) -> PipelineSnapshot {
        PipelineSnapshot {
            name: "Deploy".to_string(),
            counter: 3,
            stages: stages
                .iter()
                .map(|(name, result)| Stage {
                    name: (*name).to_string(),
                    scheduled: true,
                    result: *result,
                    ..Stage::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_decide_selects_failed_stage() {
        let snap = snapshot(&[("build", StageResult::Failed), ("deploy", StageResult::Unknown)]);

        assert_eq!(decide(&snap, None).map(|s| s.name.as_str()), Some("build"));
    }

    #[test]
    fn test_decide_with_non_failed_target_is_none() {
        let snap = snapshot(&[("build", StageResult::Failed), ("deploy", StageResult::Unknown)]);

        assert!(decide(&snap, Some("deploy")).is_none());
    }

    #[test]
    fn test_decide_picks_earliest_failure() {
        let snap = snapshot(&[
            ("build", StageResult::Passed),
            ("test", StageResult::Failed),
            ("deploy", StageResult::Failed),
        ]);

        assert_eq!(decide(&snap, None).map(|s| s.name.as_str()), Some("test"));
        assert_eq!(
            decide(&snap, Some("deploy")).map(|s| s.name.as_str()),
            Some("deploy")
        );
    }

    #[test]
    fn test_decide_on_passing_run_is_none() {
        let snap = snapshot(&[("build", StageResult::Passed)]);

        assert!(decide(&snap, None).is_none());
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("pipeline".parse::<RetriggerScope>().unwrap(), RetriggerScope::Pipeline);
        assert_eq!("stage".parse::<RetriggerScope>().unwrap(), RetriggerScope::Stage);
        assert!(matches!(
            "job".parse::<RetriggerScope>(),
            Err(GoCdError::AssertionViolation(_))
        ));
    }
}
