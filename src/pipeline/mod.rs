mod alert;
mod evaluator;
mod retrigger;
pub(crate) mod snapshot;
mod time_window;

pub use alert::{AlertResult, AlertStatus};
pub use evaluator::{
    EvaluationContext, PipelineEvaluator, RunTimeThresholds, DEFAULT_CRIT_RUN_TIME,
    DEFAULT_WARN_RUN_TIME,
};
pub use retrigger::{retrigger_failed, RetriggerOutcome, RetriggerScope};
pub use snapshot::PipelineSnapshot;
pub use time_window::{resolve, TimeOfDay};
