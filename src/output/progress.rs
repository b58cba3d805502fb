use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{failed, passed, pending};
use crate::pipeline::PipelineSnapshot;

/// Spinner shown on stderr while waiting for a triggered run to finish.
pub struct WaitProgress {
    pb: ProgressBar,
    name: String,
}

impl WaitProgress {
    pub fn start(name: &str) -> Self {
        let pb = create_spinner(pending(format!("Waiting for {name} to be scheduled")).to_string());
        Self {
            pb,
            name: name.to_string(),
        }
    }

    pub fn update(&self, run: &PipelineSnapshot) {
        let finished = run
            .stages
            .iter()
            .filter(|stage| stage.result.is_final())
            .count();

        self.pb.set_message(
            pending(format!(
                "Waiting for {}/{} ({finished}/{} stages finished)",
                self.name,
                run.counter,
                run.stages.len()
            ))
            .to_string(),
        );
    }

    pub fn finish(self, run: &PipelineSnapshot) {
        let message = if run.run_successful() {
            passed(format!("{}/{} passed ✓", self.name, run.counter))
        } else {
            failed(format!("{}/{} failed ✗", self.name, run.counter))
        };
        self.pb.finish_with_message(message.to_string());
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
