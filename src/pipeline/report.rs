use crate::pipeline::{Gate, Mode, RunPlan};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// One written output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemOutput {
    pub root_name: String,
    pub path: PathBuf,
    pub pages: usize,
}

/// An item skipped under the skip policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub root_name: String,
    pub message: String,
}

/// Per-item results of one batch, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub outputs: Vec<ItemOutput>,
    pub errors: Vec<ItemError>,
}

impl BatchResult {
    pub fn total_pages(&self) -> usize {
        self.outputs.iter().map(|o| o.pages).sum()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(flatten)]
    pub batch: BatchResult,
    pub combined: Option<ItemOutput>,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn new(plan: &RunPlan, batch: BatchResult, combined: Option<ItemOutput>, elapsed: Duration) -> Self {
        Self {
            mode: plan.mode,
            working_dir: plan.working_dir.clone(),
            output_dir: plan.output_dir.clone(),
            batch,
            combined,
            elapsed_ms: elapsed.as_millis() as u64,
            finished_at: Utc::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunReport),
    Cancelled { gate: Gate },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}
