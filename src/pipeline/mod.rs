//! The batch pipeline: plan a run from a scan, pass the confirmation gates,
//! then convert and merge each item and optionally combine the outputs.

pub mod gate;
pub mod plan;
pub mod report;
pub mod runner;

pub use gate::{AssumeYes, ConfirmationGate, Gate, TerminalGate};
pub use plan::{OutputDirState, RunPlan};
pub use report::{BatchResult, ItemError, ItemOutput, RunOutcome, RunReport};
pub use runner::Pipeline;

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Export each spreadsheet and merge it with its same-named PDF.
    #[default]
    XlsxPdf,
    /// Combine the first page of every PDF into one file.
    PdfFirstPage,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::XlsxPdf, Mode::PdfFirstPage];

    pub fn description(&self) -> &'static str {
        match self {
            Mode::XlsxPdf => "xlsx & pdf combine",
            Mode::PdfFirstPage => "pdf 1st-page combine",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
