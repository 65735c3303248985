use crate::error::{CombineError, Result};
use crate::pipeline::Mode;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Select};
use serde::Serialize;
use std::fmt;

/// Points in a run where the operator must agree before it continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gate {
    Summary,
    OverwriteOutput,
    Start,
    FinalMerge,
}

impl Gate {
    /// Answer used when the operator just presses Enter.
    pub fn default_answer(&self) -> bool {
        !matches!(self, Gate::OverwriteOutput)
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Gate::Summary => "summary",
            Gate::OverwriteOutput => "overwrite output",
            Gate::Start => "start",
            Gate::FinalMerge => "final merge",
        };
        f.write_str(name)
    }
}

pub trait ConfirmationGate {
    fn confirm(&mut self, gate: Gate, prompt: &str) -> Result<bool>;

    fn select_mode(&mut self) -> Result<Mode>;
}

/// Interactive prompts on the controlling terminal.
pub struct TerminalGate {
    theme: ColorfulTheme,
}

impl TerminalGate {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationGate for TerminalGate {
    fn confirm(&mut self, gate: Gate, prompt: &str) -> Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(gate.default_answer())
            .interact()
            .map_err(|e| CombineError::Prompt {
                message: e.to_string(),
            })
    }

    fn select_mode(&mut self) -> Result<Mode> {
        let labels: Vec<&str> = Mode::ALL.iter().map(Mode::description).collect();
        let index = Select::with_theme(&self.theme)
            .with_prompt("Choose a mode")
            .items(&labels)
            .default(0)
            .interact()
            .map_err(|e| CombineError::Prompt {
                message: e.to_string(),
            })?;

        Ok(Mode::ALL[index])
    }
}

/// Answers yes to every gate (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl ConfirmationGate for AssumeYes {
    fn confirm(&mut self, _gate: Gate, _prompt: &str) -> Result<bool> {
        Ok(true)
    }

    fn select_mode(&mut self) -> Result<Mode> {
        Ok(Mode::default())
    }
}
