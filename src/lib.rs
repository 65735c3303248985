pub mod cli;
pub mod config;
pub mod error;
pub mod office;
pub mod pairing;
pub mod pdf;
pub mod pipeline;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ErrorPolicy, MergeConfig, MergeOrder, OfficeConfig, OutputConfig, ScanConfig};
pub use error::{CombineError, DuplicateGroup, Result, UserFriendlyError};

// Core functionality re-exports
pub use office::{HostLauncher, OfficeLauncher, OfficeSession, SpreadsheetExporter};
pub use pairing::{pair_files, LoneFile, MatchedPair, Pairing};
pub use pdf::{PageRange, PageSelection, PdfPart};
pub use pipeline::{
    AssumeYes, BatchResult, ConfirmationGate, Gate, Mode, Pipeline, RunOutcome, RunPlan, RunReport,
    TerminalGate,
};
pub use scanner::{check_duplicates, DirectoryScanner, FileEntry, FileKind};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager, ProgressObserver};

use std::path::Path;

/// Main library interface: plan a run, then execute it against LibreOffice.
pub struct Combiner {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl Combiner {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// No signal handler, so several instances can coexist.
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = OutputMode::from(cli_args.output_format.clone());

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config.clone(), self.shutdown.clone())
    }

    /// Scan, check for duplicates and pair, then present the result. Read-only.
    pub fn plan(&self, mode: Mode, working_dir: &Path, output_dir: &Path) -> Result<RunPlan> {
        self.output_formatter
            .start_operation(&format!("Scanning {}", working_dir.display()));

        let plan = self.pipeline().plan(mode, working_dir, output_dir)?;
        self.output_formatter.print_plan(&plan);

        Ok(plan)
    }

    /// Run a plan through the gates and the batch, exporting with LibreOffice.
    pub async fn execute(
        &mut self,
        plan: &RunPlan,
        gate: &mut dyn ConfirmationGate,
    ) -> Result<RunOutcome> {
        let launcher = OfficeLauncher::from_config(&self.config.office);
        self.execute_with(plan, &launcher, gate).await
    }

    pub async fn execute_with<L: HostLauncher>(
        &mut self,
        plan: &RunPlan,
        launcher: &L,
        gate: &mut dyn ConfirmationGate,
    ) -> Result<RunOutcome> {
        let pipeline = self.pipeline();
        let outcome = pipeline
            .execute(plan, launcher, gate, &mut self.progress_manager)
            .await?;

        match outcome {
            RunOutcome::Completed(ref report) => {
                self.output_formatter.print_run_report(report);
                if report.batch.has_errors() {
                    self.output_formatter.warning(&format!(
                        "{} item(s) were skipped because they failed",
                        report.batch.errors.len()
                    ));
                }
            }
            RunOutcome::Cancelled { gate } => self.output_formatter.print_cancelled(gate),
        }

        Ok(outcome)
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &CombineError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "xlsx-pdf-combine {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}
