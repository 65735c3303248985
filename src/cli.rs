use crate::config::{CliOverrides, Config, ErrorPolicy};
use crate::error::{CombineError, Result};
use crate::pipeline::Mode;
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "xlsx-pdf-combine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert spreadsheets to PDF and merge them with same-named PDFs")]
#[command(
    long_about = "xlsx-pdf-combine finds .xlsx and .pdf files sharing a name under a working \
                  directory, exports each spreadsheet through LibreOffice, and merges selected \
                  pages of both into one PDF per pair. A second mode combines the first page of \
                  every PDF into a single file."
)]
#[command(before_help = "📎 xlsx-pdf-combine - Spreadsheet & PDF Merge Tool")]
#[command(after_help = "EXAMPLES:\n  \
    xlsx-pdf-combine                          # process the parent of the current directory\n  \
    xlsx-pdf-combine --use-root-as-working-dir\n  \
    xlsx-pdf-combine ./reports --mode xlsx-pdf --yes\n  \
    xlsx-pdf-combine ./reports --mode pdf-first-page -o ./combined\n  \
    xlsx-pdf-combine ./reports --dry-run --output-format plain")]
pub struct Cli {
    /// Directory to scan (defaults to the parent of the current directory)
    pub working_dir: Option<PathBuf>,

    /// Use the current directory as the working directory
    #[arg(long, conflicts_with = "working_dir")]
    pub use_root_as_working_dir: bool,

    /// Merge mode (prompted for when omitted)
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    /// Output directory (defaults to <working dir>/output)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Parent directory for temporary exports
    #[arg(long, help = "Directory for temporary files (defaults to the system temp dir)")]
    pub temp_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Office program used to export spreadsheets
    #[arg(long, env = "XLSX_PDF_COMBINE_OFFICE", help = "Path to the soffice executable")]
    pub office_program: Option<PathBuf>,

    /// Conversion timeout in seconds
    #[arg(long, help = "Timeout for each spreadsheet export (seconds)")]
    pub timeout: Option<u64>,

    /// What to do when one item fails
    #[arg(long, value_enum)]
    pub on_error: Option<OnError>,

    /// Only scan the top level of the working directory
    #[arg(long)]
    pub no_recursive: bool,

    /// Answer yes to every prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Do not wait for Enter before exiting
    #[arg(long)]
    pub no_wait: bool,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show the plan without converting or writing anything)
    #[arg(long, help = "Show what would be merged without doing it")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OnError {
    /// Stop the batch at the first failure
    Abort,
    /// Record the failure and continue
    Skip,
}

impl From<OnError> for ErrorPolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Abort => ErrorPolicy::Abort,
            OnError::Skip => ErrorPolicy::Skip,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_office_program(self.office_program.clone())
            .with_timeout(self.timeout)
            .with_on_error(self.on_error.map(ErrorPolicy::from))
            .with_temp_directory(self.temp_dir.clone())
            .with_no_recursive(self.no_recursive)
    }

    /// The directory to scan, made absolute.
    pub fn resolve_working_dir(&self) -> Result<PathBuf> {
        let current_dir = std::env::current_dir()?;

        let dir = match self.working_dir {
            Some(ref dir) => dir.clone(),
            None if self.use_root_as_working_dir => current_dir,
            None => current_dir
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or(current_dir),
        };

        dir.canonicalize().map_err(|e| CombineError::Access {
            path: dir.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn resolve_output_dir(&self, working_dir: &Path, config: &Config) -> Result<PathBuf> {
        match self.output {
            Some(ref output) if output.is_absolute() => Ok(output.clone()),
            Some(ref output) => Ok(std::env::current_dir()?.join(output)),
            None => Ok(working_dir.join(&config.output.directory_name)),
        }
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Whether to pause for Enter before exiting.
    pub fn should_wait(&self, interactive: bool) -> bool {
        interactive && !self.no_wait && !self.yes && !self.generate_config
    }
}
