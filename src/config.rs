use crate::error::{CombineError, Result};
use crate::pdf::{PageRange, PageSelection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub merge: MergeConfig,
    pub office: OfficeConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    pub recursive: bool,
    pub max_depth: usize,
    pub exclude_dirs: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Pages taken from the pre-existing PDF of a pair.
    pub document_pages: PageSelection,
    /// Pages taken from the PDF exported from the spreadsheet.
    pub exported_pages: PageSelection,
    /// Pages taken from each PDF in first-page mode.
    pub first_page_pages: PageSelection,
    pub order: MergeOrder,
    pub output_suffix: String,
    pub on_error: ErrorPolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OfficeConfig {
    pub program: PathBuf,
    pub timeout_secs: u64,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory name, relative to the working directory.
    pub directory_name: String,
    /// Parent of the run's temporary directory. System temp dir when unset.
    pub temp_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeOrder {
    #[default]
    DocumentFirst,
    ExportedFirst,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    #[default]
    Abort,
    Skip,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 32,
            exclude_dirs: vec![
                ".git".to_string(),
                "__pycache__".to_string(),
                "node_modules".to_string(),
            ],
            exclude_patterns: vec![],
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            document_pages: PageSelection::new(vec![PageRange::first(3)]),
            exported_pages: PageSelection::new(vec![PageRange::Slice {
                start: Some(3),
                stop: Some(5),
                step: 1,
            }]),
            first_page_pages: PageSelection::new(vec![PageRange::Single(0)]),
            order: MergeOrder::DocumentFirst,
            output_suffix: String::new(),
            on_error: ErrorPolicy::Abort,
        }
    }
}

impl OfficeConfig {
    /// Limit for one office invocation.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("soffice"),
            timeout_secs: 120,
            extra_args: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory_name: "output".to_string(),
            temp_directory: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CombineError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CombineError::Config {
                message: format!("Failed to read config file {}: {}", path.display(), e),
            })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| CombineError::Config {
                message: format!("Failed to parse config file {}: {}", path.display(), e),
            })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = [
                    "xlsx-pdf-combine.toml",
                    ".xlsx-pdf-combine.toml",
                ];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref program) = cli_args.office_program {
            self.office.program = program.clone();
        }

        if let Some(timeout) = cli_args.timeout {
            self.office.timeout_secs = timeout;
        }

        if let Some(policy) = cli_args.on_error {
            self.merge.on_error = policy;
        }

        if let Some(ref temp_dir) = cli_args.temp_directory {
            self.output.temp_directory = Some(temp_dir.clone());
        }

        if cli_args.no_recursive {
            self.scan.recursive = false;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.max_depth == 0 {
            return Err(CombineError::Config {
                message: "Maximum directory depth must be greater than 0".to_string(),
            });
        }

        if self.office.timeout_secs == 0 {
            return Err(CombineError::Config {
                message: "Conversion timeout must be greater than 0".to_string(),
            });
        }

        if self.office.program.as_os_str().is_empty() {
            return Err(CombineError::Config {
                message: "Office program must not be empty".to_string(),
            });
        }

        if self.output.directory_name.trim().is_empty() {
            return Err(CombineError::Config {
                message: "Output directory name must not be empty".to_string(),
            });
        }

        for pattern in &self.scan.exclude_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(CombineError::Config {
                    message: format!("Invalid exclude pattern '{}': {}", pattern, e),
                });
            }
        }

        Ok(())
    }

    /// Parent directory of the per-run temporary directory.
    pub fn temp_root(&self) -> PathBuf {
        self.output
            .temp_directory
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub office_program: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub on_error: Option<ErrorPolicy>,
    pub temp_directory: Option<PathBuf>,
    pub no_recursive: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_office_program(mut self, program: Option<PathBuf>) -> Self {
        self.office_program = program;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_on_error(mut self, policy: Option<ErrorPolicy>) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_temp_directory(mut self, temp_directory: Option<PathBuf>) -> Self {
        self.temp_directory = temp_directory;
        self
    }

    pub fn with_no_recursive(mut self, no_recursive: bool) -> Self {
        self.no_recursive = no_recursive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.scan.recursive);
        assert_eq!(config.office.timeout_secs, 120);
        assert_eq!(config.merge.order, MergeOrder::DocumentFirst);
        assert_eq!(config.merge.on_error, ErrorPolicy::Abort);
        assert_eq!(config.merge.document_pages.indices(10), vec![0, 1, 2]);
        assert_eq!(config.merge.exported_pages.indices(10), vec![3, 4]);
        assert_eq!(config.merge.first_page_pages.indices(10), vec![0]);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.office.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scan.exclude_patterns.push("(unclosed".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.merge.order = MergeOrder::ExportedFirst;
        config.merge.output_suffix = "_Merged".to_string();
        let temp_file = NamedTempFile::new().unwrap();

        std::fs::write(temp_file.path(), toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.merge.order, MergeOrder::ExportedFirst);
        assert_eq!(loaded_config.merge.output_suffix, "_Merged");
        assert_eq!(loaded_config.merge.exported_pages, config.merge.exported_pages);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [merge]
            document_pages = [":1"]
            on_error = "skip"
            "#,
        )
        .unwrap();

        assert_eq!(config.merge.document_pages.indices(5), vec![0]);
        assert_eq!(config.merge.on_error, ErrorPolicy::Skip);
        assert_eq!(config.office.program, PathBuf::from("soffice"));
        assert_eq!(config.output.directory_name, "output");
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::load_from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(CombineError::Config { .. })));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_timeout(Some(30))
            .with_office_program(Some(PathBuf::from("/opt/office/soffice")))
            .with_on_error(Some(ErrorPolicy::Skip))
            .with_no_recursive(true);

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.office.timeout_secs, 30);
        assert_eq!(config.office.program, PathBuf::from("/opt/office/soffice"));
        assert_eq!(config.merge.on_error, ErrorPolicy::Skip);
        assert!(!config.scan.recursive);
    }

    #[test]
    fn test_office_timeout() {
        let mut config = Config::default();
        config.office.timeout_secs = 45;
        assert_eq!(config.office.timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(!sample.is_empty());
        assert!(sample.contains("[scan]"));
        assert!(sample.contains("[merge]"));
        assert!(sample.contains("[office]"));
        assert!(sample.contains("[output]"));
    }
}
