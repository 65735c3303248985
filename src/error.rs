use std::path::PathBuf;
use thiserror::Error;

/// Files sharing one `(root name, extension)` identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub root_name: String,
    pub extension: String,
    pub paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("Duplicate files found: {}", describe_groups(.groups))]
    DuplicateFiles { groups: Vec<DuplicateGroup> },

    #[error("Cannot access {path}: {message}")]
    Access { path: String, message: String },

    #[error("Failed to convert {path}: {message}")]
    Conversion { path: String, message: String },

    #[error("Office application could not be launched: {program}")]
    HostUnavailable { program: String, message: String },

    #[error("Host application timed out after {seconds} seconds converting {path}")]
    Timeout { path: String, seconds: u64 },

    #[error("PDF operation failed for {path}")]
    Pdf {
        path: String,
        #[source]
        source: lopdf::Error,
    },

    #[error("Invalid page range '{range}': {message}")]
    PageRange { range: String, message: String },

    #[error("Cannot merge zero ({count}) files together")]
    NothingToMerge { count: usize },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Output directory {path} is the working directory")]
    OutputIsWorkingDir { path: String },

    #[error("Terminal prompt failed: {message}")]
    Prompt { message: String },

    #[error("Operation was interrupted")]
    Interrupted,
}

impl CombineError {
    /// Failures confined to one batch item, which the skip policy may step over.
    pub fn is_item_failure(&self) -> bool {
        matches!(
            self,
            CombineError::Conversion { .. }
                | CombineError::Timeout { .. }
                | CombineError::Pdf { .. }
        )
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for CombineError {
    fn user_message(&self) -> String {
        match self {
            CombineError::DuplicateFiles { groups } => {
                let mut message = String::from("Unexpected duplicate files exist under the working directory:");
                for group in groups {
                    message.push_str(&format!("\n  {}.{}:", group.root_name, group.extension));
                    for path in &group.paths {
                        message.push_str(&format!("\n    {}", path.display()));
                    }
                }
                message
            }
            CombineError::Access { path, message } => {
                format!("Cannot access {}: {}", path, message)
            }
            CombineError::Conversion { path, message } => {
                format!("Conversion failed for {}:\n{}", path, message)
            }
            CombineError::HostUnavailable { program, message } => {
                format!("Could not launch '{}': {}", program, message)
            }
            CombineError::Pdf { path, source } => {
                format!("Could not process PDF {}: {}", path, source)
            }
            CombineError::NothingToMerge { count } => {
                format!("Cannot merge zero ({}) files together!", count)
            }
            CombineError::Interrupted => "Operation was interrupted by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            CombineError::DuplicateFiles { .. } => Some(
                "Please remove or rename the listed files, then run again.".to_string()
            ),
            CombineError::Access { .. } => Some(
                "Ensure the directory exists and you have read/write permissions for it.".to_string()
            ),
            CombineError::Conversion { .. } => Some(
                "Open the spreadsheet in the office application to check it is valid, or use --on-error skip to continue past failing files.".to_string()
            ),
            CombineError::HostUnavailable { .. } => Some(
                "Install LibreOffice or point --office-program at the soffice executable.".to_string()
            ),
            CombineError::Timeout { .. } => Some(
                "Increase the conversion timeout with --timeout.".to_string()
            ),
            CombineError::PageRange { .. } => Some(
                "Use slice syntax such as ':3', '3:5', '0' or '-1' (0-based, end exclusive).".to_string()
            ),
            CombineError::NothingToMerge { .. } => Some(
                "Check that the working directory contains matching .xlsx and .pdf files.".to_string()
            ),
            CombineError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            CombineError::OutputIsWorkingDir { .. } => Some(
                "Merged files would replace the source PDFs. Pass a different --output or output.directory_name.".to_string()
            ),
            CombineError::Prompt { .. } => Some(
                "Run from an interactive terminal, or pass --yes and --mode to skip the prompts.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for CombineError {
    fn from(error: toml::de::Error) -> Self {
        CombineError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CombineError>;

fn describe_groups(groups: &[DuplicateGroup]) -> String {
    groups
        .iter()
        .flat_map(|g| g.paths.iter().map(|p| p.display().to_string()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let error = CombineError::NothingToMerge { count: 0 };
        assert!(error.user_message().contains("zero (0)"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_duplicate_message_lists_every_path() {
        let error = CombineError::DuplicateFiles {
            groups: vec![DuplicateGroup {
                root_name: "D".to_string(),
                extension: "pdf".to_string(),
                paths: vec![PathBuf::from("/w/a/D.pdf"), PathBuf::from("/w/b/D.pdf")],
            }],
        };

        let message = error.user_message();
        assert!(message.contains("/w/a/D.pdf"));
        assert!(message.contains("/w/b/D.pdf"));
        assert!(error.to_string().contains("/w/a/D.pdf, /w/b/D.pdf"));
    }

    #[test]
    fn test_item_failures() {
        let conversion = CombineError::Conversion {
            path: "A.xlsx".to_string(),
            message: "exit 1".to_string(),
        };
        assert!(conversion.is_item_failure());
        assert!(!CombineError::Interrupted.is_item_failure());
        assert!(!CombineError::HostUnavailable {
            program: "soffice".to_string(),
            message: "not found".to_string(),
        }
        .is_item_failure());
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_error = toml::from_str::<toml::Value>("= broken").unwrap_err();
        let error = CombineError::from(toml_error);
        assert!(matches!(error, CombineError::Config { .. }));
    }
}
