use crate::config::Config;
use crate::error::{CombineError, Result};
use crate::pairing::{pair_files, Pairing};
use crate::pipeline::Mode;
use crate::scanner::{check_duplicates, lexical_path, normalize_path, DirectoryScanner, FileEntry, FileKind};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputDirState {
    Missing,
    Empty,
    NotEmpty,
}

impl OutputDirState {
    pub fn inspect(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(OutputDirState::Missing);
        }

        if !path.is_dir() {
            return Err(CombineError::Access {
                path: path.display().to_string(),
                message: "exists but is not a directory".to_string(),
            });
        }

        let mut entries = fs::read_dir(path).map_err(|e| CombineError::Access {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(if entries.next().is_some() {
            OutputDirState::NotEmpty
        } else {
            OutputDirState::Empty
        })
    }
}

/// Everything a run will do, computed from a fresh scan before any gate.
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub mode: Mode,
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
    pub temp_root: PathBuf,
    pub output_state: OutputDirState,
    pub pairing: Pairing,
    /// Every scanned PDF in ascending root-name order.
    pub documents: Vec<FileEntry>,
}

impl RunPlan {
    /// Scan `working_dir`, reject duplicates and pair what remains. Read-only.
    ///
    /// First-page runs never read spreadsheets, so only duplicate PDFs stop them.
    pub fn build(config: &Config, mode: Mode, working_dir: &Path, output_dir: &Path) -> Result<Self> {
        if normalize_path(output_dir) == normalize_path(working_dir) {
            return Err(CombineError::OutputIsWorkingDir {
                path: output_dir.display().to_string(),
            });
        }

        let output_dir = lexical_path(output_dir);
        let scanner = DirectoryScanner::new(&config.scan).with_excluded_path(&output_dir);
        let entries = scanner.scan_directory(working_dir)?;

        let mut documents: Vec<FileEntry> = entries
            .iter()
            .filter(|entry| entry.kind == FileKind::Document)
            .cloned()
            .collect();
        documents.sort_by(|a, b| a.root_name.cmp(&b.root_name));

        match mode {
            Mode::XlsxPdf => check_duplicates(&entries)?,
            Mode::PdfFirstPage => check_duplicates(&documents)?,
        }

        let pairing = pair_files(&entries);

        let plan = Self {
            mode,
            working_dir: working_dir.to_path_buf(),
            output_state: OutputDirState::inspect(&output_dir)?,
            output_dir,
            temp_root: config.temp_root(),
            pairing,
            documents,
        };

        info!(
            mode = %plan.mode,
            pairs = plan.pairing.pair_count(),
            lone = plan.pairing.lone_count(),
            documents = plan.documents.len(),
            "planned run"
        );

        Ok(plan)
    }

    /// Number of items the batch will process in this mode.
    pub fn item_count(&self) -> usize {
        match self.mode {
            Mode::XlsxPdf => self.pairing.pair_count(),
            Mode::PdfFirstPage => self.documents.len(),
        }
    }

    pub fn output_path(&self, root_name: &str, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}.pdf", root_name, suffix))
    }

    pub fn combined_output_path(&self, count: usize) -> PathBuf {
        self.output_dir.join(format!("Combined_1-{}.pdf", count))
    }
}
