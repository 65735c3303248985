use crate::config::ScanConfig;
use crate::error::{CombineError, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Spreadsheet,
    Document,
}

impl FileKind {
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Spreadsheet => "xlsx",
            FileKind::Document => "pdf",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "xlsx" => Some(FileKind::Spreadsheet),
            "pdf" => Some(FileKind::Document),
            _ => None,
        }
    }

    pub fn other(&self) -> Self {
        match self {
            FileKind::Spreadsheet => FileKind::Document,
            FileKind::Document => FileKind::Spreadsheet,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub root_name: String,
    pub kind: FileKind,
    pub path: PathBuf,
    pub relative_path: PathBuf,
}

impl FileEntry {
    pub fn new(path: PathBuf, relative_path: PathBuf, kind: FileKind) -> Self {
        let root_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            root_name,
            kind,
            path,
            relative_path,
        }
    }

    /// Build an entry from a path, or `None` when the extension is not one we
    /// handle.
    pub fn from_path(path: &Path, root: &Path) -> Option<Self> {
        let kind = FileKind::from_path(path)?;
        let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        Some(Self::new(path.to_path_buf(), relative_path, kind))
    }

    pub fn identity(&self) -> (&str, FileKind) {
        (&self.root_name, self.kind)
    }

    pub fn display_name(&self) -> String {
        format!("{}.{}", self.root_name, self.kind.extension())
    }
}

pub struct DirectoryScanner {
    recursive: bool,
    max_depth: usize,
    exclude_dirs: Vec<String>,
    exclude_patterns: Vec<Regex>,
    excluded_paths: Vec<PathBuf>,
}

impl DirectoryScanner {
    pub fn new(config: &ScanConfig) -> Self {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();

        Self {
            recursive: config.recursive,
            max_depth: config.max_depth,
            exclude_dirs: config.exclude_dirs.clone(),
            exclude_patterns,
            excluded_paths: Vec::new(),
        }
    }

    /// Never descend into `path`, however it is spelled.
    pub fn with_excluded_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.excluded_paths.push(normalize_path(path.as_ref()));
        self
    }

    pub fn scan_directory<P: AsRef<Path>>(&self, root: P) -> Result<Vec<FileEntry>> {
        let root_path = root.as_ref();

        if !root_path.exists() {
            return Err(CombineError::Access {
                path: root_path.display().to_string(),
                message: "directory does not exist".to_string(),
            });
        }

        if !root_path.is_dir() {
            return Err(CombineError::Access {
                path: root_path.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        let max_depth = if self.recursive { self.max_depth } else { 1 };
        let mut entries = Vec::new();

        let walker = WalkDir::new(root_path)
            .max_depth(max_depth)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| self.should_traverse(e));

        for entry in walker {
            // A skipped entry could hide a duplicate, so any read error is fatal.
            let entry = entry.map_err(|err| CombineError::Access {
                path: err
                    .path()
                    .unwrap_or(root_path)
                    .display()
                    .to_string(),
                message: err.to_string(),
            })?;

            if !entry.file_type().is_file() || is_lock_file(entry.path()) {
                continue;
            }

            if let Some(file_entry) = FileEntry::from_path(entry.path(), root_path) {
                entries.push(file_entry);
            }
        }

        entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        debug!(
            root = %root_path.display(),
            files = entries.len(),
            recursive = self.recursive,
            "scanned working directory"
        );

        Ok(entries)
    }

    fn should_traverse(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }

        let path = entry.path();
        if !self.excluded_paths.is_empty() {
            let normalized = normalize_path(path);
            if self.excluded_paths.contains(&normalized) {
                return false;
            }
        }

        if let Some(dir_name) = path.file_name().and_then(|s| s.to_str()) {
            let dir_name_lower = dir_name.to_lowercase();
            if self
                .exclude_dirs
                .iter()
                .any(|exclude| exclude.to_lowercase() == dir_name_lower)
            {
                return false;
            }
        }

        let path_str = path.to_string_lossy();
        !self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(&path_str))
    }
}

/// Absolute form of `path` without `.` or `..`, with symlinks resolved in
/// the part that exists. The path itself need not exist.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let lexical = lexical_path(path);
    let mut missing = Vec::new();
    let mut existing = lexical.as_path();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }

        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    lexical
}

/// `path` with `.` dropped and `..` applied to the preceding component.
pub fn lexical_path(path: &Path) -> PathBuf {
    let mut lexical = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other.as_os_str()),
        }
    }
    lexical
}

/// Office lock files: `~$Book.xlsx` (Excel) and `.~lock.Book.xlsx#` (LibreOffice).
fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with("~$") || name.starts_with(".~lock."))
}
