//! Match spreadsheets to documents by root name.
//!
//! Pairing is a partition of the scanned entries: every entry ends up either
//! in exactly one [`MatchedPair`] or as exactly one [`LoneFile`]. Callers run
//! the duplicate check first; with duplicate identities the last entry seen
//! for an identity wins and the rest are dropped.

use crate::scanner::{FileEntry, FileKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedPair {
    pub root_name: String,
    pub spreadsheet: PathBuf,
    pub document: PathBuf,
}

/// An entry with no counterpart of the other kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoneFile(pub FileEntry);

impl LoneFile {
    pub fn entry(&self) -> &FileEntry {
        &self.0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Pairing {
    pub pairs: Vec<MatchedPair>,
    pub lone_files: Vec<LoneFile>,
}

impl Pairing {
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn lone_count(&self) -> usize {
        self.lone_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Default)]
struct Slot {
    spreadsheet: Option<FileEntry>,
    document: Option<FileEntry>,
}

/// Pair entries by root name; pairs and lone files come out in ascending root
/// name order, lone spreadsheets before lone documents of the same name.
pub fn pair_files(entries: &[FileEntry]) -> Pairing {
    let mut slots: BTreeMap<&str, Slot> = BTreeMap::new();

    for entry in entries {
        let slot = slots.entry(entry.root_name.as_str()).or_default();
        match entry.kind {
            FileKind::Spreadsheet => slot.spreadsheet = Some(entry.clone()),
            FileKind::Document => slot.document = Some(entry.clone()),
        }
    }

    let mut pairing = Pairing::default();
    for (root_name, slot) in slots {
        match (slot.spreadsheet, slot.document) {
            (Some(spreadsheet), Some(document)) => pairing.pairs.push(MatchedPair {
                root_name: root_name.to_string(),
                spreadsheet: spreadsheet.path,
                document: document.path,
            }),
            (Some(lone), None) | (None, Some(lone)) => pairing.lone_files.push(LoneFile(lone)),
            (None, None) => {}
        }
    }

    pairing
}
