use crate::error::{CombineError, DuplicateGroup, Result};
use crate::scanner::FileEntry;
use std::collections::BTreeMap;

/// Fail when two or more entries share a `(root name, extension)` identity
/// anywhere under the scanned tree. Every conflicting path is reported.
pub fn check_duplicates(entries: &[FileEntry]) -> Result<()> {
    let groups = find_duplicates(entries);

    if groups.is_empty() {
        Ok(())
    } else {
        Err(CombineError::DuplicateFiles { groups })
    }
}

pub fn find_duplicates(entries: &[FileEntry]) -> Vec<DuplicateGroup> {
    let mut by_identity: BTreeMap<(&str, _), Vec<&FileEntry>> = BTreeMap::new();
    for entry in entries {
        by_identity.entry(entry.identity()).or_default().push(entry);
    }

    by_identity
        .into_iter()
        .filter(|(_, group)| group.len() > 1)
        .map(|((root_name, kind), group)| {
            let mut paths: Vec<_> = group.into_iter().map(|e| e.path.clone()).collect();
            paths.sort();
            DuplicateGroup {
                root_name: root_name.to_string(),
                extension: kind.extension().to_string(),
                paths,
            }
        })
        .collect()
}
