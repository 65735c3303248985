use crate::error::{CombineError, Result};
use crate::pdf::page_range::PageSelection;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashSet};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Object types rebuilt by the merger instead of copied from the sources.
const STRUCTURAL: [&[u8]; 5] = [b"Catalog", b"Pages", b"Page", b"Outlines", b"Outline"];

/// One input of a merge: a document and the pages to take from it.
#[derive(Debug, Clone)]
pub struct PdfPart {
    pub path: PathBuf,
    pub pages: PageSelection,
}

impl PdfPart {
    pub fn new<P: Into<PathBuf>>(path: P, pages: PageSelection) -> Self {
        Self {
            path: path.into(),
            pages,
        }
    }

    pub fn whole<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(path, PageSelection::all())
    }
}

/// Pages selected from a loaded document, with inherited attributes resolved.
pub struct ExtractedPages {
    document: Document,
    indices: Vec<usize>,
    source: PathBuf,
}

impl ExtractedPages {
    pub fn page_count(&self) -> usize {
        self.indices.len()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub pages: usize,
    pub sources: usize,
}

pub fn load_document(path: &Path) -> Result<Document> {
    Document::load(path).map_err(|source| CombineError::Pdf {
        path: path.display().to_string(),
        source,
    })
}

pub fn page_count(path: &Path) -> Result<usize> {
    Ok(load_document(path)?.get_pages().len())
}

/// Select pages from the document at `path`.
pub fn extract(path: &Path, selection: &PageSelection) -> Result<ExtractedPages> {
    let mut document = load_document(path)?;
    let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
    let indices = selection.indices(page_ids.len());

    if indices.is_empty() {
        warn!(
            path = %path.display(),
            pages = page_ids.len(),
            selection = %selection,
            "page selection matched no pages"
        );
    }

    for index in &indices {
        inherit_page_attributes(&mut document, page_ids[*index]);
    }

    debug!(path = %path.display(), selected = indices.len(), "extracted pages");

    Ok(ExtractedPages {
        document,
        indices,
        source: path.to_path_buf(),
    })
}

/// Concatenate extracted pages, in order, into a new document.
pub fn merge(parts: Vec<ExtractedPages>) -> Result<Document> {
    let mut merged = Document::with_version("1.5");
    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for part in parts {
        let ExtractedPages {
            mut document,
            indices,
            source,
        } = part;

        document.renumber_objects_with(next_id);
        next_id = document.max_id + 1;

        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        for index in indices {
            let page_id = page_ids[index];
            let page = document
                .get_object(page_id)
                .and_then(Object::as_dict)
                .map_err(|source_err| CombineError::Pdf {
                    path: source.display().to_string(),
                    source: source_err,
                })?;
            pages.push((page_id, page.clone()));
        }

        objects.extend(document.objects);
    }

    for (object_id, object) in objects {
        if !is_structural(&object) {
            merged.objects.insert(object_id, object);
        }
    }
    merged.max_id = merged
        .objects
        .keys()
        .map(|(id, _)| *id)
        .max()
        .unwrap_or(0)
        .max(next_id);

    let pages_id = merged.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    let mut placed: HashSet<ObjectId> = HashSet::new();

    for (page_id, mut page) in pages {
        page.set("Parent", Object::Reference(pages_id));

        // A page repeated by overlapping ranges gets its own object.
        let id = if placed.insert(page_id) {
            merged.objects.insert(page_id, Object::Dictionary(page));
            page_id
        } else {
            merged.add_object(Object::Dictionary(page))
        };
        kids.push(Object::Reference(id));
    }

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(kids.len() as i64));
    pages_dict.set("Kids", Object::Array(kids));
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = merged.add_object(Object::Dictionary(catalog));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    merged.prune_objects();
    merged.renumber_objects();
    merged.compress();

    Ok(merged)
}

/// Extract every part, merge in order and write the result to `output`.
pub fn combine(parts: &[PdfPart], output: &Path) -> Result<MergeSummary> {
    if parts.is_empty() {
        return Err(CombineError::NothingToMerge { count: 0 });
    }

    let extracted = parts
        .iter()
        .map(|part| extract(&part.path, &part.pages))
        .collect::<Result<Vec<_>>>()?;
    let pages = extracted.iter().map(ExtractedPages::page_count).sum();

    let mut document = merge(extracted)?;
    save_atomically(&mut document, output)?;

    debug!(output = %output.display(), pages, sources = parts.len(), "wrote merged document");

    Ok(MergeSummary {
        pages,
        sources: parts.len(),
    })
}

/// Write through a temporary file in the destination directory so a failed
/// write never leaves a partial document at `output`.
pub fn save_atomically(document: &mut Document, output: &Path) -> Result<()> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| CombineError::Access {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        document
            .save_to(&mut writer)
            .map_err(|e| CombineError::Access {
                path: output.display().to_string(),
                message: e.to_string(),
            })?;
        writer.flush()?;
    }

    temp.persist(output).map_err(|e| CombineError::Io(e.error))?;
    Ok(())
}

fn is_structural(object: &Object) -> bool {
    object
        .as_dict()
        .and_then(|dict| dict.get(b"Type"))
        .and_then(Object::as_name)
        .map(|name| STRUCTURAL.iter().any(|t| *t == name))
        .unwrap_or(false)
}

/// Copy attributes a page inherits from its page-tree ancestors onto the page,
/// since the ancestors are replaced when the page is merged.
fn inherit_page_attributes(document: &mut Document, page_id: ObjectId) {
    let mut inherited: Vec<(Vec<u8>, Object)> = Vec::new();

    {
        let Ok(page) = document.get_object(page_id).and_then(Object::as_dict) else {
            return;
        };

        let mut missing: Vec<&[u8]> = INHERITABLE
            .iter()
            .copied()
            .filter(|key| !page.has(key))
            .collect();
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;

        while let Some(parent_id) = parent {
            if missing.is_empty() || depth > 64 {
                break;
            }

            let Ok(node) = document.get_object(parent_id).and_then(Object::as_dict) else {
                break;
            };

            missing.retain(|key| match node.get(key) {
                Ok(value) => {
                    inherited.push((key.to_vec(), value.clone()));
                    false
                }
                Err(_) => true,
            });

            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }
    }

    if inherited.is_empty() {
        return;
    }

    if let Ok(page) = document.get_object_mut(page_id).and_then(Object::as_dict_mut) {
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{page_widths, write_sample_pdf};
    use crate::pdf::page_range::PageRange;
    use tempfile::TempDir;

    #[test]
    fn test_page_count() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("five.pdf");
        write_sample_pdf(&path, 5, 1).unwrap();

        assert_eq!(page_count(&path).unwrap(), 5);
    }

    #[test]
    fn test_extract_selects_requested_pages() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.pdf");
        write_sample_pdf(&path, 6, 1).unwrap();

        let extracted = extract(&path, &PageSelection::new(vec![PageRange::first(3)])).unwrap();
        assert_eq!(extracted.page_count(), 3);
        assert_eq!(extracted.source(), path.as_path());
    }

    #[test]
    fn test_combine_preserves_part_order() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.pdf");
        let second = temp_dir.path().join("second.pdf");
        let output = temp_dir.path().join("out.pdf");
        write_sample_pdf(&first, 4, 1).unwrap();
        write_sample_pdf(&second, 3, 2).unwrap();

        let parts = vec![
            PdfPart::new(&second, PageSelection::parse_list(&["-1"]).unwrap()),
            PdfPart::new(&first, PageSelection::parse_list(&[":2"]).unwrap()),
        ];

        let summary = combine(&parts, &output).unwrap();
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.sources, 2);
        assert_eq!(page_widths(&output).unwrap(), vec![202, 100, 101]);
    }

    #[test]
    fn test_merged_pages_keep_inherited_resources() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.pdf");
        let output = temp_dir.path().join("out.pdf");
        write_sample_pdf(&input, 2, 1).unwrap();

        combine(&[PdfPart::whole(&input)], &output).unwrap();

        let document = Document::load(&output).unwrap();
        for page_id in document.get_pages().into_values() {
            let page = document.get_object(page_id).and_then(Object::as_dict).unwrap();
            assert!(page.has(b"Resources"));
        }
    }

    #[test]
    fn test_repeated_page_is_duplicated() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.pdf");
        let output = temp_dir.path().join("out.pdf");
        write_sample_pdf(&input, 2, 3).unwrap();

        let selection = PageSelection::parse_list(&["0", "0"]).unwrap();
        let summary = combine(&[PdfPart::new(&input, selection)], &output).unwrap();

        assert_eq!(summary.pages, 2);
        assert_eq!(page_widths(&output).unwrap(), vec![300, 300]);
    }

    #[test]
    fn test_combine_without_parts_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = combine(&[], &temp_dir.path().join("out.pdf"));
        assert!(matches!(result, Err(CombineError::NothingToMerge { count: 0 })));
    }

    #[test]
    fn test_invalid_pdf_names_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        match page_count(&path) {
            Err(CombineError::Pdf { path: reported, .. }) => {
                assert!(reported.ends_with("broken.pdf"))
            }
            other => panic!("expected PDF error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_failed_merge_leaves_no_output() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.pdf");
        let missing = temp_dir.path().join("missing.pdf");
        let output = temp_dir.path().join("out.pdf");
        write_sample_pdf(&good, 1, 1).unwrap();

        let result = combine(&[PdfPart::whole(&good), PdfPart::whole(&missing)], &output);
        assert!(result.is_err());
        assert!(!output.exists());
    }
}
