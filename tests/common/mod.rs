#![allow(dead_code)]

use anyhow::Result;
use lopdf::{dictionary, Document, Object, Stream};
use std::fs;
use std::path::Path;

/// Write a PDF whose page `i` is `tag * 100 + i` points wide, so merged page
/// order can be read back with [`page_widths`].
pub fn write_pdf(path: &Path, pages: usize, tag: i64) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for index in 0..pages {
        let content = format!("BT /F1 18 Tf 72 720 Td (page {}) Tj ET", index);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(tag * 100 + index as i64),
                Object::Integer(842),
            ],
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path)?;
    Ok(())
}

pub fn page_widths(path: &Path) -> Result<Vec<i64>> {
    let doc = Document::load(path)?;
    let mut widths = Vec::new();
    for id in doc.get_pages().into_values() {
        let page = doc.get_object(id)?.as_dict()?;
        widths.push(page.get(b"MediaBox")?.as_array()?[2].as_i64()?);
    }
    Ok(widths)
}

pub fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"")?;
    Ok(())
}
