//! Shared helpers for building and inspecting small test PDFs

#![allow(dead_code, unused_imports)]

use lopdf::{Dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

pub const FOR_PERSONAL_HEX: &str = "<0046006f007200200070006500720073006f006e0061006c002c>";
pub const NON_COMMERCIAL_HEX: &str = concat!(
    "<0020006e006f006e002d0063006f006d006d0065007200630069",
    "0061006c00200075007300650020006f006e006c0079002e>"
);

/// Content stream with a watermark block between two ordinary commands
pub fn watermarked_stream(prefix: &str, payload: &str, suffix: &str) -> Vec<u8> {
    format!("{prefix}\nq 0.000 0.000 0.502 rg BT {payload} Tj ET Q\n{suffix}\n").into_bytes()
}

/// Write a PDF with one single-stream page per entry in `streams`
pub fn write_pdf(path: &Path, streams: &[Vec<u8>]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    let font_id = doc.add_object(font);

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    let resources_id = doc.add_object(resources);

    let mut kids = Vec::new();
    for content in streams {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.clone()));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Resources", Object::Reference(resources_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        );
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).expect("Failed to write test PDF");
}

/// Decoded content of every page, streams concatenated, in page order
pub fn page_contents(path: &Path) -> Vec<Vec<u8>> {
    let doc = Document::load(path).expect("Failed to load PDF");
    doc.get_pages()
        .into_values()
        .map(|page_id| doc.get_page_content(page_id).expect("Failed to read page content"))
        .collect()
}

/// Write an executable `#!/bin/sh` script standing in for an external tool
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to mark script executable");
    path
}
