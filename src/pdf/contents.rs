//! Page content streams: lookup, rewrite and the document-wide watermark pass

use lopdf::{Document, Object, ObjectId};
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::pdf::watermark::WatermarkStripper;

/// How a page refers to its drawing commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContents {
    /// No `/Contents` entry
    Empty,
    /// A single content stream
    Single(ObjectId),
    /// Streams whose concatenation forms the page
    Sequence(Vec<ObjectId>),
}

impl PageContents {
    /// Stream object IDs in drawing order
    pub fn stream_ids(&self) -> Vec<ObjectId> {
        match self {
            PageContents::Empty => Vec::new(),
            PageContents::Single(id) => vec![*id],
            PageContents::Sequence(ids) => ids.clone(),
        }
    }
}

/// Counts from one pass over a document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StripSummary {
    /// Pages visited
    pub pages: usize,
    /// Content streams read
    pub streams_scanned: usize,
    /// Content streams written back
    pub streams_modified: usize,
    /// Watermark blocks removed across all streams
    pub blocks_removed: usize,
}

/// Read a page's `/Contents` entry
pub fn page_contents(doc: &Document, page_id: ObjectId) -> Result<PageContents> {
    let page_dict = doc.get_dictionary(page_id)?;

    let contents = match page_dict.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(PageContents::Empty),
    };

    Ok(match contents {
        Object::Reference(id) => PageContents::Single(*id),
        Object::Array(arr) => {
            let ids: Vec<ObjectId> = arr
                .iter()
                .filter_map(|obj| {
                    if let Object::Reference(id) = obj {
                        Some(*id)
                    } else {
                        None
                    }
                })
                .collect();
            if ids.is_empty() {
                PageContents::Empty
            } else {
                PageContents::Sequence(ids)
            }
        }
        _ => PageContents::Empty,
    })
}

/// Raw (decoded) bytes of a content stream
pub fn read_stream(doc: &Document, stream_id: ObjectId) -> Result<Vec<u8>> {
    let stream = doc.get_object(stream_id)?.as_stream()?;
    if stream.dict.has(b"Filter") {
        Ok(stream.decompressed_content()?)
    } else {
        Ok(stream.content.clone())
    }
}

/// Replace a content stream's bytes, stored unfiltered
pub fn write_stream(doc: &mut Document, stream_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let stream = doc.get_object_mut(stream_id)?.as_stream_mut()?;
    stream.set_plain_content(content);
    Ok(())
}

/// Strip watermarks from every content stream of every page
///
/// A stream shared by several pages is cleaned on first visit and counted
/// once, since later visits find nothing left to remove.
pub fn strip_document(doc: &mut Document, stripper: &WatermarkStripper) -> Result<StripSummary> {
    let mut summary = StripSummary::default();

    for (page_num, page_id) in doc.get_pages() {
        summary.pages += 1;

        for stream_id in page_contents(doc, page_id)?.stream_ids() {
            let data = read_stream(doc, stream_id)?;
            summary.streams_scanned += 1;

            let result = stripper.strip(&data);
            if result.changed {
                debug!(
                    page = page_num,
                    stream = ?stream_id,
                    blocks = result.blocks_removed,
                    "removed watermark"
                );
                write_stream(doc, stream_id, result.cleaned)?;
                summary.streams_modified += 1;
                summary.blocks_removed += result.blocks_removed;
            }
        }
    }

    Ok(summary)
}

/// Load a PDF, strip its watermarks and save the result to `output`
pub fn strip_pdf_file(
    input: &Path,
    output: &Path,
    stripper: &WatermarkStripper,
) -> Result<StripSummary> {
    let mut doc = Document::load(input)?;
    let summary = strip_document(&mut doc, stripper)?;
    doc.save(output)?;
    Ok(summary)
}
