//! Removal of the plain-text copyright header
//!
//! Once the document's streams are stored uncompressed, the red reprint
//! notice at the top of each page is ordinary PDF string literals. Those
//! fragments are deleted from the raw file bytes, line by line, leaving
//! everything else byte-identical.
//!
//! This relies on the fragments never occurring inside binary stream data
//! at this point in the pipeline. That precondition is carried over, not
//! checked here.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Header fragments as byte regexes. `.` is a single-byte wildcard.
pub const HEADER_FRAGMENTS: &[&str] = &[
    r"For personal,",
    r"non-commercial use only.",
    r"Do not edit, alter or reproduce. For commercial reproduction or distribution, contact Dow Jones Reprints & Licensing at \\\(800\\\) 843-0008 or",
    r"www.djreprints.com",
];

static HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_header_regex(HEADER_FRAGMENTS).expect("built-in header fragments compile")
});

/// Combine fragments into one alternation that never matches across a line
pub fn build_header_regex(fragments: &[&str]) -> Result<Regex> {
    let alternation = fragments.join("|");
    Ok(Regex::new(&format!("(?-u)(?:{})", alternation))?)
}

/// Delete every header fragment from `bytes`
///
/// Returns the new bytes and how many fragments were removed.
pub fn strip_header_text(bytes: &[u8]) -> (Vec<u8>, usize) {
    let removed = HEADER_REGEX.find_iter(bytes).count();
    if removed == 0 {
        return (bytes.to_vec(), 0);
    }
    let cleaned = HEADER_REGEX.replace_all(bytes, &b""[..]).into_owned();
    (cleaned, removed)
}

/// Strip header fragments from an uncompressed PDF file into `output`
pub fn strip_header_file(input: &Path, output: &Path) -> Result<usize> {
    let bytes = std::fs::read(input)?;
    let (cleaned, removed) = strip_header_text(&bytes);
    debug!(removed, input = %input.display(), "header fragments removed");
    std::fs::write(output, cleaned)?;
    Ok(removed)
}
