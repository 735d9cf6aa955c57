//! Watermark excision on raw content stream bytes
//!
//! The diagonal watermark on each page is drawn as a small, self-contained
//! block of content stream operators:
//!
//! ```text
//! q 0.000 0.000 0.502 rg BT ... <0046006f0072...> ... Tj ET Q
//! ```
//!
//! The text is stored as a UTF-16BE hex string, so it never shows up as
//! readable text. Each known fragment is described by a [`WatermarkPattern`]
//! and matched by its exact encoded bytes, anchored by the fill color and the
//! surrounding `q`/`BT`/`Tj`/`ET`/`Q` operators. A block is removed whole,
//! including its trailing line terminator, or not at all.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::fmt::Write as _;
use tracing::trace;

use crate::error::Result;

/// Fill color (dark blue) used for the watermark text
pub const WATERMARK_FILL_COLOR: [&str; 3] = ["0.000", "0.000", "0.502"];

/// A known watermark text fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkPattern {
    /// Short name used in logs
    pub name: &'static str,
    /// RGB components exactly as written before the `rg` operator
    pub fill_color: [&'static str; 3],
    /// Hex string operand, angle brackets included
    pub payload: &'static [u8],
}

/// "For personal,"
pub const FOR_PERSONAL: WatermarkPattern = WatermarkPattern {
    name: "for-personal",
    fill_color: WATERMARK_FILL_COLOR,
    payload: b"<0046006f007200200070006500720073006f006e0061006c002c>",
};

/// " non-commercial use only."
pub const NON_COMMERCIAL: WatermarkPattern = WatermarkPattern {
    name: "non-commercial",
    fill_color: WATERMARK_FILL_COLOR,
    payload: b"<0020006e006f006e002d0063006f006d006d00650072006300690061006c00200075007300650020006f006e006c0079002e>",
};

/// Built-in watermark table, applied in this order
pub static WATERMARK_PATTERNS: &[WatermarkPattern] = &[FOR_PERSONAL, NON_COMMERCIAL];

static DEFAULT_STRIPPER: Lazy<WatermarkStripper> = Lazy::new(WatermarkStripper::default);

/// Encode text as a PDF hex string operand in UTF-16BE
///
/// `encode_payload("Fo")` gives `<0046006f>`.
pub fn encode_payload(text: &str) -> Vec<u8> {
    let mut hex = String::with_capacity(2 + text.len() * 4);
    hex.push('<');
    for unit in text.encode_utf16() {
        let _ = write!(hex, "{:04x}", unit);
    }
    hex.push('>');
    hex.into_bytes()
}

/// Escape arbitrary bytes for use in a non-Unicode byte regex
fn escape_bytes(bytes: &[u8]) -> String {
    let mut escaped = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        if b.is_ascii_alphanumeric() {
            escaped.push(b as char);
        } else {
            let _ = write!(escaped, r"\x{:02X}", b);
        }
    }
    escaped
}

/// Lazy span inside one line that never contains an `ET` operator
///
/// Keeps a match from starting in an earlier text object on the same line.
const WITHIN_TEXT_OBJECT: &str = r"(?:[^E\n]|E+[^ET\n])*?E*";

impl WatermarkPattern {
    /// Build the regex matching one complete watermark block
    ///
    /// The spans around the payload stay on one line and inside a single
    /// `BT`/`ET` text object. Trailing whitespace is consumed through the
    /// last line terminator after `Q`.
    pub fn block_regex(&self) -> Result<Regex> {
        let [r, g, b] = self.fill_color;
        let pattern = format!(
            r"(?-u)\bq\s+{r}\s+{g}\s+{b}\s+rg\s+BT{span}{payload}{span}Tj\s+ET\s+Q\s*\r?\n",
            r = escape_bytes(r.as_bytes()),
            g = escape_bytes(g.as_bytes()),
            b = escape_bytes(b.as_bytes()),
            payload = escape_bytes(self.payload),
            span = WITHIN_TEXT_OBJECT,
        );
        Ok(Regex::new(&pattern)?)
    }
}

/// Outcome of stripping one content stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalResult {
    /// Stream bytes with every matched block removed
    pub cleaned: Vec<u8>,
    /// Whether anything was removed
    pub changed: bool,
    /// Number of watermark blocks removed
    pub blocks_removed: usize,
}

#[derive(Debug)]
struct Rule {
    name: &'static str,
    regex: Regex,
}

/// Compiled watermark table
#[derive(Debug)]
pub struct WatermarkStripper {
    rules: Vec<Rule>,
}

impl WatermarkStripper {
    /// Compile a pattern table; patterns are applied in slice order
    pub fn new(patterns: &[WatermarkPattern]) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| {
                Ok(Rule {
                    name: p.name,
                    regex: p.block_regex()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Names of the compiled patterns, in application order
    pub fn pattern_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name)
    }

    /// Remove every watermark block from `buffer`
    ///
    /// Each pattern runs over the output of the previous one. Never fails;
    /// a buffer without matches comes back byte-identical.
    pub fn strip(&self, buffer: &[u8]) -> RemovalResult {
        let mut cleaned: Option<Vec<u8>> = None;
        let mut blocks_removed = 0;

        for rule in &self.rules {
            let current = cleaned.as_deref().unwrap_or(buffer);
            if let Some((next, count)) = excise(&rule.regex, current) {
                trace!(pattern = rule.name, count, "removed watermark blocks");
                blocks_removed += count;
                cleaned = Some(next);
            }
        }

        match cleaned {
            Some(cleaned) => RemovalResult {
                cleaned,
                changed: true,
                blocks_removed,
            },
            None => RemovalResult {
                cleaned: buffer.to_vec(),
                changed: false,
                blocks_removed: 0,
            },
        }
    }
}

impl Default for WatermarkStripper {
    fn default() -> Self {
        WatermarkStripper::new(WATERMARK_PATTERNS).expect("built-in watermark patterns compile")
    }
}

/// Cut every non-overlapping match out of `haystack`
///
/// Returns `None` when nothing matched.
fn excise(regex: &Regex, haystack: &[u8]) -> Option<(Vec<u8>, usize)> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut last = 0;
    let mut count = 0;

    for m in regex.find_iter(haystack) {
        out.extend_from_slice(&haystack[last..m.start()]);
        last = m.end();
        count += 1;
    }

    if count == 0 {
        return None;
    }

    out.extend_from_slice(&haystack[last..]);
    Some((out, count))
}

/// Strip the built-in watermark fragments from a content stream
pub fn strip_watermarks(buffer: &[u8]) -> RemovalResult {
    DEFAULT_STRIPPER.strip(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(payload: &[u8]) -> Vec<u8> {
        let mut b = b"q 0.000 0.000 0.502 rg BT ".to_vec();
        b.extend_from_slice(payload);
        b.extend_from_slice(b" Tj ET Q\n");
        b
    }

    fn concat(parts: &[&[u8]]) -> Vec<u8> {
        parts.concat()
    }

    #[test]
    fn test_payloads_match_encoded_text() {
        assert_eq!(encode_payload("For personal,"), FOR_PERSONAL.payload);
        assert_eq!(encode_payload(" non-commercial use only."), NON_COMMERCIAL.payload);
    }

    #[test]
    fn test_encode_payload_small() {
        assert_eq!(encode_payload("Fo"), b"<0046006f>".to_vec());
        assert_eq!(encode_payload(""), b"<>".to_vec());
    }

    #[test]
    fn test_pattern_order_is_stable() {
        let stripper = WatermarkStripper::default();
        let names: Vec<_> = stripper.pattern_names().collect();
        assert_eq!(names, vec!["for-personal", "non-commercial"]);
    }

    #[test]
    fn test_removes_block_exactly() {
        let prefix: &[u8] = b"0 0 612 792 re W n\n";
        let suffix: &[u8] = b"BT /F1 9 Tf 72 720 Td (Headline) Tj ET\n";
        let input = concat(&[prefix, &block(FOR_PERSONAL.payload), suffix]);

        let result = strip_watermarks(&input);
        assert!(result.changed);
        assert_eq!(result.blocks_removed, 1);
        assert_eq!(result.cleaned, concat(&[prefix, suffix]));
    }

    #[test]
    fn test_block_with_operators_inside_text_object() {
        let input = b"1 0 0 1 0 0 cm\nq 0.000 0.000 0.502 rg BT /F3 48 Tf 0.7 0.7 -0.7 0.7 120 200 Tm <0046006f007200200070006500720073006f006e0061006c002c> Tj ET Q\nQ\n";
        let result = strip_watermarks(input);
        assert_eq!(result.cleaned, b"1 0 0 1 0 0 cm\nQ\n".to_vec());
    }

    #[test]
    fn test_multiline_whitespace_and_crlf() {
        let input = concat(&[
            b"A\r\n",
            b"q\r\n0.000 0.000 0.502 rg\r\nBT ",
            NON_COMMERCIAL.payload,
            b" Tj\r\nET\r\nQ\r\n",
            b"B\r\n",
        ]);
        let result = strip_watermarks(&input);
        assert_eq!(result.cleaned, b"A\r\nB\r\n".to_vec());
    }

    #[test]
    fn test_idempotent() {
        let input = concat(&[b"x\n", &block(FOR_PERSONAL.payload), b"y\n"]);
        let once = strip_watermarks(&input);
        let twice = strip_watermarks(&once.cleaned);
        assert!(!twice.changed);
        assert_eq!(twice.cleaned, once.cleaned);
    }

    #[test]
    fn test_other_payload_same_color_untouched() {
        let input = concat(&[b"x\n", &block(&encode_payload("Markets")), b"y\n"]);
        let result = strip_watermarks(&input);
        assert!(!result.changed);
        assert_eq!(result.cleaned, input);
    }

    #[test]
    fn test_other_color_untouched() {
        let input = b"q 0.000 0.000 0.000 rg BT <0046006f007200200070006500720073006f006e0061006c002c> Tj ET Q\n";
        let result = strip_watermarks(input);
        assert!(!result.changed);
    }

    #[test]
    fn test_both_fragments_either_order() {
        let a = block(FOR_PERSONAL.payload);
        let b = block(NON_COMMERCIAL.payload);

        let forward = concat(&[b"p\n", &a, b"m\n", &b, b"s\n"]);
        let reverse = concat(&[b"p\n", &b, b"m\n", &a, b"s\n"]);

        for input in [forward, reverse] {
            let result = strip_watermarks(&input);
            assert_eq!(result.blocks_removed, 2);
            assert_eq!(result.cleaned, b"p\nm\ns\n".to_vec());
        }
    }

    #[test]
    fn test_repeated_blocks_keep_content_between() {
        let a = block(FOR_PERSONAL.payload);
        let input = concat(&[&a, b"(keep me) Tj\n", &a, b"end\n"]);
        let result = strip_watermarks(&input);
        assert_eq!(result.blocks_removed, 2);
        assert_eq!(result.cleaned, b"(keep me) Tj\nend\n".to_vec());
    }

    #[test]
    fn test_colored_text_before_watermark_survives() {
        // A legitimate blue text block on its own line must not be swallowed
        // by a watermark block that follows it.
        let legit = block(&encode_payload("Markets"));
        let input = concat(&[&legit, &block(FOR_PERSONAL.payload)]);
        let result = strip_watermarks(&input);
        assert_eq!(result.cleaned, legit);
    }

    #[test]
    fn test_colored_text_earlier_on_same_line_survives() {
        let input = concat(&[
            b"q 0.000 0.000 0.502 rg BT /F1 12 Tf 72 700 Td <004d0061> Tj ET Q 0 0 m 10 10 l S ",
            &block(FOR_PERSONAL.payload),
        ]);
        let result = strip_watermarks(&input);
        assert_eq!(result.blocks_removed, 1);
        assert_eq!(
            result.cleaned,
            b"q 0.000 0.000 0.502 rg BT /F1 12 Tf 72 700 Td <004d0061> Tj ET Q 0 0 m 10 10 l S "
                .to_vec()
        );
    }

    #[test]
    fn test_text_end_letters_inside_span() {
        // `E` on its own (and doubled) before the payload is not a text end
        let input = concat(&[
            b"q 0.000 0.000 0.502 rg BT /EE1 48 Tf E ",
            FOR_PERSONAL.payload,
            b" Tj ET Q\nn\n",
        ]);
        assert_eq!(strip_watermarks(&input).cleaned, b"n\n".to_vec());
    }

    #[test]
    fn test_no_match_passes_through() {
        let input = b"q 1 0 0 1 0 0 cm /Im1 Do Q\n";
        let result = strip_watermarks(input);
        assert!(!result.changed);
        assert_eq!(result.blocks_removed, 0);
        assert_eq!(result.cleaned, input.to_vec());
    }

    #[test]
    fn test_truncated_block_untouched() {
        let input = b"q 0.000 0.000 0.502 rg BT <0046006f007200200070006500720073006f006e0061006c002c> Tj\n";
        assert!(!strip_watermarks(input).changed);

        // No line terminator after Q
        let input = b"q 0.000 0.000 0.502 rg BT <0046006f007200200070006500720073006f006e0061006c002c> Tj ET Q";
        assert!(!strip_watermarks(input).changed);
    }

    #[test]
    fn test_q_must_start_a_token() {
        let input = concat(&[b"Xq 0.000 0.000 0.502 rg BT ", FOR_PERSONAL.payload, b" Tj ET Q\n"]);
        assert!(!strip_watermarks(&input).changed);
    }

    #[test]
    fn test_custom_pattern_table() {
        const MARKETS: WatermarkPattern = WatermarkPattern {
            name: "markets",
            fill_color: ["1", "0", "0"],
            payload: b"<004d>",
        };
        let stripper = WatermarkStripper::new(&[MARKETS]).unwrap();
        let input = b"a\nq 1 0 0 rg BT <004d> Tj ET Q\nb\n";
        assert_eq!(stripper.strip(input).cleaned, b"a\nb\n".to_vec());
    }
}
