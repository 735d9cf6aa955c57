//! PDF manipulation module

pub mod contents;
pub mod headers;
pub mod tools;
pub mod watermark;

// Re-export commonly used items
pub use contents::{strip_document, strip_pdf_file, PageContents, StripSummary};
pub use headers::{strip_header_file, strip_header_text};
pub use tools::ToolPaths;
pub use watermark::{
    encode_payload, strip_watermarks, RemovalResult, WatermarkPattern, WatermarkStripper,
    WATERMARK_PATTERNS,
};
