//! PDF Unmark Library
//!
//! Removes the copyright header text and the encoded diagonal watermark that
//! digitally distributed newspaper PDFs carry on every page. This library
//! provides functionality to:
//! - Strip plain-text header fragments from an uncompressed PDF
//! - Find and cut watermark drawing blocks out of page content streams
//! - Run the full five-stage cleaning pipeline (pdftk, qpdf, lopdf)
//!
//! # Example
//!
//! ```no_run
//! use pdf_unmark::pdf::ToolPaths;
//! use pdf_unmark::pipeline::Pipeline;
//! use std::path::Path;
//!
//! let pipeline = Pipeline::new(ToolPaths::default());
//! let report = pipeline
//!     .run(Path::new("paper.pdf"), Path::new("clean.pdf"))
//!     .expect("Failed to clean PDF");
//! println!("{} streams modified", report.streams_modified());
//! ```

pub mod error;
pub mod pdf;
pub mod pipeline;

// Re-export commonly used items
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineReport, PipelineState, Stage};
