//! Error types for the pdf-unmark library

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::Stage;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pdf-unmark library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// External tool could not be started at all
    #[error("failed to execute {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// External tool ran but exited unsuccessfully
    #[error("{tool} failed (exit code {}): {output}", describe_exit(.code))]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        output: String,
    },

    /// A watermark or header pattern did not compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// A pipeline stage failed and aborted the run
    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// General error
    #[error("{0}")]
    General(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::InvalidPattern(e.to_string())
    }
}
