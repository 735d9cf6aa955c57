//! External structural transforms (pdftk, qpdf)

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::{Error, Result};

/// Locations of the external executables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    /// pdftk, used to uncompress and recompress streams
    pub pdftk: PathBuf,
    /// qpdf, used to expand object streams
    pub qpdf: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            pdftk: PathBuf::from("pdftk"),
            qpdf: PathBuf::from("qpdf"),
        }
    }
}

/// Store every stream in the document uncompressed
pub fn decompress(tools: &ToolPaths, input: &Path, output: &Path) -> Result<()> {
    run_tool(
        &tools.pdftk,
        [input.as_os_str(), OsStr::new("output"), output.as_os_str(), OsStr::new("uncompress")],
    )
}

/// Compress the document again, repairing stream lengths along the way
pub fn recompress(tools: &ToolPaths, input: &Path, output: &Path) -> Result<()> {
    run_tool(
        &tools.pdftk,
        [input.as_os_str(), OsStr::new("output"), output.as_os_str(), OsStr::new("compress")],
    )
}

/// Rewrite the document in QDF form with object streams disabled, so every
/// content stream is its own readable object
pub fn expand_structure(tools: &ToolPaths, input: &Path, output: &Path) -> Result<()> {
    run_tool(
        &tools.qpdf,
        [
            OsStr::new("--qdf"),
            OsStr::new("--object-streams=disable"),
            input.as_os_str(),
            output.as_os_str(),
        ],
    )
}

/// Run a tool to completion and turn a non-zero exit into an error
fn run_tool<'a, I>(program: &Path, args: I) -> Result<()>
where
    I: IntoIterator<Item = &'a OsStr>,
{
    let tool = program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned();

    let mut command = Command::new(program);
    command.args(args);
    debug!(?command, "running external tool");

    let output = command.output().map_err(|source| Error::ToolLaunch {
        tool: tool.clone(),
        source,
    })?;

    if output.status.success() {
        return Ok(());
    }

    Err(Error::ToolFailed {
        tool,
        code: output.status.code(),
        output: captured_output(&output.stdout, &output.stderr),
    })
}

/// Collapse captured stdout/stderr into a single line
fn captured_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}
