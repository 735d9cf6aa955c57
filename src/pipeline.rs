//! Five-stage cleaning pipeline
//!
//! ```text
//! Start -> Decompressed -> HeaderStripped -> Recompressed
//!       -> StructureExpanded -> WatermarksStripped
//! ```
//!
//! Any failing stage moves the run to `Failed` and aborts it. All
//! intermediate files live in a private temporary directory that is removed
//! when the run ends, however it ends. The output path is only written once
//! every stage has succeeded.

use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::pdf::contents::{strip_pdf_file, StripSummary};
use crate::pdf::headers::strip_header_file;
use crate::pdf::tools::{self, ToolPaths};
use crate::pdf::watermark::WatermarkStripper;

/// One transformation step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decompress,
    StripHeaders,
    Recompress,
    ExpandStructure,
    StripWatermarks,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 5] = [
        Stage::Decompress,
        Stage::StripHeaders,
        Stage::Recompress,
        Stage::ExpandStructure,
        Stage::StripWatermarks,
    ];

    /// 1-based position, for progress output
    pub fn number(self) -> usize {
        match self {
            Stage::Decompress => 1,
            Stage::StripHeaders => 2,
            Stage::Recompress => 3,
            Stage::ExpandStructure => 4,
            Stage::StripWatermarks => 5,
        }
    }

    /// Progress message shown when the stage starts
    pub fn description(self) -> &'static str {
        match self {
            Stage::Decompress => "Uncompressing",
            Stage::StripHeaders => "Removing text headers",
            Stage::Recompress => "Re-compressing PDF",
            Stage::ExpandStructure => "Unpacking PDF structure",
            Stage::StripWatermarks => "Removing hex watermarks",
        }
    }

    /// State reached when this stage succeeds
    pub fn completes(self) -> PipelineState {
        match self {
            Stage::Decompress => PipelineState::Decompressed,
            Stage::StripHeaders => PipelineState::HeaderStripped,
            Stage::Recompress => PipelineState::Recompressed,
            Stage::ExpandStructure => PipelineState::StructureExpanded,
            Stage::StripWatermarks => PipelineState::WatermarksStripped,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decompress => "decompress",
            Stage::StripHeaders => "header strip",
            Stage::Recompress => "recompress",
            Stage::ExpandStructure => "structure expansion",
            Stage::StripWatermarks => "watermark strip",
        };
        f.write_str(name)
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    Decompressed,
    HeaderStripped,
    Recompressed,
    StructureExpanded,
    WatermarksStripped,
    Failed,
}

impl PipelineState {
    /// Stage to run from this state, `None` once terminal
    pub fn next_stage(self) -> Option<Stage> {
        match self {
            PipelineState::Start => Some(Stage::Decompress),
            PipelineState::Decompressed => Some(Stage::StripHeaders),
            PipelineState::HeaderStripped => Some(Stage::Recompress),
            PipelineState::Recompressed => Some(Stage::ExpandStructure),
            PipelineState::StructureExpanded => Some(Stage::StripWatermarks),
            PipelineState::WatermarksStripped | PipelineState::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next_stage().is_none()
    }
}

/// What a successful run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Where the cleaned document was written
    pub output: PathBuf,
    /// Plain-text header fragments removed in stage 2
    pub header_fragments_removed: usize,
    /// Watermark pass counts from stage 5
    pub watermarks: StripSummary,
}

impl PipelineReport {
    /// Content streams rewritten (each changed stream counts once)
    pub fn streams_modified(&self) -> usize {
        self.watermarks.streams_modified
    }
}

/// Configured pipeline, reusable across runs
#[derive(Debug, Default)]
pub struct Pipeline {
    tools: ToolPaths,
    stripper: WatermarkStripper,
}

impl Pipeline {
    pub fn new(tools: ToolPaths) -> Self {
        Self {
            tools,
            stripper: WatermarkStripper::default(),
        }
    }

    /// Use a custom watermark table instead of the built-in one
    pub fn with_stripper(mut self, stripper: WatermarkStripper) -> Self {
        self.stripper = stripper;
        self
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    /// Clean `input` and write the result to `output`
    ///
    /// Nothing is written to `output` unless all five stages succeed.
    pub fn run(&self, input: &Path, output: &Path) -> Result<PipelineReport> {
        if !input.exists() {
            return Err(Error::FileNotFound(input.to_path_buf()));
        }

        let mut run = Run {
            pipeline: self,
            input,
            output,
            workspace: Workspace::create()?,
            state: PipelineState::Start,
            header_fragments_removed: 0,
            watermarks: StripSummary::default(),
        };

        while let Some(stage) = run.state.next_stage() {
            run.advance(stage)?;
        }

        Ok(PipelineReport {
            output: output.to_path_buf(),
            header_fragments_removed: run.header_fragments_removed,
            watermarks: run.watermarks,
        })
    }
}

/// Private temporary directory holding every intermediate artifact
///
/// Dropping it removes the directory and its contents.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("pdf-unmark-").tempdir()?;
        debug!(path = %dir.path().display(), "created workspace");
        Ok(Self { dir })
    }

    fn artifact(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Artifact written by `stage`
    fn output_of(&self, stage: Stage) -> PathBuf {
        self.artifact(match stage {
            Stage::Decompress => "uncompressed.pdf",
            Stage::StripHeaders => "no_header_uncompressed.pdf",
            Stage::Recompress => "no_header.pdf",
            Stage::ExpandStructure => "unpacked.pdf",
            Stage::StripWatermarks => "cleaned.pdf",
        })
    }
}

/// Progress message for `stage`; the first one names the input file
fn progress_line(stage: Stage, input: &Path) -> String {
    let position = format!("[{}/{}]", stage.number(), Stage::ALL.len());
    match (stage, input.file_name()) {
        (Stage::Decompress, Some(name)) => {
            format!("{} {}: {}...", position, stage.description(), name.to_string_lossy())
        }
        _ => format!("{} {}...", position, stage.description()),
    }
}

/// State of a single in-flight run
struct Run<'a> {
    pipeline: &'a Pipeline,
    input: &'a Path,
    output: &'a Path,
    workspace: Workspace,
    state: PipelineState,
    header_fragments_removed: usize,
    watermarks: StripSummary,
}

impl Run<'_> {
    /// Run one stage and move to its completion state, or to `Failed`
    fn advance(&mut self, stage: Stage) -> Result<()> {
        info!("{}", progress_line(stage, self.input));

        match self.execute(stage) {
            Ok(()) => {
                self.state = stage.completes();
                debug!(state = ?self.state, "stage complete");
                Ok(())
            }
            Err(source) => {
                self.state = PipelineState::Failed;
                debug!(%stage, state = ?self.state, "stage failed, aborting run");
                Err(Error::Stage {
                    stage,
                    source: Box::new(source),
                })
            }
        }
    }

    /// Input artifact for `stage`: the previous stage's output
    fn input_of(&self, stage: Stage) -> PathBuf {
        match stage {
            Stage::Decompress => self.input.to_path_buf(),
            Stage::StripHeaders => self.workspace.output_of(Stage::Decompress),
            Stage::Recompress => self.workspace.output_of(Stage::StripHeaders),
            Stage::ExpandStructure => self.workspace.output_of(Stage::Recompress),
            Stage::StripWatermarks => self.workspace.output_of(Stage::ExpandStructure),
        }
    }

    fn execute(&mut self, stage: Stage) -> Result<()> {
        let from = self.input_of(stage);
        let to = self.workspace.output_of(stage);
        let paths = &self.pipeline.tools;

        match stage {
            Stage::Decompress => tools::decompress(paths, &from, &to),
            Stage::StripHeaders => {
                self.header_fragments_removed = strip_header_file(&from, &to)?;
                Ok(())
            }
            Stage::Recompress => tools::recompress(paths, &from, &to),
            Stage::ExpandStructure => tools::expand_structure(paths, &from, &to),
            Stage::StripWatermarks => {
                self.watermarks = strip_pdf_file(&from, &to, &self.pipeline.stripper)?;
                std::fs::copy(&to, self.output)?;
                Ok(())
            }
        }
    }
}
