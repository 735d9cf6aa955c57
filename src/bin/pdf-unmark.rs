//! PDF Unmark CLI tool
//!
//! Removes copyright headers and hex-encoded watermarks from newspaper PDFs.

use anyhow::bail;
use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process;

use pdf_unmark::pdf::ToolPaths;
use pdf_unmark::Pipeline;

/// PDF Unmark - Remove copyright headers and watermarks from newspaper PDFs
#[derive(Parser)]
#[command(name = "pdf-unmark")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Clean a downloaded edition
    pdf-unmark edition.pdf edition-clean.pdf

    # Use tools outside PATH and show per-stream detail
    pdf-unmark --pdftk /opt/pdftk/bin/pdftk -v edition.pdf clean.pdf")]
struct Cli {
    /// Input PDF file
    input: PathBuf,

    /// Output PDF file path
    output: PathBuf,

    /// pdftk executable used to uncompress and recompress the document
    #[arg(long, env = "PDF_UNMARK_PDFTK", default_value = "pdftk")]
    pdftk: PathBuf,

    /// qpdf executable used to expand object streams
    #[arg(long, env = "PDF_UNMARK_QPDF", default_value = "qpdf")]
    qpdf: PathBuf,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            eprintln!(
                "Error: {} (usage: pdf-unmark <INPUT> <OUTPUT>)",
                first_line(&e.to_string())
            );
            process::exit(1);
        }
    };

    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// First non-empty line of a clap error, without its "error: " prefix
fn first_line(message: &str) -> &str {
    message
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error: "))
        .unwrap_or("invalid arguments")
}

/// Set up stderr logging; RUST_LOG overrides the verbosity flags
fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

/// Clean one PDF
fn run(cli: Cli) -> anyhow::Result<()> {
    if !cli.input.exists() {
        bail!("Input file not found: {}", cli.input.display());
    }

    let pipeline = Pipeline::new(ToolPaths {
        pdftk: cli.pdftk,
        qpdf: cli.qpdf,
    });

    let report = pipeline.run(&cli.input, &cli.output)?;

    println!(
        "Complete: {} ({} streams modified)",
        report.output.display(),
        report.streams_modified()
    );

    Ok(())
}
