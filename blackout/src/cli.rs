// blackout/src/cli.rs
//! This file defines the command-line interface (CLI) for the blackout application,
//! including all available commands and their arguments.
//! License: MIT OR Apache-2.0

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "blackout",
    author = "Blackout Contributors",
    version = env!("CARGO_PKG_VERSION"),
    about = "Black out personal data in PDF documents",
    long_about = "Blackout finds personal data such as phone numbers, national identifiers, email addresses, card numbers and tax identifiers in PDF documents and removes it for good. Matched text and any image under it are deleted from the page content and covered with an opaque black box, and the result is written to a new file.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// Specify the path to a custom YAML theme file.
    #[arg(long = "theme", value_name = "FILE", global = true, help = "Specify the path to a custom YAML theme file.")]
    pub theme: Option<PathBuf>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `blackout` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Redacts a PDF document and writes the result to a new file.
    #[command(about = "Redacts a PDF document and writes the result to a new file.")]
    Pdf(PdfCommand),

    /// Redacts plain text from a file or stdin.
    #[command(about = "Redacts plain text from a file or stdin.")]
    Text(TextCommand),

    /// Scans a PDF document for personal data without changing it.
    #[command(about = "Scans a PDF document for personal data without changing it.")]
    Scan(ScanCommand),

    /// Lists the detectors that would be active for a run.
    #[command(about = "Lists the detectors that would be active for a run.")]
    Detectors(DetectorsCommand),
}

/// Detector selection shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct DetectorArgs {
    /// Path to a custom detector configuration file (YAML).
    #[arg(long = "config", value_name = "FILE", env = "BLACKOUT_CONFIG", help = "Path to a custom detector configuration file (YAML).")]
    pub config: Option<PathBuf>,

    /// Explicitly enable these detector names (comma-separated).
    #[arg(long, short = 'e', value_delimiter = ',', help = "Enable these detector names, including opt-in ones (comma-separated).")]
    pub enable: Vec<String>,

    /// Explicitly disable these detector names (comma-separated).
    #[arg(long, short = 'x', value_delimiter = ',', help = "Disable these detector names (comma-separated).")]
    pub disable: Vec<String>,
}

/// Arguments for the `pdf` command.
#[derive(Parser, Debug)]
pub struct PdfCommand {
    /// Path to the PDF to redact.
    #[arg(long, short = 'i', value_name = "FILE", help = "The PDF document to redact.")]
    pub input: PathBuf,

    /// Where to write the redacted PDF.
    #[arg(long, short = 'o', value_name = "FILE", help = "Write the redacted PDF here (defaults to redacted_<name> next to the input).")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub detectors: DetectorArgs,

    /// Abort the run if it takes longer than this many seconds.
    #[arg(long = "timeout-secs", value_name = "SECONDS", help = "Abort without writing output if redaction takes longer than this.")]
    pub timeout_secs: Option<u64>,

    /// Print the run report as JSON to stdout instead of the output file name.
    #[arg(long = "json", help = "Print the run report as JSON to stdout.")]
    pub json: bool,

    /// Suppress the redaction summary.
    #[arg(long = "no-redaction-summary", help = "Suppress the redaction summary.")]
    pub no_summary: bool,
}

/// Arguments for the `text` command.
#[derive(Parser, Debug)]
pub struct TextCommand {
    /// Path to an input file (reads from stdin if not provided).
    #[arg(long, short = 'i', value_name = "FILE", help = "Read input from a specified file instead of stdin.")]
    pub input_file: Option<PathBuf>,

    /// Write redacted output to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE", help = "Write output to a specified file instead of stdout.")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub detectors: DetectorArgs,

    /// Suppress the redaction summary.
    #[arg(long = "no-redaction-summary", help = "Suppress the redaction summary.")]
    pub no_summary: bool,
}

/// Arguments for the `scan` command.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Path to the PDF to scan.
    #[arg(long, short = 'i', value_name = "FILE", help = "The PDF document to scan.")]
    pub input: PathBuf,

    #[command(flatten)]
    pub detectors: DetectorArgs,

    /// Exit with a non-zero code if the total number of matches exceeds this threshold.
    #[arg(long = "fail-over-threshold", value_name = "N", help = "Exit with a non-zero code if the total number of matches exceeds this threshold.")]
    pub fail_over_threshold: Option<usize>,

    /// Print the scan report as JSON to stdout.
    #[arg(long = "json", help = "Print the scan report as JSON to stdout.")]
    pub json: bool,
}

/// Arguments for the `detectors` command.
#[derive(Parser, Debug)]
pub struct DetectorsCommand {
    #[command(flatten)]
    pub detectors: DetectorArgs,
}
