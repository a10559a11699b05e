//! CLI argument definitions

use clap::Parser;
use std::path::{Path, PathBuf};

/// Symbol table written next to the trace (`nm` output)
pub const SYMS_FILE: &str = "vmlinux.syms";
/// Debug binary written next to the trace
pub const ELF_FILE: &str = "vmlinux";

#[derive(Parser, Debug)]
#[command(
    name = "mscan",
    about = "Scan a kernel memory trace and report sharing and serialization",
    after_help = "\
EXAMPLES:
    mscan ./out trace.gz                         Scan ./out/trace.gz
    mscan ./out trace.gz --export report.json    Also write the reports as JSON
    RUST_LOG=debug mscan -q ./out trace.gz       Logs only, no summary"
)]
pub struct Args {
    /// Directory holding the trace, vmlinux and vmlinux.syms
    #[arg(value_name = "TRACE_DIR")]
    pub trace_dir: PathBuf,

    /// Gzip-compressed trace file inside TRACE_DIR
    #[arg(value_name = "TRACE_FILE")]
    pub trace_file: PathBuf,

    /// Export the analysis reports as JSON
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    #[must_use]
    pub fn paths(&self) -> ScanPaths {
        ScanPaths::new(&self.trace_dir, &self.trace_file)
    }
}

/// The three inputs of a run, all under the trace directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPaths {
    pub log: PathBuf,
    pub syms: PathBuf,
    pub elf: PathBuf,
}

impl ScanPaths {
    #[must_use]
    pub fn new(dir: &Path, file: &Path) -> Self {
        Self { log: dir.join(file), syms: dir.join(SYMS_FILE), elf: dir.join(ELF_FILE) }
    }
}
