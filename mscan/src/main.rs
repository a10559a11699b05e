//! # mscan - Main Entry Point
//!
//! Opens the trace and symbol inputs, installs the analyses, runs one scan
//! and prints (and optionally exports) the reports.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::BufWriter;

use mscan::analysis::Analyses;
use mscan::cli::Args;
use mscan::codec::TraceFileReader;
use mscan::dispatch::{Engine, HandlerRegistry};
use mscan::export::{print_summary, ReportExporter, ScanReport};
use mscan::symbolization::{ChainResolver, SymbolTable, Symbolizer};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

fn run() -> Result<()> {
    let args = Args::parse();
    let paths = args.paths();

    info!("Opening log {}", paths.log.display());
    let mut reader = TraceFileReader::open(&paths.log)
        .with_context(|| format!("Failed to open log file {}", paths.log.display()))?;

    let table = SymbolTable::load(&paths.syms)
        .with_context(|| format!("Failed to load symbols from {}", paths.syms.display()))?;
    let dwarf = Symbolizer::new(&paths.elf)
        .with_context(|| format!("Failed to load debug info from {}", paths.elf.display()))?;
    let symbols = ChainResolver::new(dwarf, table);

    let mut registry = HandlerRegistry::new();
    let analyses = Analyses::install(&mut registry);
    let mut engine = Engine::new(registry);

    if !args.quiet {
        println!("Scanning log file {} ...", paths.log.display());
    }
    let records = engine
        .run(&mut reader, &symbols)
        .with_context(|| format!("Scan of {} failed", paths.log.display()))?;
    info!("Scan complete: {records} records");

    let report = ScanReport::collect(engine.state(), &analyses)?;
    if !args.quiet {
        print_summary(&report).context("Failed to write summary")?;
    }

    if let Some(ref path) = args.export {
        let file = File::create(path)
            .with_context(|| format!("Failed to create export file {}", path.display()))?;
        ReportExporter::new(report)
            .export(BufWriter::new(file))
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        if !args.quiet {
            println!("Report written to {}", path.display());
        }
    }

    Ok(())
}
