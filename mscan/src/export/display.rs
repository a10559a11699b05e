// Ratios and percentages are for display only
#![allow(clippy::cast_precision_loss)]

use std::io::{self, Write};

use super::ScanReport;

/// Rows shown per table
const TOP_N: usize = 10;

/// Print a human-readable summary of `report` to stdout
///
/// # Errors
/// Returns an error if stdout cannot be written.
pub fn print_summary(report: &ScanReport) -> io::Result<()> {
    let stdout = io::stdout();
    write_summary(&mut stdout.lock(), report)
}

/// Write the summary to any writer
///
/// # Errors
/// Returns an error if the writer fails.
pub fn write_summary<W: Write>(out: &mut W, report: &ScanReport) -> io::Result<()> {
    let total: u64 = report.records.values().sum();
    writeln!(out, "app: {}", report.app_name.as_deref().unwrap_or("<unnamed>"))?;
    writeln!(out, "records: {total}")?;
    for (kind, count) in &report.records {
        if *count > 0 {
            writeln!(out, "  {kind:<8} {count}")?;
        }
    }

    if !report.open_calls.is_empty() {
        writeln!(out, "open calls at end of log: {}", report.open_calls.len())?;
        for call in &report.open_calls {
            writeln!(out, "  cpu {:<4} {}", call.cpu.0, call.pc)?;
        }
    }

    let dissys = &report.distinct_syscalls;
    writeln!(out)?;
    writeln!(
        out,
        "distinct lines: {} ({} accesses outside calls)",
        dissys.total_distinct_lines, dissys.ignored_accesses
    )?;
    for stat in dissys.syscalls.iter().take(TOP_N) {
        let share = if dissys.total_distinct_lines == 0 {
            0.0
        } else {
            stat.distinct_lines as f64 * 100.0 / dissys.total_distinct_lines as f64
        };
        let source = stat.source.as_ref().map_or_else(|| stat.pc.to_string(), ToString::to_string);
        writeln!(
            out,
            "  {:>8} {share:5.1}%  calls={:<6} {source}",
            stat.distinct_lines, stat.calls
        )?;
    }

    let ops = &report.distinct_ops;
    match ops.lines_per_op {
        Some(ratio) => writeln!(out, "lines/op: {ratio:.2} over {} ops", ops.app_ops)?,
        None => writeln!(out, "lines/op: n/a (no app ops reported)")?,
    }

    let sersecs = &report.serial_sections;
    writeln!(out)?;
    writeln!(out, "locks: {}", sersecs.locks.len())?;
    for section in sersecs.locks.iter().take(TOP_N) {
        let name = section.name.as_deref().unwrap_or("?");
        let site = section
            .top_source
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| section.top_pc.map(|pc| pc.to_string()))
            .unwrap_or_default();
        writeln!(
            out,
            "  {:>10} hold  {:>6} acq  {:>5} contended  {name} {site}",
            section.total_hold, section.acquires, section.contended
        )?;
    }
    Ok(())
}
