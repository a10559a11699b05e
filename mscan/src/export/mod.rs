//! Report export
//!
//! Collects the finished analysis reports into one [`ScanReport`] and writes
//! it as JSON. Terminal output lives in [`display`].

pub mod display;

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use crate::analysis::{Analyses, DistinctOpsReport, DistinctSyscallsReport, SerialSectionsReport};
use crate::codec::RecordKind;
use crate::domain::{CpuId, ExportError, Pc};
use crate::state::ScanState;

pub use display::print_summary;

/// A call with no `done` or `pause` before end of log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpenCall {
    pub cpu: CpuId,
    pub pc: Pc,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub app_name: Option<String>,
    pub app_ops: u64,
    /// Records seen per kind, keyed by kind name
    pub records: BTreeMap<&'static str, u64>,
    /// Calls still running when the log ended, by CPU
    pub open_calls: Vec<OpenCall>,
    pub distinct_syscalls: DistinctSyscallsReport,
    pub distinct_ops: DistinctOpsReport,
    pub serial_sections: SerialSectionsReport,
}

impl ScanReport {
    /// Gather the reports of a finished run
    ///
    /// # Errors
    /// Returns [`ExportError::MissingReport`] if an analysis never ran its
    /// finalize step (the scan stopped early).
    pub fn collect(state: &ScanState, analyses: &Analyses) -> Result<Self, ExportError> {
        let distinct_syscalls = analyses
            .syscalls
            .borrow()
            .report()
            .cloned()
            .ok_or(ExportError::MissingReport("distinct-syscalls"))?;
        let distinct_ops = analyses
            .ops
            .borrow()
            .report()
            .cloned()
            .ok_or(ExportError::MissingReport("distinct-ops"))?;
        let serial_sections = analyses
            .sections
            .borrow()
            .report()
            .cloned()
            .ok_or(ExportError::MissingReport("serial-sections"))?;

        Ok(Self {
            app_name: state.process.app_name().map(str::to_string),
            app_ops: state.process.summary().app_ops,
            records: RecordKind::ALL
                .iter()
                .map(|kind| (kind.name(), state.process.record_count(*kind)))
                .collect(),
            open_calls: state
                .process
                .active_calls()
                .map(|(cpu, pc)| OpenCall { cpu, pc })
                .collect(),
            distinct_syscalls,
            distinct_ops,
            serial_sections,
        })
    }
}

/// JSON writer for [`ScanReport`]
pub struct ReportExporter {
    report: ScanReport,
}

impl ReportExporter {
    #[must_use]
    pub fn new(report: ScanReport) -> Self {
        Self { report }
    }

    #[must_use]
    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    /// Write the report to any writer (file, stdout, buffer)
    ///
    /// # Errors
    /// Returns an error if serialization or the underlying write fails.
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut writer, &self.report)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::HandlerRegistry;
    use crate::symbolization::NoSymbols;

    fn finished() -> (ScanState, Analyses) {
        let mut registry = HandlerRegistry::new();
        let analyses = Analyses::install(&mut registry);
        let state = ScanState::new();
        registry.finalize(&state, &NoSymbols).unwrap();
        (state, analyses)
    }

    #[test]
    fn test_export_json_shape() {
        let (state, analyses) = finished();
        let exporter = ReportExporter::new(ScanReport::collect(&state, &analyses).unwrap());

        let mut buffer = Vec::new();
        exporter.export(&mut buffer).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(json["app_name"], serde_json::Value::Null);
        assert_eq!(json["app_ops"], 0);
        assert_eq!(json["records"]["lock"], 0);
        assert!(json["open_calls"].as_array().unwrap().is_empty());
        assert_eq!(json["distinct_syscalls"]["total_distinct_lines"], 0);
        assert_eq!(json["distinct_ops"]["lines_per_op"], serde_json::Value::Null);
        assert!(json["serial_sections"]["locks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_missing_report_before_finalize() {
        let mut registry = HandlerRegistry::new();
        let analyses = Analyses::install(&mut registry);
        let err = ScanReport::collect(&ScanState::new(), &analyses).unwrap_err();
        assert!(matches!(err, ExportError::MissingReport("distinct-syscalls")));
    }
}
