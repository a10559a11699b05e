//! Distinct cache lines touched per system call.
//!
//! Attributes every memory access to the call running on the accessing CPU
//! (the per-CPU call PC kept by the default fcall handler) and counts the
//! distinct cache lines each call site touched over the whole run.
//!
//! # Data Flow
//!
//! ```text
//! fcall start ──► CallStats.calls += 1
//!
//! access ──► ScanState.call_pc(cpu) ──► CallStats.lines ∪= cache lines
//!                  │ idle
//!                  └──► ignored_accesses += 1
//! ```
//!
//! # Performance
//!
//! - `handle()`: O(lines touched) per access, HashSet insert
//! - Memory: O(call sites × distinct lines per call site)

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::codec::{CallState, Payload, Record, RecordKind};
use crate::dispatch::EntryHandler;
use crate::domain::{Pc, ScanError};
use crate::state::ScanState;
use crate::symbolization::{SourceLine, SymbolResolver};

/// Widest single access accepted, in cache lines (1 MiB)
pub const MAX_ACCESS_LINES: u64 = 16 * 1024;

/// Per call site result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyscallStat {
    pub pc: Pc,
    pub source: Option<SourceLine>,
    /// Number of `start` records seen for this PC
    pub calls: u64,
    pub accesses: u64,
    pub distinct_lines: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistinctSyscallsReport {
    /// Sorted by distinct lines, largest first
    pub syscalls: Vec<SyscallStat>,
    pub total_distinct_lines: u64,
    /// Accesses made while no call was active on the CPU
    pub ignored_accesses: u64,
}

#[derive(Debug, Default)]
struct CallStats {
    calls: u64,
    accesses: u64,
    lines: HashSet<u64>,
}

#[derive(Debug, Default)]
pub struct DistinctSyscalls {
    calls: HashMap<Pc, CallStats>,
    ignored_accesses: u64,
    report: Option<DistinctSyscallsReport>,
}

impl DistinctSyscalls {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of distinct lines over all call sites, as accumulated so far
    #[must_use]
    pub fn total_distinct_lines(&self) -> u64 {
        self.calls.values().map(|c| c.lines.len() as u64).sum()
    }

    /// Result of the finalize pass
    #[must_use]
    pub fn report(&self) -> Option<&DistinctSyscallsReport> {
        self.report.as_ref()
    }
}

impl EntryHandler for DistinctSyscalls {
    fn name(&self) -> &'static str {
        "distinct-syscalls"
    }

    fn handle(&mut self, record: &Record, state: &ScanState) -> Result<(), ScanError> {
        match &record.payload {
            Payload::Fcall(fcall) if fcall.state == CallState::Start => {
                self.calls.entry(fcall.pc).or_default().calls += 1;
            }
            Payload::Access(access) => {
                let lines = access.addr.line_count(access.bytes);
                if lines > MAX_ACCESS_LINES {
                    return Err(ScanError::contract(
                        RecordKind::Access,
                        format!(
                            "access of {} bytes at {} spans {lines} lines",
                            access.bytes, access.addr
                        ),
                    ));
                }
                let pc = state.process.call_pc(record.cpu);
                if pc.is_none() {
                    self.ignored_accesses += 1;
                    return Ok(());
                }
                let stats = self.calls.entry(pc).or_default();
                stats.accesses += 1;
                stats.lines.extend(access.addr.cache_lines(access.bytes));
            }
            _ => {}
        }
        Ok(())
    }

    fn finalize(
        &mut self,
        _state: &ScanState,
        symbols: &dyn SymbolResolver,
    ) -> Result<(), ScanError> {
        let mut syscalls: Vec<SyscallStat> = self
            .calls
            .iter()
            .map(|(pc, stats)| SyscallStat {
                pc: *pc,
                source: symbols.resolve(*pc),
                calls: stats.calls,
                accesses: stats.accesses,
                distinct_lines: stats.lines.len() as u64,
            })
            .collect();
        syscalls.sort_by(|a, b| b.distinct_lines.cmp(&a.distinct_lines).then(a.pc.cmp(&b.pc)));

        self.report = Some(DistinctSyscallsReport {
            total_distinct_lines: self.total_distinct_lines(),
            syscalls,
            ignored_accesses: self.ignored_accesses,
        });
        Ok(())
    }
}
