//! Process-wide scan state maintained by the default handlers
//!
//! Analyses read this through [`super::ScanState`]; only the default handlers
//! in [`crate::dispatch::defaults`] write it.

use mscan_common::MAX_CPUS;

use crate::codec::{HostRecord, RecordKind};
use crate::domain::{CpuId, Pc};

/// Counters summarising the application run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Last application-reported operation count (cumulative upstream)
    pub app_ops: u64,
}

#[derive(Debug, Clone)]
pub struct ProcessState {
    /// Last `access_all_cpu` host record
    enabled_scope: Option<HostRecord>,
    app_name: Option<String>,
    summary: Summary,
    /// Current call PC per CPU, `Pc::NONE` when idle
    call_pc: Vec<Pc>,
    record_counts: [u64; RecordKind::COUNT],
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled_scope: None,
            app_name: None,
            summary: Summary::default(),
            call_pc: vec![Pc::NONE; MAX_CPUS],
            record_counts: [0; RecordKind::COUNT],
        }
    }

    /// Scope descriptor from the most recent `access_all_cpu` record
    #[must_use]
    pub fn enabled_scope(&self) -> Option<&HostRecord> {
        self.enabled_scope.as_ref()
    }

    /// Application name from the first non-empty `access_all_cpu` record
    #[must_use]
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// PC of the call currently running on `cpu`, `Pc::NONE` if idle or out of range
    #[must_use]
    pub fn call_pc(&self, cpu: CpuId) -> Pc {
        cpu.slot().map_or(Pc::NONE, |slot| self.call_pc[slot])
    }

    /// CPUs with an active call, in index order
    pub fn active_calls(&self) -> impl Iterator<Item = (CpuId, Pc)> + '_ {
        self.call_pc
            .iter()
            .enumerate()
            .filter(|(_, pc)| !pc.is_none())
            .map(|(slot, pc)| (CpuId(u16::try_from(slot).unwrap_or(u16::MAX)), *pc))
    }

    /// Records dispatched so far for `kind`
    #[must_use]
    pub fn record_count(&self, kind: RecordKind) -> u64 {
        self.record_counts[kind.index()]
    }

    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.record_counts.iter().sum()
    }

    // Mutators used by the default handlers and the dispatch loop

    pub(crate) fn set_scope(&mut self, scope: HostRecord) {
        self.enabled_scope = Some(scope);
    }

    /// Set the application name unless one is already set. Empty names are ignored.
    pub(crate) fn set_app_name_once(&mut self, name: &str) {
        if self.app_name.is_none() && !name.is_empty() {
            self.app_name = Some(name.to_string());
        }
    }

    pub(crate) fn set_app_ops(&mut self, value: u64) {
        self.summary.app_ops = value;
    }

    /// Returns false if the CPU has no slot
    pub(crate) fn set_call_pc(&mut self, cpu: CpuId, pc: Pc) -> bool {
        match cpu.slot() {
            Some(slot) => {
                self.call_pc[slot] = pc;
                true
            }
            None => false,
        }
    }

    pub(crate) fn note_record(&mut self, kind: RecordKind) {
        self.record_counts[kind.index()] += 1;
    }
}
