//! Distinct cache lines per application operation.
//!
//! Finalize-only: combines the totals of [`DistinctSyscalls`] with the
//! application op count reported through appdata records.

// Ratio intentionally converts u64 to f64
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

use super::DistinctSyscalls;
use crate::dispatch::EntryHandler;
use crate::domain::ScanError;
use crate::state::ScanState;
use crate::symbolization::SymbolResolver;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistinctOpsReport {
    pub app_name: Option<String>,
    pub app_ops: u64,
    pub total_distinct_lines: u64,
    /// Absent when the application reported no operations
    pub lines_per_op: Option<f64>,
}

pub struct DistinctOps {
    syscalls: Rc<RefCell<DistinctSyscalls>>,
    report: Option<DistinctOpsReport>,
}

impl DistinctOps {
    #[must_use]
    pub fn new(syscalls: Rc<RefCell<DistinctSyscalls>>) -> Self {
        Self { syscalls, report: None }
    }

    #[must_use]
    pub fn report(&self) -> Option<&DistinctOpsReport> {
        self.report.as_ref()
    }
}

impl EntryHandler for DistinctOps {
    fn name(&self) -> &'static str {
        "distinct-ops"
    }

    fn finalize(
        &mut self,
        state: &ScanState,
        _symbols: &dyn SymbolResolver,
    ) -> Result<(), ScanError> {
        let app_ops = state.process.summary().app_ops;
        let total_distinct_lines = self.syscalls.borrow().total_distinct_lines();
        let lines_per_op = (app_ops > 0).then(|| total_distinct_lines as f64 / app_ops as f64);

        self.report = Some(DistinctOpsReport {
            app_name: state.process.app_name().map(str::to_string),
            app_ops,
            total_distinct_lines,
            lines_per_op,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{
        AccessRecord, AccessType, AppDataRecord, CallState, FcallRecord, Payload, Record,
    };
    use crate::dispatch::defaults::{handle_appdata, handle_fcall};
    use crate::domain::{Address, CpuId, Pc, Timestamp};
    use crate::symbolization::NoSymbols;

    fn rec(payload: Payload) -> Record {
        Record::new(CpuId(0), Timestamp(0), payload)
    }

    #[test]
    fn test_lines_per_op() {
        let syscalls = Rc::new(RefCell::new(DistinctSyscalls::new()));
        let mut state = ScanState::new();

        let start = rec(Payload::Fcall(FcallRecord {
            state: CallState::Start,
            depth: 0,
            tid: 1,
            pc: Pc(0x100),
            tag: 0,
        }));
        handle_fcall(&start, &mut state).unwrap();
        syscalls.borrow_mut().handle(&start, &state).unwrap();
        for addr in [0x1000, 0x2000, 0x3000, 0x4000] {
            let access = rec(Payload::Access(AccessRecord {
                access_type: AccessType::Store,
                traffic: true,
                locked: false,
                pc: Pc(0x104),
                addr: Address(addr),
                bytes: 8,
            }));
            syscalls.borrow_mut().handle(&access, &state).unwrap();
        }
        handle_appdata(&rec(Payload::AppData(AppDataRecord { value: 2 })), &mut state).unwrap();

        let mut ops = DistinctOps::new(Rc::clone(&syscalls));
        ops.finalize(&state, &NoSymbols).unwrap();
        let report = ops.report().unwrap();
        assert_eq!(report.app_ops, 2);
        assert_eq!(report.total_distinct_lines, 4);
        assert_eq!(report.lines_per_op, Some(2.0));
    }

    #[test]
    fn test_no_ops_has_no_ratio() {
        let syscalls = Rc::new(RefCell::new(DistinctSyscalls::new()));
        let mut ops = DistinctOps::new(syscalls);
        ops.finalize(&ScanState::new(), &NoSymbols).unwrap();
        assert_eq!(ops.report().unwrap().lines_per_op, None);
        assert_eq!(ops.report().unwrap().app_name, None);
    }
}
