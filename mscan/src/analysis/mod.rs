//! Analyses built on the dispatch engine
//!
//! Each analysis is an [`EntryHandler`](crate::dispatch::EntryHandler)
//! that subscribes to the record kinds it needs and produces a serializable
//! report in its finalize step.
//!
//! | analysis | kinds | finalize |
//! |----------|-------|----------|
//! | [`DistinctSyscalls`] | fcall, access | yes |
//! | [`DistinctOps`] | none | yes, after `DistinctSyscalls` |
//! | [`SerialSections`] | lock | yes |

pub mod distinct_ops;
pub mod distinct_syscalls;
pub mod serial_sections;

use std::cell::RefCell;
use std::rc::Rc;

use crate::codec::RecordKind;
use crate::dispatch::{shared, HandlerRegistry};

pub use distinct_ops::{DistinctOps, DistinctOpsReport};
pub use distinct_syscalls::{DistinctSyscalls, DistinctSyscallsReport, SyscallStat};
pub use serial_sections::{SerialSection, SerialSections, SerialSectionsReport};

/// Typed handles to the installed analyses, for reading reports after a run
pub struct Analyses {
    pub syscalls: Rc<RefCell<DistinctSyscalls>>,
    pub ops: Rc<RefCell<DistinctOps>>,
    pub sections: Rc<RefCell<SerialSections>>,
}

impl Analyses {
    /// Register every analysis with `registry`
    ///
    /// `DistinctOps` reads the totals of `DistinctSyscalls`, so it is
    /// registered for finalize after it.
    pub fn install(registry: &mut HandlerRegistry) -> Self {
        let syscalls = shared(DistinctSyscalls::new());
        registry.register(RecordKind::Fcall, syscalls.clone());
        registry.register(RecordKind::Access, syscalls.clone());
        registry.register_finalize(syscalls.clone());

        let ops = shared(DistinctOps::new(Rc::clone(&syscalls)));
        registry.register_finalize(ops.clone());

        let sections = shared(SerialSections::new());
        registry.register(RecordKind::Lock, sections.clone());
        registry.register_finalize(sections.clone());

        Self { syscalls, ops, sections }
    }
}
