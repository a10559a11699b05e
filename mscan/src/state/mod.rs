//! Shared scan state
//!
//! One [`ScanState`] exists per run. The dispatch loop owns it, default
//! handlers mutate it, analysis handlers get `&ScanState`.

pub mod labels;
pub mod process;

pub use labels::{Label, LabelTable};
pub use process::{ProcessState, Summary};

#[derive(Debug, Clone, Default)]
pub struct ScanState {
    pub process: ProcessState,
    pub labels: LabelTable,
}

impl ScanState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
