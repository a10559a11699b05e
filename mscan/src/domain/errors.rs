//! Structured error types for mscan
//!
//! Using thiserror for automatic Display implementation and error chaining.

use crate::codec::RecordKind;
use thiserror::Error;

/// Errors that abort a scan.
///
/// Every variant is fatal: the dispatch loop stops at the first one and the
/// finalize pass is skipped, since analyses assume a fully scanned log.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("truncated {what}: expected {expected} bytes, got {got}")]
    Truncated { what: &'static str, expected: usize, got: usize },

    #[error("unknown record kind tag {0}")]
    UnknownKind(u8),

    #[error("{kind} record declares size {declared}, expected {expected}")]
    SizeMismatch { kind: RecordKind, declared: u32, expected: usize },

    /// A decoded field holds a value outside its domain
    #[error("contract violation in {kind} record: {detail}")]
    ContractViolation { kind: RecordKind, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub(crate) fn contract(kind: RecordKind, detail: impl Into<String>) -> Self {
        Self::ContractViolation { kind, detail: detail.into() }
    }

    /// Returns true for contract violations (as opposed to framing or I/O errors)
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation { .. })
    }
}

#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed { path: String, source: std::io::Error },

    #[error("Failed to parse object file {path}: {message}")]
    ObjectParseFailed { path: String, message: String },

    #[error("Failed to load DWARF debug information: {0}")]
    Dwarf(#[from] gimli::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Analysis {0} has no report; the scan did not finish")]
    MissingReport(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
