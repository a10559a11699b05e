//! # Program Counter Symbolization
//!
//! Analyses report kernel PCs (call sites, lock acquire sites). This module
//! turns them into function names and, when debug info is present, source
//! file and line.
//!
//! ## Sources
//!
//! - **`symbolizer`**: DWARF from the debug binary (`<trace-dir>/vmlinux`)
//!   via `gimli` + `addr2line`, with a per-address cache
//! - **`symbol_table`**: `nm` output (`<trace-dir>/vmlinux.syms`), used when
//!   DWARF has no function for a PC
//!
//! ```text
//! PC ──► Symbolizer (DWARF) ──► function + file:line
//!            │ no function
//!            ▼
//!        SymbolTable (nm) ──► function
//! ```
//!
//! Resolution happens only during the finalize pass. The dispatch loop never
//! symbolizes, so the per-record cost stays independent of debug info size.
//!
//! Kernel images are not position independent, so PCs are looked up as-is.

pub mod symbol_table;
pub mod symbolizer;

use serde::Serialize;
use std::fmt;

use crate::domain::Pc;

pub use symbol_table::SymbolTable;
pub use symbolizer::Symbolizer;

/// Source attribution of a PC
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLine {
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl fmt::Display for SourceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.function)?;
        if let Some(ref file) = self.file {
            write!(f, " at {file}")?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
        }
        Ok(())
    }
}

/// Maps a PC to its source attribution
pub trait SymbolResolver {
    fn resolve(&self, pc: Pc) -> Option<SourceLine>;
}

/// Resolver that knows nothing; useful when symbols are irrelevant
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolResolver for NoSymbols {
    fn resolve(&self, _pc: Pc) -> Option<SourceLine> {
        None
    }
}

/// DWARF first, then the `nm` table for the function name
pub struct ChainResolver {
    dwarf: Symbolizer,
    table: SymbolTable,
}

impl ChainResolver {
    #[must_use]
    pub fn new(dwarf: Symbolizer, table: SymbolTable) -> Self {
        Self { dwarf, table }
    }
}

impl SymbolResolver for ChainResolver {
    fn resolve(&self, pc: Pc) -> Option<SourceLine> {
        let from_dwarf = SymbolResolver::resolve(&self.dwarf, pc);
        match from_dwarf {
            Some(line) if line.function != "<unknown>" => Some(line),
            Some(line) => Some(SourceLine {
                function: self.table.resolve(pc).map_or(line.function, |t| t.function),
                ..line
            }),
            None => self.table.resolve(pc),
        }
    }
}
