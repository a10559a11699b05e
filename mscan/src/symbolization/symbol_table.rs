//! `nm`-style symbol table (`vmlinux.syms`)
//!
//! Each line is `<hex address> <type> <name>`. Only text symbols are kept,
//! since the table is used to name the function a PC falls into.

use log::{info, warn};
use std::fs;
use std::path::Path;

use super::{SourceLine, SymbolResolver};
use crate::domain::{Pc, SymbolError};

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// (address, name), sorted by address
    symbols: Vec<(u64, String)>,
}

impl SymbolTable {
    /// Load and parse a symbol table file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read. Malformed lines are skipped.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SymbolError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|source| SymbolError::ReadFailed { path: path.display().to_string(), source })?;
        let table = Self::parse(&content);
        info!("Loaded {} text symbols from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parse `nm` output
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut symbols = Vec::new();
        let mut skipped = 0usize;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            // Parse the line: "address type name [module]"
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                skipped += 1;
                continue;
            }
            let Ok(addr) = u64::from_str_radix(parts[0], 16) else {
                skipped += 1;
                continue;
            };
            if is_text_symbol(parts[1]) {
                symbols.push((addr, parts[2].to_string()));
            }
        }

        if skipped > 0 {
            warn!("Skipped {skipped} malformed symbol table lines");
        }

        symbols.sort_by(|a, b| a.0.cmp(&b.0));
        Self { symbols }
    }

    /// Symbol containing `addr`: the greatest symbol at or below it, with offset
    #[must_use]
    pub fn lookup(&self, addr: u64) -> Option<(&str, u64)> {
        let idx = self.symbols.partition_point(|(start, _)| *start <= addr);
        let (start, name) = self.symbols.get(idx.checked_sub(1)?)?;
        Some((name.as_str(), addr - start))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

fn is_text_symbol(kind: &str) -> bool {
    matches!(kind, "T" | "t" | "W" | "w")
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, pc: Pc) -> Option<SourceLine> {
        let (name, _) = self.lookup(pc.0)?;
        Some(SourceLine { function: name.to_string(), file: None, line: None })
    }
}
