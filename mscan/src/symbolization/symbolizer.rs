use addr2line::Context;
use gimli::{EndianRcSlice, RunTimeEndian};
use object::{Object, ObjectSection};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use super::{SourceLine, SymbolResolver};
use crate::domain::{Pc, SymbolError};

/// Symbolizer for resolving kernel PCs to source locations
///
/// Loads DWARF from the debug binary (`vmlinux`) once. Includes a cache so
/// that a PC reported by many call sites or locks is only resolved once.
pub struct Symbolizer {
    ctx: Context<EndianRcSlice<RunTimeEndian>>,
    /// Cache of resolved frames by address
    cache: RefCell<HashMap<u64, ResolvedFrame>>,
}

impl Symbolizer {
    /// Create a new symbolizer for the given binary
    ///
    /// # Errors
    /// Returns an error if the binary file cannot be read or parsed, or if its DWARF sections are malformed
    pub fn new<P: AsRef<Path>>(binary_path: P) -> Result<Self, SymbolError> {
        let path = binary_path.as_ref();
        let binary_data = fs::read(path)
            .map_err(|source| SymbolError::ReadFailed { path: path.display().to_string(), source })?;

        let obj_file = object::File::parse(&*binary_data).map_err(|e| {
            SymbolError::ObjectParseFailed { path: path.display().to_string(), message: e.to_string() }
        })?;

        // Load DWARF debug info
        let endian =
            if obj_file.is_little_endian() { RunTimeEndian::Little } else { RunTimeEndian::Big };

        let load_section =
            |id: gimli::SectionId| -> Result<EndianRcSlice<RunTimeEndian>, gimli::Error> {
                let data = obj_file
                    .section_by_name(id.name())
                    .and_then(|section| section.uncompressed_data().ok())
                    .unwrap_or(std::borrow::Cow::Borrowed(&[][..]));
                Ok(EndianRcSlice::new(Rc::from(&*data), endian))
            };

        let dwarf = gimli::Dwarf::load(&load_section)?;
        let ctx = Context::from_dwarf(dwarf)?;

        Ok(Self { ctx, cache: RefCell::new(HashMap::new()) })
    }

    /// Resolve an instruction pointer to source location information
    ///
    /// Uses a cache to avoid re-resolving the same address multiple times.
    pub fn resolve(&self, addr: u64) -> ResolvedFrame {
        if let Some(cached) = self.cache.borrow().get(&addr) {
            return cached.clone();
        }

        let mut result = Vec::new();

        if let Ok(mut frame_iter) = self.ctx.find_frames(addr).skip_all_loads() {
            while let Ok(Some(frame)) = frame_iter.next() {
                let function = frame
                    .function
                    .and_then(|f| f.demangle().ok().map(|s| s.to_string()))
                    .unwrap_or_else(|| UNKNOWN.to_string());

                let location = frame.location.map(|loc| SourceLocation {
                    file: loc.file.map(std::string::ToString::to_string),
                    line: loc.line,
                });

                result.push(InlinedFrame { function, location });
            }
        }

        let resolved = ResolvedFrame {
            addr,
            frames: if result.is_empty() {
                vec![InlinedFrame { function: UNKNOWN.to_string(), location: None }]
            } else {
                result
            },
        };

        self.cache.borrow_mut().insert(addr, resolved.clone());

        resolved
    }
}

impl SymbolResolver for Symbolizer {
    /// Outermost (non-inlined) frame wins: that is the function the PC belongs to
    fn resolve(&self, pc: Pc) -> Option<SourceLine> {
        let resolved = Symbolizer::resolve(self, pc.0);
        let frame = resolved.frames.last()?;
        if !frame.is_known() && frame.location.is_none() {
            return None;
        }
        let (file, line) = frame
            .location
            .as_ref()
            .map_or((None, None), |loc| (loc.file.clone(), loc.line));
        Some(SourceLine { function: frame.function.clone(), file, line })
    }
}

const UNKNOWN: &str = "<unknown>";

/// A resolved PC (may contain multiple inlined frames)
#[derive(Debug, Clone)]
pub struct ResolvedFrame {
    pub addr: u64,
    pub frames: Vec<InlinedFrame>,
}

/// An inlined frame within a resolved frame
#[derive(Debug, Clone)]
pub struct InlinedFrame {
    pub function: String,
    pub location: Option<SourceLocation>,
}

impl InlinedFrame {
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.function != UNKNOWN
    }
}

/// Source code location
#[derive(Debug, Clone)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: Option<u32>,
}
