//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a data address where
//! a program counter is expected, and make handler signatures more expressive.

use mscan_common::{CACHE_LINE_SIZE, MAX_CPUS};
use serde::Serialize;
use std::fmt;

/// Simulated CPU index
///
/// Taken from the record header. Valid indices are `0..MAX_CPUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CpuId(pub u16);

impl CpuId {
    /// Returns the per-CPU slot index, or `None` if the CPU is out of range
    #[must_use]
    pub fn slot(self) -> Option<usize> {
        let idx = usize::from(self.0);
        (idx < MAX_CPUS).then_some(idx)
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU:{}", self.0)
    }
}

/// Program counter
///
/// Zero means "no call active" in per-CPU call tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Pc(pub u64);

impl Pc {
    pub const NONE: Pc = Pc(0);

    #[must_use]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Pc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Guest memory address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Address(pub u64);

impl Address {
    /// Cache line index containing this address
    #[must_use]
    pub fn cache_line(self) -> u64 {
        self.0 / CACHE_LINE_SIZE
    }

    /// Cache line indices touched by an access of `bytes` starting here
    ///
    /// A zero-width access still touches the line it points into.
    pub fn cache_lines(self, bytes: u64) -> impl Iterator<Item = u64> {
        self.cache_line()..=self.last_line(bytes)
    }

    /// Number of lines [`cache_lines`](Self::cache_lines) yields
    #[must_use]
    pub fn line_count(self, bytes: u64) -> u64 {
        self.last_line(bytes) - self.cache_line() + 1
    }

    fn last_line(self, bytes: u64) -> u64 {
        self.0.saturating_add(bytes.max(1) - 1) / CACHE_LINE_SIZE
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Simulator timestamp in cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Cycles elapsed since `earlier`, zero if the clock went backwards
    #[must_use]
    pub fn since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}cy", self.0)
    }
}
