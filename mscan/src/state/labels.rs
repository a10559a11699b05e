//! Live register of labelled memory ranges
//!
//! Keyed by start address. Entries are added and removed while the log is
//! scanned, so a lookup reflects the labels alive at the current record; the
//! same address may carry a different label later in the stream.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::codec::{FixedName, LabelRecord, LabelType};
use crate::domain::{Address, Pc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub label_type: LabelType,
    pub addr: Address,
    pub bytes: u64,
    /// PC that created the labelled object
    pub pc: Pc,
    pub name: FixedName,
}

impl Label {
    /// True if `addr` falls inside `[self.addr, self.addr + bytes)`
    #[must_use]
    pub fn contains(&self, addr: Address) -> bool {
        addr.0 >= self.addr.0 && addr.0 - self.addr.0 < self.bytes
    }
}

impl From<&LabelRecord> for Label {
    fn from(record: &LabelRecord) -> Self {
        Self {
            label_type: record.label_type,
            addr: record.addr,
            bytes: record.bytes,
            pc: record.pc,
            name: record.name,
        }
    }
}

/// Address-ordered label map
///
/// Last write wins per start address. Overlapping ranges with different start
/// addresses are kept side by side; reconciling them is left to analyses.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    labels: BTreeMap<Address, Label>,
}

impl LabelTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the label starting at `label.addr`
    pub fn add(&mut self, label: Label) -> Option<Label> {
        self.labels.insert(label.addr, label)
    }

    /// Remove the label starting at `addr`
    pub fn remove(&mut self, addr: Address) -> Option<Label> {
        self.labels.remove(&addr)
    }

    #[must_use]
    pub fn get(&self, addr: Address) -> Option<&Label> {
        self.labels.get(&addr)
    }

    /// Label whose range covers `addr`
    ///
    /// Checks the closest label starting at or below `addr`. With overlapping
    /// ranges that is the innermost-starting one.
    #[must_use]
    pub fn find_containing(&self, addr: Address) -> Option<&Label> {
        self.labels
            .range((Bound::Unbounded, Bound::Included(addr)))
            .next_back()
            .map(|(_, label)| label)
            .filter(|label| label.contains(addr))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in address order
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }
}
