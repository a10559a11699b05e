//! Lock hold time and contention.
//!
//! A serial section is the interval between `acquired` and `release` of a
//! lock on one CPU. Read holds may overlap each other; any other overlap
//! seen at `acquire` time counts as contention.
//!
//! # Lock Name Resolution
//!
//! The name carried on the record wins. Unnamed locks are looked up in the
//! label table at the time of the first `acquired` (the lock is usually a
//! field inside a labelled object).

use serde::Serialize;
use std::collections::HashMap;

use crate::codec::{LockOp, LockRecord, Payload, Record, RecordKind};
use crate::dispatch::EntryHandler;
use crate::domain::{Address, CpuId, Pc, ScanError, Timestamp};
use crate::state::ScanState;
use crate::symbolization::{SourceLine, SymbolResolver};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialSection {
    pub lock: Address,
    pub name: Option<String>,
    pub acquires: u64,
    pub contended: u64,
    pub total_hold: u64,
    pub max_hold: u64,
    /// PC that acquired the lock most often
    pub top_pc: Option<Pc>,
    pub top_source: Option<SourceLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SerialSectionsReport {
    /// Sorted by total hold time, longest first
    pub locks: Vec<SerialSection>,
    pub unmatched_releases: u64,
    /// Holds still open at end of log
    pub still_held: u64,
}

#[derive(Debug, Clone, Copy)]
struct Holding {
    cpu: CpuId,
    since: Timestamp,
    read: bool,
}

#[derive(Debug, Default)]
struct LockStats {
    name: Option<String>,
    acquires: u64,
    contended: u64,
    total_hold: u64,
    max_hold: u64,
    acquire_pcs: HashMap<Pc, u64>,
}

impl LockStats {
    fn top_pc(&self) -> Option<Pc> {
        // Ties go to the lowest PC so reports are stable
        self.acquire_pcs
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(pc, _)| *pc)
    }
}

#[derive(Debug, Default)]
pub struct SerialSections {
    locks: HashMap<Address, LockStats>,
    holders: HashMap<Address, Vec<Holding>>,
    unmatched_releases: u64,
    report: Option<SerialSectionsReport>,
}

impl SerialSections {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn report(&self) -> Option<&SerialSectionsReport> {
        self.report.as_ref()
    }

    fn on_acquire(&mut self, cpu: CpuId, lock: &LockRecord) {
        let contended = self
            .holders
            .get(&lock.lock)
            .is_some_and(|held| held.iter().any(|h| h.cpu != cpu && !(h.read && lock.read)));
        if contended {
            self.locks.entry(lock.lock).or_default().contended += 1;
        }
    }

    fn on_acquired(&mut self, cpu: CpuId, ts: Timestamp, lock: &LockRecord, state: &ScanState) {
        let stats = self.locks.entry(lock.lock).or_default();
        stats.acquires += 1;
        *stats.acquire_pcs.entry(lock.pc).or_default() += 1;
        if stats.name.is_none() {
            stats.name = if lock.name.is_empty() {
                state.labels.find_containing(lock.lock).map(|label| label.name.as_str().into_owned())
            } else {
                Some(lock.name.as_str().into_owned())
            };
        }

        self.holders.entry(lock.lock).or_default().push(Holding { cpu, since: ts, read: lock.read });
    }

    fn on_release(&mut self, cpu: CpuId, ts: Timestamp, lock: &LockRecord) {
        let Some(held) = self.holders.get_mut(&lock.lock) else {
            self.unmatched_releases += 1;
            return;
        };
        let Some(pos) = held.iter().rposition(|h| h.cpu == cpu) else {
            self.unmatched_releases += 1;
            return;
        };
        let holding = held.remove(pos);
        if held.is_empty() {
            self.holders.remove(&lock.lock);
        }

        let hold = ts.since(holding.since);
        let stats = self.locks.entry(lock.lock).or_default();
        stats.total_hold += hold;
        stats.max_hold = stats.max_hold.max(hold);
    }
}

impl EntryHandler for SerialSections {
    fn name(&self) -> &'static str {
        "serial-sections"
    }

    fn handle(&mut self, record: &Record, state: &ScanState) -> Result<(), ScanError> {
        let Payload::Lock(lock) = &record.payload else {
            return Ok(());
        };
        match lock.op {
            LockOp::Acquire => self.on_acquire(record.cpu, lock),
            LockOp::Acquired => self.on_acquired(record.cpu, record.ts, lock, state),
            LockOp::Release => self.on_release(record.cpu, record.ts, lock),
            LockOp::Other(code) => {
                return Err(ScanError::contract(
                    RecordKind::Lock,
                    format!("bad lock op: {code}"),
                ));
            }
        }
        Ok(())
    }

    fn finalize(
        &mut self,
        _state: &ScanState,
        symbols: &dyn SymbolResolver,
    ) -> Result<(), ScanError> {
        let mut locks: Vec<SerialSection> = self
            .locks
            .iter()
            .map(|(addr, stats)| {
                let top_pc = stats.top_pc();
                SerialSection {
                    lock: *addr,
                    name: stats.name.clone(),
                    acquires: stats.acquires,
                    contended: stats.contended,
                    total_hold: stats.total_hold,
                    max_hold: stats.max_hold,
                    top_pc,
                    top_source: top_pc.and_then(|pc| symbols.resolve(pc)),
                }
            })
            .collect();
        locks.sort_by(|a, b| b.total_hold.cmp(&a.total_hold).then(a.lock.cmp(&b.lock)));

        self.report = Some(SerialSectionsReport {
            locks,
            unmatched_releases: self.unmatched_releases,
            still_held: self.holders.values().map(|h| h.len() as u64).sum(),
        });
        Ok(())
    }
}
