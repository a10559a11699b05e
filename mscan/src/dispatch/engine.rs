//! # Dispatch Loop
//!
//! Single forward pass over the log:
//!
//! ```text
//! RecordReader ──► next_record() ──► registry chain for record.kind()
//!      │                               (defaults first, then analyses)
//!      │ end of stream
//!      ▼
//! finalize chain (registration order)
//! ```
//!
//! A decode error or a handler error stops the loop immediately and the
//! finalize pass is skipped: analyses assume they saw the whole log.

use log::{debug, info};
use std::io::Read;

use super::registry::HandlerRegistry;
use crate::codec::RecordReader;
use crate::domain::ScanError;
use crate::state::ScanState;
use crate::symbolization::SymbolResolver;

/// Owns the scan state and the handler chains for one run
pub struct Engine {
    registry: HandlerRegistry,
    state: ScanState,
}

impl Engine {
    #[must_use]
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry, state: ScanState::new() }
    }

    /// Scan every record, then run the finalize pass
    ///
    /// Returns the number of records dispatched.
    ///
    /// # Errors
    /// Returns the first decode error, contract violation or handler error.
    /// Finalize handlers do not run in that case.
    pub fn run<R: Read>(
        &mut self,
        reader: &mut RecordReader<R>,
        symbols: &dyn SymbolResolver,
    ) -> Result<u64, ScanError> {
        info!("Scanning log ...");
        while let Some(record) = reader.next_record()? {
            self.state.process.note_record(record.kind());
            self.registry.dispatch(&record, &mut self.state).inspect_err(|e| {
                debug!("record {} ({}) failed: {e}", reader.records_read(), record.kind());
            })?;
        }

        let records = reader.records_read();
        info!("Scanned {records} records, running {} finalizers", self.registry.finalize_len());
        self.registry.finalize(&self.state, symbols)?;
        Ok(records)
    }

    /// State after (or during) the run
    #[must_use]
    pub fn state(&self) -> &ScanState {
        &self.state
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }
}
