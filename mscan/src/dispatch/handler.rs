//! Analysis handler capability

use std::cell::RefCell;
use std::rc::Rc;

use crate::codec::Record;
use crate::domain::ScanError;
use crate::state::ScanState;
use crate::symbolization::SymbolResolver;

/// A stateful analysis fed by the dispatch loop
///
/// `handle` is called for every record of each kind the handler was
/// registered for, after the default handlers have updated [`ScanState`] for
/// that record. `finalize` is called once, after the last record, if the
/// handler was registered for the finalize pass.
///
/// Returning an error aborts the run; no further handler sees a record and
/// the finalize pass is skipped.
pub trait EntryHandler {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Observe one record
    ///
    /// # Errors
    /// Returns an error if the record violates a contract the handler relies on.
    fn handle(&mut self, record: &Record, state: &ScanState) -> Result<(), ScanError> {
        let _ = (record, state);
        Ok(())
    }

    /// End-of-stream pass
    ///
    /// # Errors
    /// Returns an error if the handler cannot complete its analysis.
    fn finalize(
        &mut self,
        state: &ScanState,
        symbols: &dyn SymbolResolver,
    ) -> Result<(), ScanError> {
        let _ = (state, symbols);
        Ok(())
    }
}

/// Handle registered in one or more chains
///
/// Analyses subscribe to several kinds and to finalize with the same
/// instance, and callers keep a typed handle to read results afterwards.
pub type SharedHandler = Rc<RefCell<dyn EntryHandler>>;

/// Wrap a handler for registration, keeping the concrete type for the caller
pub fn shared<H: EntryHandler + 'static>(handler: H) -> Rc<RefCell<H>> {
    Rc::new(RefCell::new(handler))
}
