//! Handler chains per record kind, plus the finalize chain

use log::debug;

use super::defaults::{default_for, StateUpdate};
use super::handler::SharedHandler;
use crate::codec::{Record, RecordKind};
use crate::domain::ScanError;
use crate::state::ScanState;
use crate::symbolization::SymbolResolver;

/// One step of a kind's chain
enum Link {
    /// Default handler: the only kind of step allowed to mutate state
    State(StateUpdate),
    Analysis(SharedHandler),
}

/// Ordered handler chains
///
/// Within a kind's chain handlers run in registration order. The default
/// handler for a kind is installed when the registry is created, so it is
/// always ahead of every analysis registered for that kind.
pub struct HandlerRegistry {
    chains: [Vec<Link>; RecordKind::COUNT],
    finalizers: Vec<SharedHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    /// Registry holding only the default handlers
    #[must_use]
    pub fn new() -> Self {
        let chains = RecordKind::ALL.map(|kind| default_for(kind).map(Link::State).into_iter().collect());
        Self { chains, finalizers: Vec::new() }
    }

    /// Append `handler` to the chain for `kind`
    pub fn register(&mut self, kind: RecordKind, handler: SharedHandler) {
        debug!("register {} for {kind}", handler.borrow().name());
        self.chains[kind.index()].push(Link::Analysis(handler));
    }

    /// Append `handler` to the finalize chain
    pub fn register_finalize(&mut self, handler: SharedHandler) {
        debug!("register {} for finalize", handler.borrow().name());
        self.finalizers.push(handler);
    }

    /// Number of handlers (defaults included) run for `kind`
    #[must_use]
    pub fn chain_len(&self, kind: RecordKind) -> usize {
        self.chains[kind.index()].len()
    }

    #[must_use]
    pub fn finalize_len(&self) -> usize {
        self.finalizers.len()
    }

    /// Run the chain for `record`'s kind, stopping at the first error
    pub(crate) fn dispatch(&self, record: &Record, state: &mut ScanState) -> Result<(), ScanError> {
        for link in &self.chains[record.kind().index()] {
            match link {
                Link::State(update) => update(record, state)?,
                Link::Analysis(handler) => handler.borrow_mut().handle(record, state)?,
            }
        }
        Ok(())
    }

    /// Run every finalize handler in registration order
    pub(crate) fn finalize(
        &self,
        state: &ScanState,
        symbols: &dyn SymbolResolver,
    ) -> Result<(), ScanError> {
        for handler in &self.finalizers {
            let mut handler = handler.borrow_mut();
            debug!("finalize {}", handler.name());
            handler.finalize(state, symbols)?;
        }
        Ok(())
    }
}
