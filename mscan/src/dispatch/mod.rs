//! Event dispatch engine
//!
//! - `handler`: the [`EntryHandler`] capability analyses implement
//! - `registry`: per-kind handler chains and the finalize chain
//! - `defaults`: the four state-producing handlers every chain starts with
//! - `engine`: the single-pass dispatch loop

pub mod defaults;
pub mod engine;
pub mod handler;
pub mod registry;

pub use engine::Engine;
pub use handler::{shared, EntryHandler, SharedHandler};
pub use registry::HandlerRegistry;
