//! Trace record codec
//!
//! - `record`: typed [`Record`] view and wire conversions
//! - `reader`: [`RecordReader`], one record per call, never resynchronises
//! - `writer`: [`RecordWriter`], the same layout for tests and tooling

mod pod;
pub mod reader;
pub mod record;
pub mod writer;

pub use reader::{RecordReader, TraceFileReader};
pub use record::{
    AccessRecord, AccessType, AppDataRecord, CallState, FcallRecord, FixedName, HostRecord,
    HostType, LabelRecord, LabelType, LockOp, LockRecord, Payload, Record, RecordKind,
};
pub use writer::{RecordWriter, TraceFileWriter};
