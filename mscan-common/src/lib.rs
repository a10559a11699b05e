//! # Trace Wire Layouts (Simulator ↔ Scanner)
//!
//! Defines the fixed-size record layouts written by the instrumented simulator
//! and read back by `mscan`. All types use `#[repr(C)]` with explicit padding
//! fields so that every byte of a record is accounted for and any bit pattern
//! is a valid value.
//!
//! ## Record Framing
//!
//! Every record is a [`RecordHeader`] immediately followed by the payload for
//! the kind named in the header:
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────┐
//! │ RecordHeader (16 bytes)  │ payload (fixed size per kind)│
//! └──────────────────────────┴──────────────────────────────┘
//! ```
//!
//! Enumerated fields (host type, call state, label type, ...) are stored as raw
//! integers. Interpreting them is the reader's job, which keeps decoding total
//! and moves domain checks to the handlers that own them.
//!
//! Fields are in the byte order of the capture host (little-endian x86-64).

#![no_std]

use core::mem::size_of;

// ============================================================================
// Record Kind Tags
// ============================================================================

/// Memory access performed by a simulated CPU
pub const KIND_ACCESS: u8 = 1;

/// Host-side control record (trace enable scope, per-CPU call tracking)
pub const KIND_HOST: u8 = 2;

/// Function call state transition on a CPU
pub const KIND_FCALL: u8 = 3;

/// Label register/unregister for a named memory range
pub const KIND_LABEL: u8 = 4;

/// Lock operation (acquire request, acquired, release)
pub const KIND_LOCK: u8 = 5;

/// Application-reported data (cumulative operation count)
pub const KIND_APPDATA: u8 = 6;

// ============================================================================
// Host Sub-types
// ============================================================================

/// Enable tracing on all CPUs; carries the application name
pub const HOST_ACCESS_ALL_CPU: u32 = 1;

/// Start call tracking on one CPU
pub const HOST_CALL_SET_CPU: u32 = 2;

/// Stop call tracking on one CPU
pub const HOST_CALL_CLEAR_CPU: u32 = 3;

// ============================================================================
// Function Call States
// ============================================================================

pub const FCALL_RESUME: u32 = 0;
pub const FCALL_START: u32 = 1;
pub const FCALL_PAUSE: u32 = 2;
pub const FCALL_DONE: u32 = 3;

// ============================================================================
// Label Types
// ============================================================================

/// Heap object (kmalloc and friends)
pub const LABEL_HEAP: u32 = 1;

/// Page or block allocation
pub const LABEL_BLOCK: u32 = 2;

/// Static kernel data
pub const LABEL_STATIC: u32 = 3;

/// Per-CPU data
pub const LABEL_PERCPU: u32 = 4;

/// Exclusive upper bound for valid label types. Zero is never valid.
pub const LABEL_END: u32 = 5;

// ============================================================================
// Access Types
// ============================================================================

pub const ACCESS_LOAD: u8 = 1;
pub const ACCESS_STORE: u8 = 2;
pub const ACCESS_IFETCH: u8 = 3;

// ============================================================================
// Lock Operations
// ============================================================================

/// CPU started waiting for the lock
pub const LOCK_ACQUIRE: u8 = 1;

/// CPU now holds the lock
pub const LOCK_ACQUIRED: u8 = 2;

/// CPU released the lock
pub const LOCK_RELEASE: u8 = 3;

// ============================================================================
// Limits
// ============================================================================

/// Width of every fixed name field. Longer names are truncated on capture.
pub const NAME_LEN: usize = 32;

/// Number of per-CPU slots tracked by the scanner.
pub const MAX_CPUS: usize = 256;

/// Granularity used when counting distinct memory touched.
pub const CACHE_LINE_SIZE: u64 = 64;

// ============================================================================
// Plain-old-data marker
// ============================================================================

/// Marker for wire layouts that can be read from and written to raw bytes.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]`, contain no implicit padding and accept
/// every bit pattern for every field.
#[allow(unsafe_code)]
pub unsafe trait Pod: Copy + 'static {}

// ============================================================================
// Wire Structures
// ============================================================================

/// Header shared by every record
///
/// **Size**: 16 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record kind tag (see `KIND_*`)
    pub kind: u8,

    /// Padding for 2-byte alignment
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u8,

    /// Index of the simulated CPU that produced the record
    pub cpu: u16,

    /// Total record size in bytes, header included
    ///
    /// Must equal [`record_size`] for `kind`; anything else means the log was
    /// written by an incompatible capture build.
    pub size: u32,

    /// Simulator timestamp (cycles)
    pub ts: u64,
}

/// `KIND_ACCESS` payload
///
/// **Size**: 32 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessPayload {
    /// Load, store or instruction fetch (see `ACCESS_*`)
    pub access_type: u8,

    /// Non-zero if the access caused coherence traffic
    pub traffic: u8,

    /// Non-zero if the access was a locked (atomic) operation
    pub lock: u8,

    /// Padding for 8-byte alignment
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 5],

    /// Instruction that performed the access
    pub pc: u64,

    /// Guest physical/virtual address accessed
    pub guest_addr: u64,

    /// Access width in bytes
    pub bytes: u64,
}

/// `KIND_HOST` payload
///
/// **Size**: 48 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostPayload {
    /// Host sub-type (see `HOST_*`)
    pub host_type: u32,

    /// Target CPU for `HOST_CALL_SET_CPU` / `HOST_CALL_CLEAR_CPU`
    pub cpu: u32,

    /// Enable value for `HOST_ACCESS_ALL_CPU` (non-zero = tracing on)
    pub enable: u64,

    /// Application name, NUL-padded, not necessarily NUL-terminated
    pub name: [u8; NAME_LEN],
}

/// `KIND_FCALL` payload
///
/// **Size**: 32 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FcallPayload {
    /// Call state (see `FCALL_*`)
    pub state: u32,

    /// Nesting depth of the call on its CPU
    pub depth: u32,

    /// Guest thread id
    pub tid: u64,

    /// Entry PC of the call
    pub pc: u64,

    /// Opaque tag pairing start/done records of one call
    pub tag: u64,
}

/// `KIND_LABEL` payload
///
/// **Size**: 64 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LabelPayload {
    /// Label type (see `LABEL_*`)
    pub label_type: u32,

    /// Padding for 8-byte alignment
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,

    /// Start address of the labelled range
    pub guest_addr: u64,

    /// Length of the range; zero unregisters the label at `guest_addr`
    pub bytes: u64,

    /// PC that created the labelled object
    pub pc: u64,

    /// Label name, NUL-padded
    pub name: [u8; NAME_LEN],
}

/// `KIND_LOCK` payload
///
/// **Size**: 56 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockPayload {
    /// Operation (see `LOCK_*`)
    pub op: u8,

    /// Non-zero for a shared (reader) acquisition
    pub read: u8,

    /// Padding for 8-byte alignment
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 6],

    /// PC of the lock operation
    pub pc: u64,

    /// Address of the lock word
    pub lock: u64,

    /// Lock name, NUL-padded (empty when the capture side has none)
    pub name: [u8; NAME_LEN],
}

/// `KIND_APPDATA` payload
///
/// **Size**: 8 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppDataPayload {
    /// Cumulative application operation count
    pub u64: u64,
}

// These unsafe impls are required for reading records straight out of the
// decompressed stream. Every layout above is padding-free.
#[allow(unsafe_code)]
unsafe impl Pod for RecordHeader {}
#[allow(unsafe_code)]
unsafe impl Pod for AccessPayload {}
#[allow(unsafe_code)]
unsafe impl Pod for HostPayload {}
#[allow(unsafe_code)]
unsafe impl Pod for FcallPayload {}
#[allow(unsafe_code)]
unsafe impl Pod for LabelPayload {}
#[allow(unsafe_code)]
unsafe impl Pod for LockPayload {}
#[allow(unsafe_code)]
unsafe impl Pod for AppDataPayload {}

const _: () = assert!(size_of::<RecordHeader>() == 16);
const _: () = assert!(size_of::<AccessPayload>() == 32);
const _: () = assert!(size_of::<HostPayload>() == 48);
const _: () = assert!(size_of::<FcallPayload>() == 32);
const _: () = assert!(size_of::<LabelPayload>() == 64);
const _: () = assert!(size_of::<LockPayload>() == 56);
const _: () = assert!(size_of::<AppDataPayload>() == 8);

/// Size of the payload that follows a header of the given kind
#[must_use]
pub const fn payload_size(kind: u8) -> Option<usize> {
    match kind {
        KIND_ACCESS => Some(size_of::<AccessPayload>()),
        KIND_HOST => Some(size_of::<HostPayload>()),
        KIND_FCALL => Some(size_of::<FcallPayload>()),
        KIND_LABEL => Some(size_of::<LabelPayload>()),
        KIND_LOCK => Some(size_of::<LockPayload>()),
        KIND_APPDATA => Some(size_of::<AppDataPayload>()),
        _ => None,
    }
}

/// Total on-wire size of a record of the given kind, header included
#[must_use]
pub const fn record_size(kind: u8) -> Option<usize> {
    match payload_size(kind) {
        Some(payload) => Some(size_of::<RecordHeader>() + payload),
        None => None,
    }
}
