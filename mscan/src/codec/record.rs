//! Typed view over decoded trace records
//!
//! [`Record`] is the tagged union handed to handlers. The payload enum makes
//! it impossible to read the wrong arm for a kind; enumerated wire fields are
//! decoded into enums with an `Other` arm so that decoding stays total and the
//! handler owning a field decides whether an unknown value is fatal.

use std::borrow::Cow;
use std::fmt;

use mscan_common::{
    AccessPayload, AppDataPayload, FcallPayload, HostPayload, LabelPayload, LockPayload,
    ACCESS_IFETCH, ACCESS_LOAD, ACCESS_STORE, FCALL_DONE, FCALL_PAUSE, FCALL_RESUME,
    FCALL_START, HOST_ACCESS_ALL_CPU, HOST_CALL_CLEAR_CPU, HOST_CALL_SET_CPU, KIND_ACCESS,
    KIND_APPDATA, KIND_FCALL, KIND_HOST, KIND_LABEL, KIND_LOCK, LABEL_BLOCK, LABEL_END,
    LABEL_HEAP, LABEL_PERCPU, LABEL_STATIC, LOCK_ACQUIRE, LOCK_ACQUIRED, LOCK_RELEASE, NAME_LEN,
};

use crate::domain::{Address, CpuId, Pc, ScanError, Timestamp};

// ============================================================================
// Record kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Access,
    Host,
    Fcall,
    Label,
    Lock,
    AppData,
}

impl RecordKind {
    pub const COUNT: usize = 6;

    pub const ALL: [RecordKind; Self::COUNT] = [
        RecordKind::Access,
        RecordKind::Host,
        RecordKind::Fcall,
        RecordKind::Label,
        RecordKind::Lock,
        RecordKind::AppData,
    ];

    /// Wire tag for this kind
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            RecordKind::Access => KIND_ACCESS,
            RecordKind::Host => KIND_HOST,
            RecordKind::Fcall => KIND_FCALL,
            RecordKind::Label => KIND_LABEL,
            RecordKind::Lock => KIND_LOCK,
            RecordKind::AppData => KIND_APPDATA,
        }
    }

    /// Dense index used for per-kind tables
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            RecordKind::Access => 0,
            RecordKind::Host => 1,
            RecordKind::Fcall => 2,
            RecordKind::Label => 3,
            RecordKind::Lock => 4,
            RecordKind::AppData => 5,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RecordKind::Access => "access",
            RecordKind::Host => "host",
            RecordKind::Fcall => "fcall",
            RecordKind::Label => "label",
            RecordKind::Lock => "lock",
            RecordKind::AppData => "appdata",
        }
    }

    pub(crate) fn payload_what(self) -> &'static str {
        match self {
            RecordKind::Access => "access payload",
            RecordKind::Host => "host payload",
            RecordKind::Fcall => "fcall payload",
            RecordKind::Label => "label payload",
            RecordKind::Lock => "lock payload",
            RecordKind::AppData => "appdata payload",
        }
    }
}

impl TryFrom<u8> for RecordKind {
    type Error = ScanError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            KIND_ACCESS => Ok(RecordKind::Access),
            KIND_HOST => Ok(RecordKind::Host),
            KIND_FCALL => Ok(RecordKind::Fcall),
            KIND_LABEL => Ok(RecordKind::Label),
            KIND_LOCK => Ok(RecordKind::Lock),
            KIND_APPDATA => Ok(RecordKind::AppData),
            other => Err(ScanError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Enumerated fields
// ============================================================================

/// Generates a wire-code enum with an `Other` arm and both conversions.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident : $repr:ty { $($variant:ident = $code:path),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            /// Value outside the known set
            Other($repr),
        }

        impl From<$repr> for $name {
            fn from(code: $repr) -> Self {
                match code {
                    $($code => $name::$variant,)+
                    other => $name::Other(other),
                }
            }
        }

        impl $name {
            /// Wire encoding of this value
            #[must_use]
            pub fn code(self) -> $repr {
                match self {
                    $($name::$variant => $code,)+
                    $name::Other(other) => other,
                }
            }
        }
    };
}

wire_enum! {
    /// Host record sub-type
    HostType: u32 {
        AccessAllCpu = HOST_ACCESS_ALL_CPU,
        CallSetCpu = HOST_CALL_SET_CPU,
        CallClearCpu = HOST_CALL_CLEAR_CPU,
    }
}

wire_enum! {
    /// Function call state carried by fcall records
    CallState: u32 {
        Resume = FCALL_RESUME,
        Start = FCALL_START,
        Pause = FCALL_PAUSE,
        Done = FCALL_DONE,
    }
}

wire_enum! {
    /// Label category. Only codes in `(0, LABEL_END)` are valid.
    LabelType: u32 {
        Heap = LABEL_HEAP,
        Block = LABEL_BLOCK,
        Static = LABEL_STATIC,
        PerCpu = LABEL_PERCPU,
    }
}

wire_enum! {
    AccessType: u8 {
        Load = ACCESS_LOAD,
        Store = ACCESS_STORE,
        IFetch = ACCESS_IFETCH,
    }
}

wire_enum! {
    /// Lock operation
    LockOp: u8 {
        Acquire = LOCK_ACQUIRE,
        Acquired = LOCK_ACQUIRED,
        Release = LOCK_RELEASE,
    }
}

impl LabelType {
    /// True if the code lies in `(0, LABEL_END)`
    #[must_use]
    pub fn is_valid(self) -> bool {
        let code = self.code();
        code != 0 && code < LABEL_END
    }
}

// ============================================================================
// Fixed-width names
// ============================================================================

/// Bounded name field as stored on the wire
///
/// Names longer than [`NAME_LEN`] bytes are truncated when built from a
/// string. Reading stops at the first NUL; a full field without NUL is used
/// whole.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedName([u8; NAME_LEN]);

impl FixedName {
    pub const EMPTY: FixedName = FixedName([0; NAME_LEN]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; NAME_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; NAME_LEN] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// Name text up to the first NUL, lossily decoded
    #[must_use]
    pub fn as_str(&self) -> Cow<'_, str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        String::from_utf8_lossy(&self.0[..end])
    }
}

impl From<&str> for FixedName {
    fn from(name: &str) -> Self {
        let mut bytes = [0u8; NAME_LEN];
        let len = name.len().min(NAME_LEN);
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self(bytes)
    }
}

impl Default for FixedName {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for FixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for FixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// One decoded trace record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub cpu: CpuId,
    pub ts: Timestamp,
    pub payload: Payload,
}

impl Record {
    #[must_use]
    pub fn new(cpu: CpuId, ts: Timestamp, payload: Payload) -> Self {
        Self { cpu, ts, payload }
    }

    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.payload.kind()
    }
}

/// Kind-specific part of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Access(AccessRecord),
    Host(HostRecord),
    Fcall(FcallRecord),
    Label(LabelRecord),
    Lock(LockRecord),
    AppData(AppDataRecord),
}

impl Payload {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Payload::Access(_) => RecordKind::Access,
            Payload::Host(_) => RecordKind::Host,
            Payload::Fcall(_) => RecordKind::Fcall,
            Payload::Label(_) => RecordKind::Label,
            Payload::Lock(_) => RecordKind::Lock,
            Payload::AppData(_) => RecordKind::AppData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    pub access_type: AccessType,
    pub traffic: bool,
    pub locked: bool,
    pub pc: Pc,
    pub addr: Address,
    pub bytes: u64,
}

/// Host control record; for `AccessAllCpu` this is the scope descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRecord {
    pub host_type: HostType,
    pub target_cpu: u32,
    pub enable: u64,
    pub name: FixedName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FcallRecord {
    pub state: CallState,
    pub depth: u32,
    pub tid: u64,
    pub pc: Pc,
    pub tag: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelRecord {
    pub label_type: LabelType,
    pub addr: Address,
    /// Zero unregisters the label at `addr`
    pub bytes: u64,
    pub pc: Pc,
    pub name: FixedName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRecord {
    pub op: LockOp,
    pub read: bool,
    pub pc: Pc,
    pub lock: Address,
    pub name: FixedName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppDataRecord {
    pub value: u64,
}

// ============================================================================
// Wire conversions
// ============================================================================

impl From<AccessPayload> for AccessRecord {
    fn from(raw: AccessPayload) -> Self {
        Self {
            access_type: raw.access_type.into(),
            traffic: raw.traffic != 0,
            locked: raw.lock != 0,
            pc: Pc(raw.pc),
            addr: Address(raw.guest_addr),
            bytes: raw.bytes,
        }
    }
}

impl AccessRecord {
    #[must_use]
    pub fn to_wire(&self) -> AccessPayload {
        AccessPayload {
            access_type: self.access_type.code(),
            traffic: u8::from(self.traffic),
            lock: u8::from(self.locked),
            _padding: [0; 5],
            pc: self.pc.0,
            guest_addr: self.addr.0,
            bytes: self.bytes,
        }
    }
}

impl From<HostPayload> for HostRecord {
    fn from(raw: HostPayload) -> Self {
        Self {
            host_type: raw.host_type.into(),
            target_cpu: raw.cpu,
            enable: raw.enable,
            name: FixedName::from_bytes(raw.name),
        }
    }
}

impl HostRecord {
    #[must_use]
    pub fn to_wire(&self) -> HostPayload {
        HostPayload {
            host_type: self.host_type.code(),
            cpu: self.target_cpu,
            enable: self.enable,
            name: *self.name.as_bytes(),
        }
    }
}

impl From<FcallPayload> for FcallRecord {
    fn from(raw: FcallPayload) -> Self {
        Self {
            state: raw.state.into(),
            depth: raw.depth,
            tid: raw.tid,
            pc: Pc(raw.pc),
            tag: raw.tag,
        }
    }
}

impl FcallRecord {
    #[must_use]
    pub fn to_wire(&self) -> FcallPayload {
        FcallPayload {
            state: self.state.code(),
            depth: self.depth,
            tid: self.tid,
            pc: self.pc.0,
            tag: self.tag,
        }
    }
}

impl From<LabelPayload> for LabelRecord {
    fn from(raw: LabelPayload) -> Self {
        Self {
            label_type: raw.label_type.into(),
            addr: Address(raw.guest_addr),
            bytes: raw.bytes,
            pc: Pc(raw.pc),
            name: FixedName::from_bytes(raw.name),
        }
    }
}

impl LabelRecord {
    #[must_use]
    pub fn to_wire(&self) -> LabelPayload {
        LabelPayload {
            label_type: self.label_type.code(),
            _padding: 0,
            guest_addr: self.addr.0,
            bytes: self.bytes,
            pc: self.pc.0,
            name: *self.name.as_bytes(),
        }
    }
}

impl From<LockPayload> for LockRecord {
    fn from(raw: LockPayload) -> Self {
        Self {
            op: raw.op.into(),
            read: raw.read != 0,
            pc: Pc(raw.pc),
            lock: Address(raw.lock),
            name: FixedName::from_bytes(raw.name),
        }
    }
}

impl LockRecord {
    #[must_use]
    pub fn to_wire(&self) -> LockPayload {
        LockPayload {
            op: self.op.code(),
            read: u8::from(self.read),
            _padding: [0; 6],
            pc: self.pc.0,
            lock: self.lock.0,
            name: *self.name.as_bytes(),
        }
    }
}

impl From<AppDataPayload> for AppDataRecord {
    fn from(raw: AppDataPayload) -> Self {
        Self { value: raw.u64 }
    }
}

impl AppDataRecord {
    #[must_use]
    pub fn to_wire(&self) -> AppDataPayload {
        AppDataPayload { u64: self.value }
    }
}
