//! Default handlers
//!
//! These keep [`ScanState`] current and always run first in their kind's
//! chain, so every analysis handler sees state that already reflects the
//! record it is handling.
//!
//! | kind    | effect                                                    |
//! |---------|-----------------------------------------------------------|
//! | host    | scope descriptor, application name (first non-empty wins) |
//! | appdata | summary op count (last write wins)                        |
//! | fcall   | per-CPU call PC (start/resume set, pause/done clear)      |
//! | label   | label table add/remove                                    |

use log::debug;

use crate::codec::{
    AppDataRecord, CallState, FcallRecord, HostRecord, HostType, LabelRecord, Payload, Record,
    RecordKind,
};
use crate::domain::{CpuId, Pc, ScanError};
use crate::state::{Label, ScanState};

/// State-producing step in a handler chain
pub(crate) type StateUpdate = fn(&Record, &mut ScanState) -> Result<(), ScanError>;

/// Default handler for each kind, if any
pub(crate) fn default_for(kind: RecordKind) -> Option<StateUpdate> {
    match kind {
        RecordKind::Host => Some(handle_host),
        RecordKind::AppData => Some(handle_appdata),
        RecordKind::Fcall => Some(handle_fcall),
        RecordKind::Label => Some(handle_label),
        RecordKind::Access | RecordKind::Lock => None,
    }
}

pub(crate) fn handle_host(record: &Record, state: &mut ScanState) -> Result<(), ScanError> {
    let Payload::Host(host) = &record.payload else {
        return Err(wrong_payload(RecordKind::Host, record));
    };
    apply_host(host, state)
}

fn apply_host(host: &HostRecord, state: &mut ScanState) -> Result<(), ScanError> {
    match host.host_type {
        // Per-CPU call tracking scope is not narrowed by the scanner
        HostType::CallSetCpu | HostType::CallClearCpu => Ok(()),
        HostType::AccessAllCpu => {
            state.process.set_app_name_once(&host.name.as_str());
            state.process.set_scope(*host);
            debug!("scope: enable={} name={}", host.enable, host.name);
            Ok(())
        }
        HostType::Other(code) => {
            Err(ScanError::contract(RecordKind::Host, format!("unhandled host type {code}")))
        }
    }
}

pub(crate) fn handle_appdata(record: &Record, state: &mut ScanState) -> Result<(), ScanError> {
    let Payload::AppData(AppDataRecord { value }) = &record.payload else {
        return Err(wrong_payload(RecordKind::AppData, record));
    };
    state.process.set_app_ops(*value);
    Ok(())
}

pub(crate) fn handle_fcall(record: &Record, state: &mut ScanState) -> Result<(), ScanError> {
    let Payload::Fcall(fcall) = &record.payload else {
        return Err(wrong_payload(RecordKind::Fcall, record));
    };
    apply_fcall(record.cpu, fcall, state)
}

fn apply_fcall(cpu: CpuId, fcall: &FcallRecord, state: &mut ScanState) -> Result<(), ScanError> {
    let pc = match fcall.state {
        CallState::Start | CallState::Resume => fcall.pc,
        CallState::Pause | CallState::Done => Pc::NONE,
        CallState::Other(code) => {
            return Err(ScanError::contract(RecordKind::Fcall, format!("unknown call state {code}")));
        }
    };
    if !state.process.set_call_pc(cpu, pc) {
        return Err(ScanError::contract(RecordKind::Fcall, format!("cpu {} out of range", cpu.0)));
    }
    Ok(())
}

pub(crate) fn handle_label(record: &Record, state: &mut ScanState) -> Result<(), ScanError> {
    let Payload::Label(label) = &record.payload else {
        return Err(wrong_payload(RecordKind::Label, record));
    };
    apply_label(label, state)
}

fn apply_label(label: &LabelRecord, state: &mut ScanState) -> Result<(), ScanError> {
    if !label.label_type.is_valid() {
        return Err(ScanError::contract(
            RecordKind::Label,
            format!("bad label type: {}", label.label_type.code()),
        ));
    }

    if label.bytes == 0 {
        state.labels.remove(label.addr);
    } else {
        state.labels.add(Label::from(label));
    }
    Ok(())
}

fn wrong_payload(expected: RecordKind, record: &Record) -> ScanError {
    ScanError::contract(expected, format!("dispatched a {} record", record.kind()))
}
