use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::cell::RefCell;
use std::io::{Cursor, Write};
use std::rc::Rc;

use mscan::analysis::Analyses;
use mscan::codec::{
    AccessRecord, AccessType, AppDataRecord, CallState, FcallRecord, FixedName, HostRecord,
    HostType, LabelRecord, LabelType, LockOp, LockRecord, Payload, Record, RecordKind,
    RecordReader, RecordWriter,
};
use mscan::dispatch::{shared, Engine, EntryHandler, HandlerRegistry};
use mscan::domain::{Address, CpuId, Pc, ScanError, Timestamp};
use mscan::export::{OpenCall, ScanReport};
use mscan::state::ScanState;
use mscan::symbolization::{NoSymbols, SymbolResolver};

type GzReader = RecordReader<MultiGzDecoder<Cursor<Vec<u8>>>>;

fn raw(records: &[Record]) -> Vec<u8> {
    let mut writer = RecordWriter::new(Vec::new());
    for record in records {
        writer.write(record).unwrap();
    }
    writer.into_inner()
}

fn gzip(bytes: &[u8]) -> GzReader {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    RecordReader::new(MultiGzDecoder::new(Cursor::new(encoder.finish().unwrap())))
}

fn at(cpu: u16, ts: u64, payload: Payload) -> Record {
    Record::new(CpuId(cpu), Timestamp(ts), payload)
}

fn host(name: &str) -> Payload {
    Payload::Host(HostRecord {
        host_type: HostType::AccessAllCpu,
        target_cpu: 0,
        enable: 1,
        name: FixedName::from(name),
    })
}

fn fcall(state: CallState, pc: u64) -> Payload {
    Payload::Fcall(FcallRecord { state, depth: 0, tid: 7, pc: Pc(pc), tag: 0 })
}

fn label(label_type: LabelType, addr: u64, bytes: u64) -> Payload {
    Payload::Label(LabelRecord {
        label_type,
        addr: Address(addr),
        bytes,
        pc: Pc(0xffff_ffff_8100_0000),
        name: FixedName::from("dentry"),
    })
}

fn access(addr: u64) -> Payload {
    Payload::Access(AccessRecord {
        access_type: AccessType::Load,
        traffic: true,
        locked: false,
        pc: Pc(0x1234),
        addr: Address(addr),
        bytes: 8,
    })
}

/// Records every callback as "<name>:<event>"
struct Recorder {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl EntryHandler for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle(&mut self, record: &Record, _state: &ScanState) -> Result<(), ScanError> {
        self.log.borrow_mut().push(format!("{}:{}", self.name, record.kind()));
        Ok(())
    }

    fn finalize(
        &mut self,
        _state: &ScanState,
        _symbols: &dyn SymbolResolver,
    ) -> Result<(), ScanError> {
        self.log.borrow_mut().push(format!("{}:finalize", self.name));
        Ok(())
    }
}

#[test]
fn test_end_to_end_scenario() {
    let records = vec![
        at(0, 1, host("foo")),
        at(0, 2, Payload::AppData(AppDataRecord { value: 42 })),
        at(0, 3, fcall(CallState::Start, 0x100)),
        at(0, 4, fcall(CallState::Pause, 0)),
        at(0, 5, label(LabelType::Heap, 0x2000, 16)),
        at(0, 6, label(LabelType::Heap, 0x2000, 0)),
    ];

    let mut engine = Engine::new(HandlerRegistry::new());
    engine.run(&mut gzip(&raw(&records)), &NoSymbols).unwrap();

    let state = engine.state();
    assert_eq!(state.process.app_name(), Some("foo"));
    assert_eq!(state.process.summary().app_ops, 42);
    assert_eq!(state.process.call_pc(CpuId(0)), Pc(0));
    assert!(state.labels.is_empty());
}

#[test]
fn test_end_to_end_with_analyses() {
    let records = vec![
        at(0, 1, host("foo")),
        at(0, 2, host("bar")),
        at(1, 3, Payload::AppData(AppDataRecord { value: 41 })),
        at(1, 4, Payload::AppData(AppDataRecord { value: 42 })),
        at(2, 5, fcall(CallState::Start, 0xffff_ffff_8120_0000)),
        at(2, 6, access(0x1000)),
        at(2, 7, fcall(CallState::Done, 0xffff_ffff_8120_0000)),
        at(0, 8, label(LabelType::Heap, 0x8000, 64)),
        at(0, 9, label(LabelType::Heap, 0x8000, 0)),
    ];

    let mut registry = HandlerRegistry::new();
    let analyses = Analyses::install(&mut registry);
    let mut engine = Engine::new(registry);
    let count = engine.run(&mut gzip(&raw(&records)), &NoSymbols).unwrap();
    assert_eq!(count, 9);

    let state = engine.state();
    assert_eq!(state.process.app_name(), Some("foo"));
    assert_eq!(state.process.summary().app_ops, 42);
    assert_eq!(state.process.call_pc(CpuId(2)), Pc(0));
    assert!(state.labels.is_empty());
    assert_eq!(state.process.record_count(RecordKind::Host), 2);

    let syscalls = analyses.syscalls.borrow();
    let report = syscalls.report().unwrap();
    assert_eq!(report.total_distinct_lines, 1);
    assert_eq!(report.syscalls[0].calls, 1);

    let ops = analyses.ops.borrow();
    let ops_report = ops.report().unwrap();
    assert_eq!(ops_report.app_name.as_deref(), Some("foo"));
    assert_eq!(ops_report.lines_per_op, Some(1.0 / 42.0));
}

#[test]
fn test_truncated_log_skips_finalize() {
    let records = vec![at(0, 1, host("foo")), at(0, 2, Payload::AppData(AppDataRecord { value: 1 }))];
    let mut bytes = raw(&records);
    bytes.truncate(bytes.len() - 4);

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    let recorder = shared(Recorder { name: "r", log: Rc::clone(&log) });
    registry.register(RecordKind::Host, recorder.clone());
    registry.register_finalize(recorder);

    let mut engine = Engine::new(registry);
    let err = engine.run(&mut gzip(&bytes), &NoSymbols).unwrap_err();
    assert!(matches!(err, ScanError::Truncated { expected: 8, got: 4, .. }), "{err}");

    // Host was dispatched, finalize never ran
    assert_eq!(*log.borrow(), vec!["r:host".to_string()]);
    assert_eq!(engine.state().process.app_name(), Some("foo"));
}

#[test]
fn test_label_type_zero_is_fatal() {
    let records = vec![
        at(0, 1, label(LabelType::Other(0), 0x8000, 64)),
        at(0, 2, Payload::AppData(AppDataRecord { value: 5 })),
    ];

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    let recorder = shared(Recorder { name: "r", log: Rc::clone(&log) });
    registry.register(RecordKind::Label, recorder.clone());
    registry.register(RecordKind::AppData, recorder.clone());
    registry.register_finalize(recorder);

    let mut engine = Engine::new(registry);
    let err = engine.run(&mut gzip(&raw(&records)), &NoSymbols).unwrap_err();
    assert!(err.is_contract_violation());

    // The default handler rejected the record before any analysis saw it
    assert!(log.borrow().is_empty());
    assert_eq!(engine.state().process.summary().app_ops, 0);
}

#[test]
fn test_handler_and_finalize_order() {
    let records = vec![
        at(0, 1, fcall(CallState::Start, 0x100)),
        at(0, 2, fcall(CallState::Pause, 0x100)),
    ];

    let log = Rc::new(RefCell::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    let first = shared(Recorder { name: "a", log: Rc::clone(&log) });
    let second = shared(Recorder { name: "b", log: Rc::clone(&log) });
    registry.register(RecordKind::Fcall, first.clone());
    registry.register(RecordKind::Fcall, second.clone());
    registry.register_finalize(second);
    registry.register_finalize(first);

    let mut engine = Engine::new(registry);
    engine.run(&mut gzip(&raw(&records)), &NoSymbols).unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["a:fcall", "b:fcall", "a:fcall", "b:fcall", "b:finalize", "a:finalize"]
    );
}

#[test]
fn test_lock_name_from_label() {
    let lock = 0xffff_8880_0001_0000;
    let lock_payload = |op| {
        Payload::Lock(LockRecord {
            op,
            read: false,
            pc: Pc(0xffff_ffff_8110_0000),
            lock: Address(lock),
            name: FixedName::EMPTY,
        })
    };
    let records = vec![
        at(0, 1, label(LabelType::Static, lock - 8, 64)),
        at(0, 10, lock_payload(LockOp::Acquire)),
        at(0, 12, lock_payload(LockOp::Acquired)),
        at(1, 13, lock_payload(LockOp::Acquire)),
        at(0, 30, lock_payload(LockOp::Release)),
    ];

    let mut registry = HandlerRegistry::new();
    let analyses = Analyses::install(&mut registry);
    let mut engine = Engine::new(registry);
    engine.run(&mut gzip(&raw(&records)), &NoSymbols).unwrap();

    let sections = analyses.sections.borrow();
    let report = sections.report().unwrap();
    assert_eq!(report.locks.len(), 1);
    let section = &report.locks[0];
    assert_eq!(section.name.as_deref(), Some("dentry"));
    assert_eq!(section.total_hold, 18);
    assert_eq!(section.contended, 1);
}

#[test]
fn test_concatenated_gzip_members() {
    let first = raw(&[at(0, 1, host("foo"))]);
    let second = raw(&[at(0, 2, Payload::AppData(AppDataRecord { value: 3 }))]);

    let mut stream = Vec::new();
    for part in [first, second] {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&part).unwrap();
        stream.extend(encoder.finish().unwrap());
    }

    let mut engine = Engine::new(HandlerRegistry::new());
    let mut reader = RecordReader::new(MultiGzDecoder::new(Cursor::new(stream)));
    assert_eq!(engine.run(&mut reader, &NoSymbols).unwrap(), 2);
    assert_eq!(engine.state().process.summary().app_ops, 3);
}

#[test]
fn test_oversized_access_is_fatal() {
    let records = vec![
        at(0, 1, fcall(CallState::Start, 0x100)),
        at(
            0,
            2,
            Payload::Access(AccessRecord {
                access_type: AccessType::Store,
                traffic: false,
                locked: false,
                pc: Pc(0x104),
                addr: Address(0x1000),
                bytes: u64::MAX,
            }),
        ),
    ];

    let mut registry = HandlerRegistry::new();
    let analyses = Analyses::install(&mut registry);
    let mut engine = Engine::new(registry);
    let err = engine.run(&mut gzip(&raw(&records)), &NoSymbols).unwrap_err();

    assert!(err.is_contract_violation(), "{err}");
    assert!(analyses.syscalls.borrow().report().is_none());
}

#[test]
fn test_non_gzip_stream_skips_finalize() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut registry = HandlerRegistry::new();
    registry.register_finalize(shared(Recorder { name: "r", log: Rc::clone(&log) }));

    // Plain records, never compressed
    let plain = raw(&[at(0, 1, host("foo"))]);
    let mut reader = RecordReader::new(MultiGzDecoder::new(Cursor::new(plain)));

    let mut engine = Engine::new(registry);
    let err = engine.run(&mut reader, &NoSymbols).unwrap_err();
    assert!(matches!(err, ScanError::Io(_)), "{err}");
    assert!(log.borrow().is_empty());
    assert_eq!(engine.state().process.app_name(), None);
}

#[test]
fn test_open_calls_in_report() {
    let records = vec![
        at(0, 1, fcall(CallState::Start, 0x100)),
        at(0, 2, fcall(CallState::Done, 0x100)),
        at(3, 3, fcall(CallState::Start, 0x300)),
        at(3, 4, access(0x1000)),
    ];

    let mut registry = HandlerRegistry::new();
    let analyses = Analyses::install(&mut registry);
    let mut engine = Engine::new(registry);
    engine.run(&mut gzip(&raw(&records)), &NoSymbols).unwrap();

    let report = ScanReport::collect(engine.state(), &analyses).unwrap();
    assert_eq!(report.open_calls, vec![OpenCall { cpu: CpuId(3), pc: Pc(0x300) }]);
}
