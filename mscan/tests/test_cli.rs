use std::path::Path;
use std::process::{Command, Output};

use mscan::codec::{
    AppDataRecord, CallState, FcallRecord, FixedName, HostRecord, HostType, LabelRecord,
    LabelType, Payload, Record, TraceFileWriter,
};
use mscan::domain::{Address, CpuId, Pc, Timestamp};

const BIN: &str = env!("CARGO_BIN_EXE_mscan");

const SYMS: &str = "\
ffffffff81000000 T _stext
ffffffff81200000 T __x64_sys_openat
ffffffff81200400 t do_sys_openat2
";

/// Lay out a trace directory the way the capture tooling does
fn trace_dir(dir: &Path, records: &[Record]) {
    std::fs::copy(BIN, dir.join("vmlinux")).unwrap();
    std::fs::write(dir.join("vmlinux.syms"), SYMS).unwrap();

    let mut writer = TraceFileWriter::create(dir.join("trace.gz")).unwrap();
    for record in records {
        writer.write(record).unwrap();
    }
    writer.finish().unwrap();
}

fn mscan(args: &[&str]) -> Output {
    Command::new(BIN).args(args).env_remove("RUST_LOG").output().unwrap()
}

fn scenario() -> Vec<Record> {
    let rec = |ts, payload| Record::new(CpuId(0), Timestamp(ts), payload);
    vec![
        rec(
            1,
            Payload::Host(HostRecord {
                host_type: HostType::AccessAllCpu,
                target_cpu: 0,
                enable: 1,
                name: FixedName::from("foo"),
            }),
        ),
        rec(2, Payload::AppData(AppDataRecord { value: 42 })),
        rec(
            3,
            Payload::Fcall(FcallRecord {
                state: CallState::Start,
                depth: 0,
                tid: 1,
                pc: Pc(0xffff_ffff_8120_0010),
                tag: 0,
            }),
        ),
        rec(
            4,
            Payload::Fcall(FcallRecord {
                state: CallState::Done,
                depth: 0,
                tid: 1,
                pc: Pc(0xffff_ffff_8120_0010),
                tag: 0,
            }),
        ),
    ]
}

#[test]
fn test_scan_and_export() {
    let dir = tempfile::tempdir().unwrap();
    trace_dir(dir.path(), &scenario());
    let export = dir.path().join("report.json");

    let output = mscan(&[
        dir.path().to_str().unwrap(),
        "trace.gz",
        "--export",
        export.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Scanning log file"), "stdout: {stdout}");
    assert!(stdout.contains("app: foo"), "stdout: {stdout}");

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(json["app_name"], "foo");
    assert_eq!(json["app_ops"], 42);
    assert_eq!(json["records"]["fcall"], 2);
    assert_eq!(json["distinct_syscalls"]["syscalls"][0]["calls"], 1);
    assert_eq!(
        json["distinct_syscalls"]["syscalls"][0]["source"]["function"],
        "__x64_sys_openat"
    );
}

#[test]
fn test_quiet_prints_nothing() {
    let dir = tempfile::tempdir().unwrap();
    trace_dir(dir.path(), &scenario());

    let output = mscan(&["-q", dir.path().to_str().unwrap(), "trace.gz"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_missing_log_names_path() {
    let dir = tempfile::tempdir().unwrap();
    trace_dir(dir.path(), &scenario());

    let output = mscan(&[dir.path().to_str().unwrap(), "missing.gz"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error:"), "stderr: {stderr}");
    assert!(stderr.contains("missing.gz"), "stderr: {stderr}");
}

#[test]
fn test_missing_symbols_names_path() {
    let dir = tempfile::tempdir().unwrap();
    trace_dir(dir.path(), &scenario());
    std::fs::remove_file(dir.path().join("vmlinux.syms")).unwrap();

    let output = mscan(&[dir.path().to_str().unwrap(), "trace.gz"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("vmlinux.syms"));
}

#[test]
fn test_missing_debug_binary_names_path() {
    let dir = tempfile::tempdir().unwrap();
    trace_dir(dir.path(), &scenario());
    std::fs::remove_file(dir.path().join("vmlinux")).unwrap();

    let output = mscan(&[dir.path().to_str().unwrap(), "trace.gz"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load debug info"), "{stderr}");
    assert!(stderr.contains(&dir.path().join("vmlinux").display().to_string()), "{stderr}");
}

#[test]
fn test_wrong_argument_count() {
    let output = mscan(&["only-one"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!output.stderr.is_empty());
}

#[test]
fn test_contract_violation_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let mut records = scenario();
    records.push(Record::new(
        CpuId(0),
        Timestamp(5),
        Payload::Label(LabelRecord {
            label_type: LabelType::Other(0),
            addr: Address(0x1000),
            bytes: 8,
            pc: Pc(0),
            name: FixedName::EMPTY,
        }),
    ));
    trace_dir(dir.path(), &records);

    let output = mscan(&[dir.path().to_str().unwrap(), "trace.gz"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("contract violation"), "stderr: {stderr}");
    assert_eq!(stderr.lines().count(), 1);
}
