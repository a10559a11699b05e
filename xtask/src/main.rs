use anyhow::{Context, Result};
use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use mscan::codec::{
    AccessRecord, AccessType, AppDataRecord, CallState, FcallRecord, FixedName, HostRecord,
    HostType, LabelRecord, LabelType, LockOp, LockRecord, Payload, Record, RecordWriter,
};
use mscan::domain::{Address, CpuId, Pc, Timestamp};
use mscan_common::{CACHE_LINE_SIZE, MAX_CPUS};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Write a synthetic trace directory for manual runs of mscan
    GenTrace {
        #[arg(long)]
        out: PathBuf,
        /// Calls issued per CPU
        #[arg(long, default_value = "16")]
        calls: u64,
        #[arg(long, default_value = "4")]
        cpus: u16,
        /// Debug binary to copy in as vmlinux
        #[arg(long)]
        elf: Option<PathBuf>,
        #[arg(long)]
        fast: bool,
    },
}

/// Fake kernel text layout, mirrored into vmlinux.syms
const SYSCALLS: [(u64, &str); 3] = [
    (0xffff_ffff_8120_0000, "__x64_sys_openat"),
    (0xffff_ffff_8121_0000, "__x64_sys_read"),
    (0xffff_ffff_8122_0000, "__x64_sys_close"),
];
const LOCK_SITE: (u64, &str) = (0xffff_ffff_8110_0000, "_raw_spin_lock");
const TEXT_START: u64 = 0xffff_ffff_8100_0000;

const FILES_LOCK: u64 = 0xffff_8880_0010_0000;
const HEAP_BASE: u64 = 0xffff_8880_0200_0000;

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::GenTrace { out, calls, cpus, elf, fast } => {
            anyhow::ensure!(
                cpus > 0 && usize::from(cpus) <= MAX_CPUS,
                "--cpus must be between 1 and {MAX_CPUS}"
            );
            gen_trace(&out, calls, cpus, elf.as_deref(), fast)?;
        }
    }

    Ok(())
}

fn gen_trace(out: &Path, calls: u64, cpus: u16, elf: Option<&Path>, fast: bool) -> Result<()> {
    fs::create_dir_all(out).with_context(|| format!("Failed to create {}", out.display()))?;

    let trace_path = out.join("trace.gz");
    let file = File::create(&trace_path)
        .with_context(|| format!("Failed to create {}", trace_path.display()))?;
    let level = if fast { Compression::fast() } else { Compression::default() };
    let mut writer = RecordWriter::new(GzEncoder::new(BufWriter::new(file), level));

    for record in synthetic_records(calls, cpus) {
        writer.write(&record).context("Failed to write record")?;
    }
    let written = writer.records_written();
    writer.into_inner().finish().context("Failed to finish gzip stream")?;

    fs::write(out.join("vmlinux.syms"), syms_text()).context("Failed to write vmlinux.syms")?;

    if let Some(elf) = elf {
        fs::copy(elf, out.join("vmlinux"))
            .with_context(|| format!("Failed to copy {}", elf.display()))?;
    }

    println!("✓ Synthetic trace written");
    println!("  Records: {written}");
    println!("  Trace: {}", trace_path.display());
    if elf.is_none() {
        println!("  Note: copy a debug binary to {}/vmlinux before scanning", out.display());
    }

    Ok(())
}

fn syms_text() -> String {
    let mut syms = vec![(TEXT_START, "_stext"), LOCK_SITE];
    syms.extend(SYSCALLS);
    syms.iter().map(|(addr, name)| format!("{addr:016x} T {name}\n")).collect()
}

/// One run: every CPU issues `calls` syscalls, each touching a few shared
/// and private cache lines and taking the files lock once
fn synthetic_records(calls: u64, cpus: u16) -> Vec<Record> {
    let mut records = Vec::new();
    let mut ts = 0u64;
    let mut push = |cpu: u16, payload: Payload| {
        ts += 10;
        records.push(Record::new(CpuId(cpu), Timestamp(ts), payload));
    };

    push(
        0,
        Payload::Host(HostRecord {
            host_type: HostType::AccessAllCpu,
            target_cpu: 0,
            enable: 1,
            name: FixedName::from("xtask-demo"),
        }),
    );
    push(
        0,
        Payload::Label(LabelRecord {
            label_type: LabelType::Static,
            addr: Address(FILES_LOCK),
            bytes: CACHE_LINE_SIZE,
            pc: Pc(TEXT_START),
            name: FixedName::from("files_lock"),
        }),
    );

    let lock = |op, cpu_pc| {
        Payload::Lock(LockRecord {
            op,
            read: false,
            pc: Pc(cpu_pc),
            lock: Address(FILES_LOCK),
            name: FixedName::EMPTY,
        })
    };

    for i in 0..calls {
        let (pc, _) = SYSCALLS[usize::try_from(i % 3).unwrap_or_default()];
        for cpu in 0..cpus {
            let tid = u64::from(cpu) + 1;
            let fcall = |state| {
                Payload::Fcall(FcallRecord { state, depth: 0, tid, pc: Pc(pc), tag: i })
            };
            let private = HEAP_BASE + (u64::from(cpu) << 16) + i * CACHE_LINE_SIZE;

            push(cpu, fcall(CallState::Start));
            push(
                cpu,
                Payload::Label(LabelRecord {
                    label_type: LabelType::Heap,
                    addr: Address(private),
                    bytes: CACHE_LINE_SIZE,
                    pc: Pc(pc + 0x20),
                    name: FixedName::from("file"),
                }),
            );
            for (addr, access_type) in [
                (FILES_LOCK, AccessType::Load),
                (private, AccessType::Store),
                (private + 8, AccessType::Load),
            ] {
                push(
                    cpu,
                    Payload::Access(AccessRecord {
                        access_type,
                        traffic: addr == FILES_LOCK,
                        locked: false,
                        pc: Pc(pc + 0x40),
                        addr: Address(addr),
                        bytes: 8,
                    }),
                );
            }
            push(cpu, lock(LockOp::Acquire, LOCK_SITE.0));
            push(cpu, lock(LockOp::Acquired, LOCK_SITE.0));
            push(cpu, fcall(CallState::Pause));
            push(cpu, fcall(CallState::Resume));
            push(cpu, lock(LockOp::Release, LOCK_SITE.0 + 0x30));
            push(
                cpu,
                Payload::Label(LabelRecord {
                    label_type: LabelType::Heap,
                    addr: Address(private),
                    bytes: 0,
                    pc: Pc(pc + 0x60),
                    name: FixedName::EMPTY,
                }),
            );
            push(cpu, fcall(CallState::Done));
        }
        push(0, Payload::AppData(AppDataRecord { value: i + 1 }));
    }

    records
}
