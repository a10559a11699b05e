//! # mscan - Kernel Memory Trace Scanner
//!
//! mscan reads a binary trace captured from an instrumented kernel run (one
//! gzip-compressed stream of fixed-layout records), rebuilds the execution
//! context every record needs (which call is running on each CPU, which
//! memory regions carry names) and feeds the records to pluggable analyses.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │             <trace-dir>/<trace-file>  (gzip stream)             │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ header + payload, back to back
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        mscan (This Crate)                       │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │    Codec     │──▶│   Dispatch   │──▶│   Analysis   │         │
//! │  │ (RecordRdr)  │   │  (Registry)  │   │  (handlers)  │         │
//! │  └──────────────┘   └──────┬───────┘   └──────┬───────┘         │
//! │                            │ defaults          │ finalize       │
//! │                            ▼                   ▼                │
//! │                     ┌──────────────┐   ┌──────────────┐         │
//! │                     │  ScanState   │   │ Symbolizer   │         │
//! │                     │ (per-CPU PC, │   │ (DWARF, nm)  │         │
//! │                     │  labels)     │   └──────┬───────┘         │
//! │                     └──────────────┘          ▼                 │
//! │                                        ┌──────────────┐         │
//! │                                        │    Export    │         │
//! │                                        │ (JSON, text) │         │
//! │                                        └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`codec`]: record layouts on the wire, streaming reader and writer
//! - [`dispatch`]: per-kind handler chains, default state handlers and the
//!   single-pass dispatch loop
//! - [`state`]: process state (per-CPU call PC, app name, op count) and the
//!   label table
//! - [`analysis`]: distinct cache lines per syscall and per op, lock hold
//!   times
//! - [`symbolization`]: PC to function/file/line via DWARF and `nm` output
//! - [`export`]: JSON report and terminal summary
//! - [`cli`]: command-line arguments and input paths
//! - [`domain`]: newtypes (`CpuId`, `Pc`, `Address`, `Timestamp`) and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! mscan ./run trace.gz
//! mscan ./run trace.gz --export report.json
//! ```
//!
//! ## Key Concepts
//!
//! - **Record kind**: first header byte; selects payload layout and chain
//! - **Default handler**: the state update that runs before any analysis
//! - **Call PC**: PC of the call active on a CPU, 0 when idle
//! - **Label**: a named memory region (heap object, static, per-CPU area)

pub mod analysis;
pub mod cli;
pub mod codec;
pub mod dispatch;
pub mod domain;
pub mod export;
pub mod state;
pub mod symbolization;
