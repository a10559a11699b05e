//! Record encoding, the inverse of [`super::RecordReader`]
//!
//! Used by tests and by `cargo xtask gen-trace` to produce logs in the same
//! layout the simulator writes.

use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use mscan_common::{record_size, RecordHeader};

use super::pod::pod_bytes;
use super::record::{Payload, Record};

/// Writer producing a gzip trace file
pub type TraceFileWriter = RecordWriter<GzEncoder<BufWriter<File>>>;

pub struct RecordWriter<W: Write> {
    inner: W,
    records: u64,
}

impl TraceFileWriter {
    /// Create (or truncate) a gzip trace log
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(RecordWriter::new(GzEncoder::new(BufWriter::new(file), Compression::default())))
    }

    /// Flush the gzip trailer and the underlying file
    ///
    /// # Errors
    /// Returns an error if the final write fails.
    pub fn finish(self) -> io::Result<()> {
        let mut file = self.inner.finish()?;
        file.flush()
    }
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, records: 0 }
    }

    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Append one record
    ///
    /// # Errors
    /// Returns an error if the underlying writer fails.
    pub fn write(&mut self, record: &Record) -> io::Result<()> {
        let kind = record.kind();
        let size = record_size(kind.tag())
            .and_then(|size| u32::try_from(size).ok())
            .ok_or_else(|| {
                io::Error::new(ErrorKind::InvalidInput, format!("no wire layout for {kind} records"))
            })?;
        let header = RecordHeader {
            kind: kind.tag(),
            _padding: 0,
            cpu: record.cpu.0,
            size,
            ts: record.ts.0,
        };
        self.inner.write_all(pod_bytes(&header))?;

        match &record.payload {
            Payload::Access(r) => self.inner.write_all(pod_bytes(&r.to_wire()))?,
            Payload::Host(r) => self.inner.write_all(pod_bytes(&r.to_wire()))?,
            Payload::Fcall(r) => self.inner.write_all(pod_bytes(&r.to_wire()))?,
            Payload::Label(r) => self.inner.write_all(pod_bytes(&r.to_wire()))?,
            Payload::Lock(r) => self.inner.write_all(pod_bytes(&r.to_wire()))?,
            Payload::AppData(r) => self.inner.write_all(pod_bytes(&r.to_wire()))?,
        }

        self.records += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::record::AppDataRecord;
    use crate::codec::TraceFileReader;
    use crate::domain::{CpuId, Timestamp};

    #[test]
    fn test_gzip_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.gz");

        let record = Record::new(CpuId(1), Timestamp(5), Payload::AppData(AppDataRecord { value: 7 }));
        let mut writer = TraceFileWriter::create(&path).unwrap();
        writer.write(&record).unwrap();
        assert_eq!(writer.records_written(), 1);
        writer.finish().unwrap();

        let mut reader = TraceFileReader::open(&path).unwrap();
        assert_eq!(reader.next_record().unwrap(), Some(record));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_written_size_matches_layout() {
        let record = Record::new(CpuId(0), Timestamp(0), Payload::AppData(AppDataRecord { value: 1 }));
        let mut writer = RecordWriter::new(Vec::new());
        writer.write(&record).unwrap();
        assert_eq!(writer.into_inner().len(), 24);
    }
}
