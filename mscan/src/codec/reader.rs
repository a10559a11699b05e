//! Record decoding from a (decompressed) byte stream

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read};
use std::mem::size_of;
use std::path::Path;

use flate2::read::MultiGzDecoder;
use mscan_common::{
    payload_size, AccessPayload, AppDataPayload, FcallPayload, HostPayload, LabelPayload,
    LockPayload, RecordHeader,
};

use super::pod::pod_from_bytes;
use super::record::{Payload, Record, RecordKind};
use crate::domain::{CpuId, ScanError, Timestamp};

/// Largest payload of any record kind
const MAX_PAYLOAD: usize = size_of::<LabelPayload>();

const HEADER_LEN: usize = size_of::<RecordHeader>();

/// Reader over a gzip-compressed trace file
pub type TraceFileReader = RecordReader<MultiGzDecoder<BufReader<File>>>;

/// Decodes one record at a time
///
/// Reads exactly one header, validates kind and declared size, then reads the
/// payload for that kind. Zero bytes at a record boundary is end-of-stream;
/// anything shorter than a full record is a [`ScanError::Truncated`].
pub struct RecordReader<R> {
    inner: R,
    records: u64,
}

impl TraceFileReader {
    /// Open a gzip trace log
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened. Gzip framing errors are
    /// reported by the first [`RecordReader::next_record`] call.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(RecordReader::new(MultiGzDecoder::new(BufReader::new(file))))
    }
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, records: 0 }
    }

    /// Number of records decoded so far
    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Decode the next record
    ///
    /// Returns `Ok(None)` at a clean end of stream.
    ///
    /// # Errors
    /// Returns an error on a short read, an unknown kind tag, a header whose
    /// size disagrees with the kind's layout, or an I/O error in the stream.
    pub fn next_record(&mut self) -> Result<Option<Record>, ScanError> {
        let mut header_buf = [0u8; HEADER_LEN];
        let got = read_fully(&mut self.inner, &mut header_buf)?;
        if got == 0 {
            return Ok(None);
        }
        if got < HEADER_LEN {
            return Err(ScanError::Truncated { what: "record header", expected: HEADER_LEN, got });
        }

        let header: RecordHeader = pod_from_bytes(&header_buf);
        let kind = RecordKind::try_from(header.kind)?;
        let Some(payload_len) = payload_size(header.kind) else {
            return Err(ScanError::UnknownKind(header.kind));
        };
        let expected = HEADER_LEN + payload_len;
        if header.size as usize != expected {
            return Err(ScanError::SizeMismatch { kind, declared: header.size, expected });
        }

        let mut payload_buf = [0u8; MAX_PAYLOAD];
        let buf = &mut payload_buf[..payload_len];
        let got = read_fully(&mut self.inner, buf)?;
        if got < payload_len {
            return Err(ScanError::Truncated { what: kind.payload_what(), expected: payload_len, got });
        }

        let payload = match kind {
            RecordKind::Access => Payload::Access(pod_from_bytes::<AccessPayload>(buf).into()),
            RecordKind::Host => Payload::Host(pod_from_bytes::<HostPayload>(buf).into()),
            RecordKind::Fcall => Payload::Fcall(pod_from_bytes::<FcallPayload>(buf).into()),
            RecordKind::Label => Payload::Label(pod_from_bytes::<LabelPayload>(buf).into()),
            RecordKind::Lock => Payload::Lock(pod_from_bytes::<LockPayload>(buf).into()),
            RecordKind::AppData => Payload::AppData(pod_from_bytes::<AppDataPayload>(buf).into()),
        };

        self.records += 1;
        Ok(Some(Record::new(CpuId(header.cpu), Timestamp(header.ts), payload)))
    }
}

/// Fill `buf` as far as the stream allows, returning the byte count
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
