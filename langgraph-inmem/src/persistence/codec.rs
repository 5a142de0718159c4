//! Frame encoding and scanning for the record log.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PersistenceError;

/// Marker at the start of every frame; also used to resynchronize after corruption.
pub const MAGIC: [u8; 4] = *b"LGIM";

/// magic + payload length + checksum.
pub const HEADER_SIZE: usize = 12;

/// Encodes one record as a complete frame.
pub fn encode_frame<R: Serialize>(record: &R) -> Result<Vec<u8>, PersistenceError> {
    let payload = serde_json::to_vec(record).map_err(|e| PersistenceError::Encode(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| PersistenceError::Encode(format!("record too large: {} bytes", payload.len())))?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// A complete frame that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CorruptFrame {
    pub offset: u64,
    pub reason: String,
}

/// Result of scanning a log buffer.
#[derive(Debug)]
pub(crate) struct Scan<R> {
    pub records: Vec<R>,
    pub corrupt: Vec<CorruptFrame>,
    /// End of the last good frame; bytes after it are a torn tail.
    pub valid_len: u64,
}

impl<R> Scan<R> {
    pub fn has_torn_tail(&self, total_len: usize) -> bool {
        self.valid_len < total_len as u64
    }
}

/// Scans `buf` frame by frame.
///
/// Complete frames with bad magic, checksum or payload are recorded in `corrupt` and scanning
/// resumes at the next magic marker. A frame that runs past the end of the buffer with no
/// later marker is the torn tail.
pub(crate) fn scan_frames<R: DeserializeOwned>(buf: &[u8]) -> Scan<R> {
    let mut records = Vec::new();
    let mut corrupt = Vec::new();
    let mut valid_len = 0u64;
    let mut offset = 0usize;

    while offset < buf.len() {
        if buf.len() - offset < HEADER_SIZE {
            break;
        }
        if buf[offset..offset + 4] != MAGIC {
            match find_next_magic(buf, offset + 1) {
                Some(next) => {
                    corrupt.push(CorruptFrame {
                        offset: offset as u64,
                        reason: "bad magic".to_string(),
                    });
                    offset = next;
                    continue;
                }
                None => break,
            }
        }

        let len = u32::from_le_bytes([
            buf[offset + 4],
            buf[offset + 5],
            buf[offset + 6],
            buf[offset + 7],
        ]) as usize;
        let expected_crc = u32::from_le_bytes([
            buf[offset + 8],
            buf[offset + 9],
            buf[offset + 10],
            buf[offset + 11],
        ]);
        let end = offset + HEADER_SIZE + len;
        if end > buf.len() {
            // A damaged length in the middle of the log still leaves later markers behind.
            match find_next_magic(buf, offset + 1) {
                Some(next) => {
                    corrupt.push(CorruptFrame {
                        offset: offset as u64,
                        reason: format!("length {} runs past end of log", len),
                    });
                    offset = next;
                    continue;
                }
                None => break,
            }
        }

        let payload = &buf[offset + HEADER_SIZE..end];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            corrupt.push(CorruptFrame {
                offset: offset as u64,
                reason: format!(
                    "checksum mismatch: expected 0x{:08x}, got 0x{:08x}",
                    expected_crc, actual_crc
                ),
            });
            match find_next_magic(buf, offset + 1) {
                Some(next) => {
                    offset = next;
                    continue;
                }
                None => break,
            }
        }

        match serde_json::from_slice::<R>(payload) {
            Ok(record) => records.push(record),
            Err(e) => corrupt.push(CorruptFrame {
                offset: offset as u64,
                reason: format!("undecodable payload: {}", e),
            }),
        }
        offset = end;
        valid_len = end as u64;
    }

    Scan {
        records,
        corrupt,
        valid_len,
    }
}

fn find_next_magic(buf: &[u8], start: usize) -> Option<usize> {
    if start >= buf.len() {
        return None;
    }
    buf[start..]
        .windows(MAGIC.len())
        .position(|w| w == MAGIC)
        .map(|p| start + p)
}
