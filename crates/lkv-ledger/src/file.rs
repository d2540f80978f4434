use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::traits::{check_key, Ledger};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Largest payload accepted in a single log record.
pub const MAX_RECORD_SIZE: usize = 64 * 1024 * 1024;

/// A single key/value write as stored in the log.
///
/// On-disk format:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct LogRecord {
    key: String,
    value: Vec<u8>,
}

/// Flush/sync strategy for the log file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Flush to the OS and rely on page-cache buffering.
    #[default]
    OsDefault,
}

/// Configuration for [`FileLedger`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLedgerConfig {
    pub sync: SyncMode,
}

/// What happened while replaying the log on open.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records applied to the index.
    pub replayed: usize,
    /// Damaged regions skipped: a record failing its CRC or decode, or
    /// unframed bytes between two readable records.
    pub skipped: usize,
    /// Bytes cut from an unreadable tail.
    pub truncated_bytes: u64,
    /// Where the cut tail was copied before truncation.
    pub salvaged_to: Option<PathBuf>,
}

struct FileState {
    index: HashMap<String, Vec<u8>>,
    writer: BufWriter<File>,
    offset: u64,
}

/// Persistent ledger backed by an append-only, CRC-framed log file.
///
/// Every write appends one record; the full key index is rebuilt in memory
/// when the ledger is opened. Damaged records are skipped and replay resumes at
/// the next readable frame. A tail with no readable frame, such as a crash
/// mid-append, is copied to a `.corrupt` sibling and truncated so later
/// appends stay readable.
pub struct FileLedger {
    path: PathBuf,
    config: FileLedgerConfig,
    recovery: RecoveryReport,
    state: Mutex<FileState>,
}

impl FileLedger {
    /// Open (or create) a ledger log at the given path and replay it.
    pub fn open(path: &Path, config: FileLedgerConfig) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        let bytes = fs::read(path)?;
        let file_len = bytes.len() as u64;

        let (index, valid_len, mut recovery) = replay(&bytes);
        if valid_len < file_len {
            let salvage = salvage_path(path);
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                salvage = %salvage.display(),
                "unreadable tail in ledger log; saving a copy and truncating"
            );
            let mut copy = OpenOptions::new().create(true).append(true).open(&salvage)?;
            copy.write_all(&bytes[valid_len as usize..])?;
            copy.sync_all()?;
            file.set_len(valid_len)?;
            recovery.truncated_bytes = file_len - valid_len;
            recovery.salvaged_to = Some(salvage);
        }

        info!(
            path = %path.display(),
            keys = index.len(),
            replayed = recovery.replayed,
            skipped = recovery.skipped,
            "file ledger opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            config,
            recovery,
            state: Mutex::new(FileState {
                index,
                writer: BufWriter::new(file),
                offset: valid_len,
            }),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recovery statistics gathered when the ledger was opened.
    pub fn recovery(&self) -> &RecoveryReport {
        &self.recovery
    }

    /// Current size of the log in bytes.
    pub fn log_size(&self) -> LedgerResult<u64> {
        Ok(self.lock()?.offset)
    }

    /// Rewrite the log so it holds exactly one record per live key.
    ///
    /// Returns the number of records written. The new log is written to a
    /// sibling file and renamed into place.
    pub fn compact(&self) -> LedgerResult<usize> {
        let mut state = self.lock()?;
        let tmp_path = self.path.with_extension("compact");

        let mut entries: Vec<(&String, &Vec<u8>)> = state.index.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        let count = entries.len();

        let mut tmp = BufWriter::new(File::create(&tmp_path)?);
        let mut offset = 0u64;
        for (key, value) in entries {
            let record = LogRecord {
                key: key.clone(),
                value: value.clone(),
            };
            offset += write_frame(&mut tmp, &record)?;
        }
        tmp.flush()?;
        tmp.get_ref().sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        state.writer = BufWriter::new(file);
        state.offset = offset;

        debug!(records = count, size = offset, "ledger log compacted");
        Ok(count)
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, FileState>> {
        self.state
            .lock()
            .map_err(|e| LedgerError::Unavailable(format!("lock poisoned: {e}")))
    }

    /// Append a record and update the index. Caller holds the lock.
    fn append(&self, state: &mut FileState, record: LogRecord) -> LedgerResult<()> {
        match write_frame(&mut state.writer, &record).and_then(|written| {
            state.writer.flush()?;
            if self.config.sync == SyncMode::EveryWrite {
                state.writer.get_ref().sync_all()?;
            }
            Ok(written)
        }) {
            Ok(written) => {
                state.offset += written;
                debug!(key = %record.key, len = record.value.len(), "ledger append");
                state.index.insert(record.key, record.value);
                Ok(())
            }
            Err(e) => {
                let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
                state.rollback(file)?;
                Err(e)
            }
        }
    }
}

impl FileState {
    /// Drop a failed append: discard whatever is still buffered and cut the
    /// file back to the last complete frame.
    fn rollback(&mut self, file: File) -> LedgerResult<()> {
        // into_parts hands back the buffer instead of flushing it on drop.
        let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
        let (_, unwritten) = stale.into_parts();
        if let Ok(buffered) = unwritten {
            debug!(bytes = buffered.len(), "discarded buffered ledger bytes");
        }
        self.writer.get_ref().set_len(self.offset)?;
        Ok(())
    }
}

impl Ledger for FileLedger {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        check_key(key)?;
        Ok(self.lock()?.index.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        check_key(key)?;
        let mut state = self.lock()?;
        self.append(
            &mut state,
            LogRecord {
                key: key.to_string(),
                value: value.to_vec(),
            },
        )
    }

    fn put_if_absent(&self, key: &str, value: &[u8]) -> LedgerResult<bool> {
        check_key(key)?;
        let mut state = self.lock()?;
        if state.index.contains_key(key) {
            return Ok(false);
        }
        self.append(
            &mut state,
            LogRecord {
                key: key.to_string(),
                value: value.to_vec(),
            },
        )?;
        Ok(true)
    }

    fn len(&self) -> LedgerResult<usize> {
        Ok(self.lock()?.index.len())
    }

    fn contains(&self, key: &str) -> LedgerResult<bool> {
        check_key(key)?;
        Ok(self.lock()?.index.contains_key(key))
    }
}

impl std::fmt::Debug for FileLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLedger")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish()
    }
}

/// Serialize and write one framed record. Returns the bytes written.
fn write_frame<W: Write>(writer: &mut W, record: &LogRecord) -> LedgerResult<u64> {
    let payload =
        bincode::serialize(record).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    if payload.len() > MAX_RECORD_SIZE {
        return Err(LedgerError::RecordTooLarge {
            size: payload.len(),
            max: MAX_RECORD_SIZE,
        });
    }
    let length = payload.len() as u32;
    let crc = crc32fast::hash(&payload);

    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(&payload)?;
    Ok((HEADER_SIZE + payload.len()) as u64)
}

/// What sits at one offset of the log.
enum Frame {
    /// A well-formed record and the number of bytes it spans.
    Record(LogRecord, usize),
    /// A header whose length runs past the end of the file.
    Short,
    /// Bad length, CRC mismatch, or undecodable payload. Carries the span
    /// the header claims when that span fits in the file.
    Damaged(Option<usize>),
}

fn read_frame(buf: &[u8]) -> Frame {
    if buf.len() < HEADER_SIZE {
        return Frame::Short;
    }
    let length = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let expected_crc = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    if length == 0 || length > MAX_RECORD_SIZE {
        return Frame::Damaged(None);
    }
    if buf.len() - HEADER_SIZE < length {
        return Frame::Short;
    }
    let payload = &buf[HEADER_SIZE..HEADER_SIZE + length];
    if crc32fast::hash(payload) != expected_crc {
        return Frame::Damaged(Some(HEADER_SIZE + length));
    }
    match bincode::deserialize::<LogRecord>(payload) {
        Ok(record) => Frame::Record(record, HEADER_SIZE + length),
        Err(_) => Frame::Damaged(Some(HEADER_SIZE + length)),
    }
}

fn is_record(bytes: &[u8], at: usize) -> bool {
    at < bytes.len() && matches!(read_frame(&bytes[at..]), Frame::Record(..))
}

/// Offset of the next well-formed record after an unreadable frame at `from`.
///
/// The length field is outside the CRC. The boundary it claims is tried
/// first; failing that, the log is searched byte by byte.
fn resync(bytes: &[u8], from: usize, claimed: Option<usize>) -> Option<usize> {
    claimed
        .map(|size| from + size)
        .filter(|&at| is_record(bytes, at))
        .or_else(|| (from + 1..bytes.len()).find(|&at| is_record(bytes, at)))
}

/// Rebuild the key index from the log.
///
/// Returns the index, the length of the readable prefix of the file, and
/// recovery statistics. Bytes after the last readable record are reported as
/// not readable only when no well-formed record follows them.
fn replay(bytes: &[u8]) -> (HashMap<String, Vec<u8>>, u64, RecoveryReport) {
    let mut index = HashMap::new();
    let mut report = RecoveryReport::default();
    let mut offset = 0usize;

    while offset < bytes.len() {
        match read_frame(&bytes[offset..]) {
            Frame::Record(record, size) => {
                index.insert(record.key, record.value);
                report.replayed += 1;
                offset += size;
            }
            frame => {
                let (claimed, reason) = match frame {
                    Frame::Damaged(claimed) => (claimed, "damaged frame"),
                    _ => (None, "frame overruns log"),
                };
                match resync(bytes, offset, claimed) {
                    Some(next) => {
                        warn!(offset, next, reason, "skipping unreadable ledger bytes");
                        report.skipped += 1;
                        offset = next;
                    }
                    None => break,
                }
            }
        }
    }

    debug!(replayed = report.replayed, skipped = report.skipped, "ledger replay complete");
    (index, offset as u64, report)
}

/// Sibling file that receives bytes cut from the log: `<log>.corrupt`.
fn salvage_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}
