use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Result, SegmentError};
use crate::format::{read_record, Kind, Record};

/// Scans `path` sequentially, returning every record in on-disk order.
///
/// A short (truncated) record at end-of-file is corruption, per the
/// segment store's fail-closed read policy, and surfaces as
/// [`SegmentError::Corrupt`].
pub fn scan_segment(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).map_err(|e| SegmentError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    loop {
        match read_record(&mut reader) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => break,
            Err(source) if source.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(SegmentError::corrupt(path, "truncated record at end of file"));
            }
            Err(source) => return Err(SegmentError::io(path, source)),
        }
    }
    Ok(records)
}

/// Scans `path` sequentially for the first record matching `key`, stopping
/// as soon as it is found. This is the read-path fast path: a segment can
/// be large and most lookups resolve in the newest (smallest) segments.
pub fn find_in_segment(path: &Path, key: &[u8]) -> Result<Option<Kind>> {
    let file = File::open(path).map_err(|e| SegmentError::io(path, e))?;
    let mut reader = BufReader::new(file);
    loop {
        match read_record(&mut reader) {
            Ok(Some(record)) => {
                if record.key == key {
                    return Ok(Some(record.kind));
                }
            }
            Ok(None) => return Ok(None),
            Err(source) if source.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(SegmentError::corrupt(path, "truncated record at end of file"));
            }
            Err(source) => return Err(SegmentError::io(path, source)),
        }
    }
}
