//! Fixed-size segment record format.
//!
//! ```text
//! [key_len: u64 LE][key bytes, padded to KEY_FIELD_LEN with ASCII space][kind: u32 LE]
//! ```
//!
//! Every record is exactly [`RECORD_LEN`] bytes, little-endian throughout,
//! regardless of host byte order.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Result as IoResult, Write};

/// Padded width of the key field within a record.
pub const KEY_FIELD_LEN: usize = 256;

/// Total size of one on-disk record: 8 (key_len) + 256 (key) + 4 (kind).
pub const RECORD_LEN: usize = 8 + KEY_FIELD_LEN + 4;

/// ASCII space, used to pad the key field.
const PAD_BYTE: u8 = b' ';

/// A record's payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Tombstone = 0,
    Value = 1,
}

impl Kind {
    fn from_u32(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Kind::Tombstone),
            1 => Some(Kind::Value),
            _ => None,
        }
    }
}

/// A decoded segment record: the original (unpadded) key and its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub kind: Kind,
}

/// Writes one record. `key.len()` must be in `1..=KEY_FIELD_LEN`.
pub fn write_record<W: Write>(w: &mut W, key: &[u8], kind: Kind) -> IoResult<()> {
    debug_assert!(!key.is_empty() && key.len() <= KEY_FIELD_LEN);
    w.write_u64::<LittleEndian>(key.len() as u64)?;
    w.write_all(key)?;
    let pad = KEY_FIELD_LEN - key.len();
    if pad > 0 {
        w.write_all(&vec![PAD_BYTE; pad])?;
    }
    w.write_u32::<LittleEndian>(kind as u32)?;
    Ok(())
}

/// Reads exactly one record from `r`.
///
/// Returns `Ok(None)` if the reader is already at end-of-file (zero bytes
/// available before the first field). Any other short read — a partial
/// record — is corruption and returns `Err`.
pub fn read_record<R: Read>(r: &mut R) -> IoResult<Option<Record>> {
    let mut len_buf = [0u8; 8];
    if !read_exact_or_eof(r, &mut len_buf)? {
        return Ok(None);
    }
    let key_len = u64::from_le_bytes(len_buf) as usize;

    let mut padded = vec![0u8; KEY_FIELD_LEN];
    r.read_exact(&mut padded)?;

    let kind_raw = r.read_u32::<LittleEndian>()?;
    let kind = Kind::from_u32(kind_raw).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("unknown record kind {kind_raw}"),
        )
    })?;

    if key_len > KEY_FIELD_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("key_len {key_len} exceeds field width {KEY_FIELD_LEN}"),
        ));
    }
    padded.truncate(key_len);

    Ok(Some(Record { key: padded, kind }))
}

/// Like `Read::read_exact`, but returns `Ok(false)` instead of erroring if
/// zero bytes were available (clean EOF at a record boundary). A *partial*
/// fill (some but not all bytes read) still propagates as an error — that's
/// a truncated record, i.e. corruption.
fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> IoResult<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..])? {
            0 if filled == 0 => return Ok(false),
            0 => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "truncated record",
                ))
            }
            n => filled += n,
        }
    }
    Ok(true)
}
