use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Result, SegmentError};
use crate::format::{write_record, Kind};
use crate::hash::sidecar_name;

/// One pending write: a key plus `Some(value)` for a live write, or `None`
/// for a delete (tombstone).
pub type PendingItem = (Vec<u8>, Option<Vec<u8>>);

/// Writes `value` to `key`'s sidecar file under `values_dir`, truncating any
/// existing file for the same name.
fn write_sidecar(values_dir: &Path, key: &[u8], value: &[u8]) -> Result<()> {
    let path = values_dir.join(sidecar_name(key));
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&path)
        .map_err(|e| SegmentError::io(&path, e))?;
    let mut w = BufWriter::new(file);
    w.write_all(value).map_err(|e| SegmentError::io(&path, e))?;
    w.flush().map_err(|e| SegmentError::io(&path, e))?;
    w.into_inner()
        .map_err(|e| SegmentError::io(&path, e.into_error()))?
        .sync_all()
        .map_err(|e| SegmentError::io(&path, e))?;
    Ok(())
}

/// Writes a brand-new segment file containing `items`, after first writing
/// every live value's sidecar. The segment file is written to a temp path
/// and renamed into place so a crash mid-write never leaves a partially
/// written segment at its final name.
pub fn write_segment<'a, I>(dir: &Path, values_dir: &Path, id: u64, items: I) -> Result<()>
where
    I: IntoIterator<Item = &'a PendingItem>,
{
    let final_path = dir.join(id.to_string());
    let tmp_path = dir.join(format!("{id}.tmp"));

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(|e| SegmentError::io(&tmp_path, e))?;
    let mut w = BufWriter::new(file);

    for (key, value) in items {
        if let Some(value) = value {
            write_sidecar(values_dir, key, value)?;
        }
        let kind = if value.is_some() {
            Kind::Value
        } else {
            Kind::Tombstone
        };
        write_record(&mut w, key, kind).map_err(|e| SegmentError::io(&tmp_path, e))?;
    }

    w.flush().map_err(|e| SegmentError::io(&tmp_path, e))?;
    w.into_inner()
        .map_err(|e| SegmentError::io(&tmp_path, e.into_error()))?
        .sync_all()
        .map_err(|e| SegmentError::io(&tmp_path, e))?;

    fs::rename(&tmp_path, &final_path).map_err(|e| SegmentError::io(&final_path, e))?;
    if let Some(parent) = final_path.parent() {
        if let Ok(dir_handle) = fs::File::open(parent) {
            let _ = dir_handle.sync_all();
        }
    }
    Ok(())
}
