use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, SegmentError};
use crate::format::write_record;
use crate::reader::scan_segment;

/// Merges the segment at `old_id` into the segment at `new_id` (the newer of
/// the two), preserving newest-wins semantics, and deletes `old_id`. Value
/// sidecars are left untouched — they are addressed by key, not by segment
/// id, so they remain valid for whichever segment now mentions that key.
pub fn merge_into(dir: &Path, old_id: u64, new_id: u64) -> Result<()> {
    let old_path = dir.join(old_id.to_string());
    let new_path = dir.join(new_id.to_string());

    let mut merged = BTreeMap::new();
    for record in scan_segment(&old_path)? {
        merged.insert(record.key, record.kind);
    }
    for record in scan_segment(&new_path)? {
        merged.insert(record.key, record.kind);
    }

    let tmp_path = dir.join(format!("{new_id}.merge.tmp"));
    {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| SegmentError::io(&tmp_path, e))?;
        let mut w = std::io::BufWriter::new(file);
        for (key, kind) in &merged {
            write_record(&mut w, key, *kind).map_err(|e| SegmentError::io(&tmp_path, e))?;
        }
        w.flush().map_err(|e| SegmentError::io(&tmp_path, e))?;
        w.into_inner()
            .map_err(|e| SegmentError::io(&tmp_path, e.into_error()))?
            .sync_all()
            .map_err(|e| SegmentError::io(&tmp_path, e))?;
    }

    fs::rename(&tmp_path, &new_path).map_err(|e| SegmentError::io(&new_path, e))?;
    fs::remove_file(&old_path).map_err(|e| SegmentError::io(&old_path, e))?;
    Ok(())
}
