//! Media folder scanning.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::error::Error;
use crate::playlist::MediaEntry;

/// Walk `root` and collect every playable entry, sorted lexicographically so
/// the circular playlist has a stable order between rescans.
///
/// # Errors
/// Returns [`Error::BadDir`] if `root` is missing or not a directory.
pub fn scan_media(root: &Path) -> Result<Vec<MediaEntry>, Error> {
    if !root.exists() || !root.is_dir() {
        return Err(Error::BadDir(root.to_string_lossy().into_owned()));
    }

    let mut out: Vec<MediaEntry> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden_dir(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| MediaEntry::classify(e.path().to_path_buf()))
        .collect();
    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
