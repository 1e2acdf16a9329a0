//! Directory size accounting
// (c) 2026 tftpd contributors

use std::path::Path;

use walkdir::WalkDir;

/// Returns the total size in bytes of all regular files below `path`.
///
/// Symbolic links are not followed.
pub fn dir_size<P: AsRef<Path>>(path: P) -> std::io::Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total = total.saturating_add(entry.metadata()?.len());
        }
    }
    Ok(total)
}
