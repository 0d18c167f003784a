//! ZIP archive extraction with partial-state cleanup.

use reporthive_core::{Error, Result};
use std::io::Cursor;
use std::path::Path;
use tracing::warn;

/// Extract an uploaded ZIP archive to `dest`.
///
/// On any failure the partially extracted directory tree is removed before
/// the error is returned, so a rejected upload leaves no trace on disk.
pub fn extract_zip(bytes: &[u8], dest: &Path) -> Result<()> {
    let result = try_extract(bytes, dest);
    if result.is_err() {
        if let Err(err) = std::fs::remove_dir_all(dest) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Cleanup of partial extraction at {} failed: {}",
                    dest.display(),
                    err
                );
            }
        }
    }
    result
}

fn try_extract(bytes: &[u8], dest: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Archive(format!("unreadable zip archive: {e}")))?;
    archive
        .extract(dest)
        .map_err(|e| Error::Archive(format!("extraction to {} failed: {e}", dest.display())))
}
