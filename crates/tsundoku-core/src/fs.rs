use std::path::{Path, PathBuf};

use crate::error::TsundokuError;

/// Marker file that tells media scanners to skip a folder.
pub const NO_MEDIA_FILE: &str = ".nomedia";

/// Create the no-media marker inside `folder`.
///
/// An existing marker counts as success. The folder itself must already
/// exist; creating the library root is not this helper's job.
pub fn create_no_media(folder: &Path) -> Result<PathBuf, TsundokuError> {
    if !folder.is_dir() {
        return Err(TsundokuError::NotFound(format!(
            "storage folder {}",
            folder.display()
        )));
    }
    let marker = folder.join(NO_MEDIA_FILE);
    if !marker.exists() {
        std::fs::File::create(&marker)?;
    }
    Ok(marker)
}
