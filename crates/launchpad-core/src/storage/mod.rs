//! Partial-file lifecycle on disk.
//!
//! Transfers write `<artifact>.part`; installing renames it onto the artifact
//! path in one step, so a complete artifact file is never half-written.

mod writer;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use writer::PartialFile;

/// Temporary file suffix used before the atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `app-1.0.jar` → `app-1.0.jar.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Rename a finished temp file onto `final_path`, replacing any previous file.
pub fn install(temp: &Path, final_path: &Path) -> io::Result<()> {
    fs::rename(temp, final_path)
}

/// Remove a leftover temp file; absence is fine.
pub fn discard(temp: &Path) {
    match fs::remove_file(temp) {
        Ok(()) => tracing::debug!(path = %temp.display(), "discarded partial file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %temp.display(), "could not remove partial file: {}", e),
    }
}
