//! File writing primitives.
//!
//! Two flavours are used by the pipeline:
//! - [`write_if_changed`] for small text files (shims, manifests), skipping
//!   the write when the file already holds the desired content.
//! - [`write_atomic_raw`] for the downloaded package. It goes straight to the
//!   OS through a temporary file in the destination directory followed by a
//!   rename, so readers never observe a half-written archive and nothing
//!   between us and the filesystem gets to interpret the `.asar` file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Write `contents` to `path` unless it already holds exactly those bytes.
///
/// Returns `true` when the file was (re)written.
pub fn write_if_changed(path: &Path, contents: &[u8]) -> io::Result<bool> {
    match fs::read(path) {
        Ok(existing) if existing == contents => return Ok(false),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    fs::write(path, contents)?;
    Ok(true)
}

/// Atomically replace `path` with `contents`.
pub fn write_atomic_raw(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        )
    })?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".bdinstall-")
        .suffix(".part")
        .tempfile_in(parent)?;
    tmp.as_file_mut().write_all(contents)?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
