//! Content digests for downloaded packages.
//!
//! Used to detect that a freshly downloaded package is byte-identical to the
//! one already on disk, and to report what was installed.

use std::fs;
use std::io;
use std::path::Path;

/// BLAKE3 digest of a byte slice as lowercase hex.
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// BLAKE3 digest of a file's contents.
///
/// # Example
/// ```no_run
/// use bdinstall_core::fs::hash_file;
/// use std::path::Path;
///
/// let digest = hash_file(Path::new("/path/to/betterdiscord.asar"))?;
/// assert_eq!(digest.len(), 64);
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut file = fs::File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Digest of `path` if it is an existing regular file.
pub fn existing_file_hash(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    hash_file(path).ok()
}
