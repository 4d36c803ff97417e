use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read a manifest-like text file, replacing invalid UTF-8 sequences with
/// the replacement character so a stray byte never hides the whole file.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Path of the sibling temp file used by [`atomic_write`].
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    path.with_file_name(format!(".{name}.have-it.{}", std::process::id()))
}

/// Replace the contents of `path` in one step: write a sibling temp file,
/// flush it, then rename it over the target.
///
/// Readers of `path` observe either the previous contents or `bytes`.
///
/// # Errors
/// Returns an error if the temp file cannot be written or renamed.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = temp_sibling(path);

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        // Windows refuses to rename over an existing file.
        if cfg!(windows) {
            let copied = fs::copy(&temp_path, path).map(|_| ());
            let _ = fs::remove_file(&temp_path);
            return copied;
        }
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}
