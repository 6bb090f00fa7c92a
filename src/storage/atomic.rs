use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};

/// Replace `path` with `contents` so that readers see either the old or the new file.
///
/// The data goes to a temporary file in the same directory, is synced, and
/// is then renamed over the target.
pub fn write_atomic(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let tmp_path = temp_path(path)?;

    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}

/// Serialize `value` as pretty JSON with a trailing newline and write it atomically.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');
    write_atomic(path, &json)
}

// one temporary name per process so a one-shot run and the daemon never share it
fn temp_path(path: &Path) -> StorageResult<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StorageError::Unwritable(format!("invalid file path {}", path.display())))?;

    Ok(path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id())))
}
