use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sibling temp path with an unpredictable suffix.
fn temp_path_for(dst: &Path) -> PathBuf {
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    dst.with_extension(format!("tmp.{:016x}", random_suffix))
}

/// Writes `content` to `dst` via a temp file and rename, so readers see
/// either the old file or the complete new one.
///
/// Missing parent directories are created.
pub fn atomic_write(dst: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_path_for(dst);
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true) // Fails if something already sits at the temp path
        .open(&temp_path)?;

    let written = temp_file
        .write_all(content)
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    // On Windows, rename fails if destination exists
    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = fs::remove_file(dst) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    }

    fs::rename(&temp_path, dst).inspect_err(|_| {
        let _ = fs::remove_file(&temp_path);
    })
}

/// Modification time of `path`, or `None` if it does not exist.
pub fn modified_time(path: &Path) -> io::Result<Option<DateTime<Utc>>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(DateTime::<Utc>::from(meta.modified()?))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Sets both access and modification time of `path` to `ts`.
pub fn set_modified_time(path: &Path, ts: DateTime<Utc>) -> io::Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    let ts = SystemTime::from(ts);
    file.set_times(fs::FileTimes::new().set_accessed(ts).set_modified(ts))
}
