//! Ensures only one reminder daemon runs at a time, since two daemons would
//! race on the same reminders.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use tracing::debug;

/// Holds the daemon lock until dropped.
pub struct DaemonLock {
    _file: File,
}

fn lock_path() -> Result<PathBuf> {
    let runtime_dir = dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not determine runtime directory"))?;

    let dir = runtime_dir.join("calnudge");
    fs::create_dir_all(&dir)?;

    Ok(dir.join("notify.lock"))
}

pub fn acquire_lock() -> Result<DaemonLock> {
    acquire_lock_at(&lock_path()?)
}

/// Take an exclusive lock on `path` and record our pid in it.
fn acquire_lock_at(path: &Path) -> Result<DaemonLock> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .context("Failed to open lock file")?;

    if file.try_lock_exclusive().is_err() {
        let mut holder = String::new();
        let _ = file.read_to_string(&mut holder);
        let holder = holder.trim();
        anyhow::bail!(
            "Another calnudge daemon is already running{}.\n\
            If you believe this is an error, remove: {}",
            if holder.is_empty() { String::new() } else { format!(" (pid {holder})") },
            path.display()
        );
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    write!(file, "{}", std::process::id())?;
    file.flush()?;
    debug!("Acquired daemon lock {}", path.display());

    Ok(DaemonLock { _file: file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_is_refused_until_first_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notify.lock");

        let first = acquire_lock_at(&path).unwrap();
        let err = acquire_lock_at(&path).err().unwrap();
        assert!(err.to_string().contains(&format!("pid {}", std::process::id())));

        drop(first);
        assert!(acquire_lock_at(&path).is_ok());
    }
}
