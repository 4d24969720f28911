// =============================================================================
// Atomic, lock-guarded JSON state files (spec §5)
// =============================================================================
//
// Every write is atomic: write to a temporary sibling file, fsync, rename
// over the target, so a reader under the lock sees either the old or the
// new complete file — never a partial write. Access is additionally guarded
// by an advisory file lock with a timeout, so concurrent readers/writers
// across processes don't race on the same file.
//
// A malformed file (StateError per spec §7) is quarantined — renamed with a
// `.corrupt` suffix — and the caller gets a freshly-initialized default.
// =============================================================================

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, warn};

use crate::errors::CoreError;

/// Acquire an exclusive advisory lock on `lock_path`, retrying until
/// `timeout` elapses. Returns the open `File` holding the lock; dropping it
/// releases the lock.
fn lock_exclusive(lock_path: &Path, timeout: Duration) -> anyhow::Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;

    let deadline = Instant::now() + timeout;
    loop {
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => return Ok(file),
            Err(_) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(e) => {
                return Err(CoreError::State {
                    path: lock_path.display().to_string(),
                    reason: format!("lock timeout: {e}"),
                }
                .into())
            }
        }
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock = path.as_os_str().to_os_string();
    lock.push(".lock");
    PathBuf::from(lock)
}

/// Read a JSON state file, holding a shared advisory lock for the duration.
/// If the file does not exist, returns `default`. If the file exists but
/// fails to parse, it is quarantined (`.corrupt` suffix) and `default` is
/// returned — this is the spec §7 `StateError` policy.
pub fn read_or_default<T>(path: impl AsRef<Path>, default: T, timeout: Duration) -> T
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    if !path.exists() {
        return default;
    }

    let lock_path = lock_path_for(path);
    let lock_file = match lock_exclusive(&lock_path, timeout) {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to acquire lock for read, proceeding unlocked");
            return read_unlocked(path).unwrap_or(default);
        }
    };

    let result = read_unlocked(path);
    let _ = FileExt::unlock(&lock_file);

    match result {
        Some(v) => v,
        None => {
            quarantine(path);
            default
        }
    }
}

pub fn read_unlocked<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let data = std::fs::read_to_string(path).ok()?;
    if data.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(&data) {
        Ok(v) => Some(v),
        Err(e) => {
            error!(path = %path.display(), error = %e, "state file failed to parse");
            None
        }
    }
}

fn quarantine(path: &Path) {
    let corrupt = path.with_extension(format!(
        "{}.corrupt",
        path.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));
    if let Err(e) = std::fs::rename(path, &corrupt) {
        error!(path = %path.display(), error = %e, "failed to quarantine corrupt state file");
    } else {
        error!(path = %path.display(), quarantined_as = %corrupt.display(), "state file quarantined");
    }
}

/// Write `value` to `path` atomically (tmp + fsync + rename), holding an
/// exclusive advisory lock for the duration.
pub fn write_atomic<T: Serialize>(
    path: impl AsRef<Path>,
    value: &T,
    timeout: Duration,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let lock_path = lock_path_for(path);
    let lock_file = lock_exclusive(&lock_path, timeout)?;

    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));
    let json = serde_json::to_string_pretty(value)?;
    {
        let mut f = File::create(&tmp_path)?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;

    let _ = FileExt::unlock(&lock_file);
    Ok(())
}

/// Lock `path` once, read-or-default it into `T`, hand it to `f` for an
/// in-place mutation, then write the result back before unlocking — the
/// single-round-trip read-modify-write every cross-process counter in this
/// codebase (the rate limiter included) needs instead of separate
/// `read_or_default` + `write_atomic` calls, which would race two processes
/// between the read and the write.
pub fn with_lock<T, R>(
    path: impl AsRef<Path>,
    default: T,
    timeout: Duration,
    f: impl FnOnce(&mut T) -> R,
) -> anyhow::Result<R>
where
    T: DeserializeOwned + Serialize,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let lock_path = lock_path_for(path);
    let lock_file = lock_exclusive(&lock_path, timeout)?;

    let mut value = if path.exists() {
        match read_unlocked(path) {
            Some(v) => v,
            None => {
                quarantine(path);
                default
            }
        }
    } else {
        default
    };

    let result = f(&mut value);

    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("json")
    ));
    let json = serde_json::to_string_pretty(&value)?;
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;

    let _ = FileExt::unlock(&lock_file);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
    struct Scratch {
        n: u32,
    }

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("aurora-state-test-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn write_then_read_round_trips() {
        let path = scratch_path();
        let value = Scratch { n: 42 };
        write_atomic(&path, &value, Duration::from_secs(5)).unwrap();

        let read_back: Scratch = read_or_default(&path, Scratch::default(), Duration::from_secs(5));
        assert_eq!(read_back, value);

        std::fs::remove_file(&path).ok();
        std::fs::remove_file(lock_path_for(&path)).ok();
    }

    #[test]
    fn missing_file_yields_default() {
        let path = scratch_path();
        let read_back: Scratch =
            read_or_default(&path, Scratch { n: 7 }, Duration::from_secs(5));
        assert_eq!(read_back, Scratch { n: 7 });
    }

    #[test]
    fn corrupt_file_is_quarantined_and_default_returned() {
        let path = scratch_path();
        std::fs::write(&path, b"{not valid json").unwrap();

        let read_back: Scratch =
            read_or_default(&path, Scratch { n: 99 }, Duration::from_secs(5));
        assert_eq!(read_back, Scratch { n: 99 });

        let corrupt = path.with_extension("json.corrupt");
        assert!(corrupt.exists());

        std::fs::remove_file(&corrupt).ok();
        std::fs::remove_file(lock_path_for(&path)).ok();
    }

    #[test]
    fn with_lock_persists_the_mutation() {
        let path = scratch_path();

        with_lock(&path, Scratch::default(), Duration::from_secs(5), |s| {
            s.n += 1;
        })
        .unwrap();
        with_lock(&path, Scratch::default(), Duration::from_secs(5), |s| {
            s.n += 1;
        })
        .unwrap();

        let read_back: Scratch = read_or_default(&path, Scratch::default(), Duration::from_secs(5));
        assert_eq!(read_back, Scratch { n: 2 });

        std::fs::remove_file(&path).ok();
        std::fs::remove_file(lock_path_for(&path)).ok();
    }
}
