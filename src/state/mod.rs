// =============================================================================
// Shared state substrate — durable files under a shared state directory
// =============================================================================
//
// Every entity from spec §3 gets its own thin accessor module built on top
// of `atomic::{read_or_default, write_atomic}`. Each file has exactly one
// writer (single-writer discipline, spec §3 "Ownership"); these modules do
// not enforce that at the type level — it's a contract the service binaries
// honor by only calling the write half they own.
// =============================================================================

pub mod atomic;
pub mod cooldowns;
pub mod positions;
pub mod sell_signals;
pub mod signals;
pub mod status;
pub mod trades;
pub mod watchlist;

use std::path::{Path, PathBuf};

/// Handle bundling the state directory root so accessor modules don't each
/// need to reconstruct file paths.
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
    pub lock_timeout: std::time::Duration,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>, lock_timeout: std::time::Duration) -> Self {
        Self {
            root: root.into(),
            lock_timeout,
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Touch `<service>.heartbeat` with the current time, per SPEC_FULL §B.
    pub fn heartbeat(&self, service: &str) {
        let path = self.path(&format!("{service}.heartbeat"));
        if let Err(e) = std::fs::write(&path, crate::types::now_unix().to_string()) {
            tracing::warn!(service, error = %e, "failed to write heartbeat file");
        }
    }

    pub fn pid_file(&self, service: &str) -> PathBuf {
        self.path(&format!("{service}.pid"))
    }
}
