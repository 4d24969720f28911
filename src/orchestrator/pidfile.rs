// =============================================================================
// PID file + heartbeat liveness checks (spec §4.7 "status" command)
// =============================================================================

use std::path::Path;
use std::time::Duration;

use tracing::warn;

use crate::state::StateDir;
use crate::types::now_unix;

/// Write `pid` to `<service>.pid` atomically.
pub fn write_pid(state: &StateDir, service: &str, pid: u32) -> anyhow::Result<()> {
    let path = state.pid_file(service);
    let tmp = path.with_extension("pid.tmp");
    std::fs::write(&tmp, pid.to_string())?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

pub fn remove_pid(state: &StateDir, service: &str) {
    let _ = std::fs::remove_file(state.pid_file(service));
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Is the process at this PID alive? Checked via `/proc/<pid>` existence,
/// which is available on every target this codebase ships to.
#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Determine service liveness by PID existence + process liveness + a
/// heartbeat freshness check (spec §4.7 `status`: "heartbeat file updated
/// within last 2 × service_interval"). Stale PID files are removed.
pub fn is_alive(state: &StateDir, service: &str, service_interval: Duration) -> bool {
    let pid_path = state.pid_file(service);
    let Some(pid) = read_pid(&pid_path) else {
        return false;
    };

    if !process_alive(pid) {
        warn!(service, pid, "stale PID file found, cleaning up");
        let _ = std::fs::remove_file(&pid_path);
        return false;
    }

    let heartbeat_path = state.path(&format!("{service}.heartbeat"));
    let Ok(raw) = std::fs::read_to_string(&heartbeat_path) else {
        return false;
    };
    let Ok(last_beat) = raw.trim().parse::<i64>() else {
        return false;
    };

    let max_age = service_interval.as_secs() as i64 * 2;
    now_unix() - last_beat <= max_age.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> StateDir {
        let root = std::env::temp_dir().join(format!("aurora-pid-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).unwrap();
        StateDir::new(root, Duration::from_secs(5))
    }

    #[test]
    fn absent_pid_file_is_not_alive() {
        let dir = scratch();
        assert!(!is_alive(&dir, "scanner", Duration::from_secs(45)));
    }

    #[test]
    fn fresh_heartbeat_with_live_pid_is_alive() {
        let dir = scratch();
        write_pid(&dir, "scanner", std::process::id()).unwrap();
        dir.heartbeat("scanner");
        assert!(is_alive(&dir, "scanner", Duration::from_secs(45)));
    }

    #[test]
    fn stale_heartbeat_is_not_alive() {
        let dir = scratch();
        write_pid(&dir, "scanner", std::process::id()).unwrap();
        std::fs::write(dir.path("scanner.heartbeat"), (now_unix() - 1000).to_string()).unwrap();
        assert!(!is_alive(&dir, "scanner", Duration::from_secs(45)));
    }
}
