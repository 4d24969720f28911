// =============================================================================
// Supervisor — spawn, monitor, and restart the five service processes
// (spec §4.7)
// =============================================================================

use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use super::pidfile;
use crate::config::Config;
use crate::state::{status, StateDir};
use crate::types::{now_unix, OrchestratorStatus, ServiceState, ServiceStatus};

/// Services in the start priority spec §4.7 specifies: Seller, Buyer,
/// Monitor, Scanner; PreMarketScanner runs on its own daily schedule rather
/// than as a continuously-supervised child.
pub const SUPERVISED_SERVICES: &[&str] = &["seller", "buyer", "monitor", "scanner"];

struct Supervised {
    child: Option<Child>,
    state: ServiceState,
    restart_count: u32,
    backoff: Duration,
    last_restart: Option<Instant>,
}

impl Supervised {
    fn new() -> Self {
        Self {
            child: None,
            state: ServiceState::Stopped,
            restart_count: 0,
            backoff: Duration::from_secs(1),
            last_restart: None,
        }
    }
}

pub struct Supervisor {
    state_dir: StateDir,
    binary_dir: std::path::PathBuf,
    services: HashMap<String, Supervised>,
}

impl Supervisor {
    pub fn new(state_dir: StateDir, binary_dir: std::path::PathBuf) -> Self {
        let services = SUPERVISED_SERVICES
            .iter()
            .map(|s| (s.to_string(), Supervised::new()))
            .collect();
        Self { state_dir, binary_dir, services }
    }

    fn binary_path(&self, service: &str) -> std::path::PathBuf {
        self.binary_dir.join(service)
    }

    /// Launch one service as a child process, writing its PID file.
    async fn spawn(&mut self, service: &str) -> anyhow::Result<()> {
        let exe = self.binary_path(service);
        info!(service, path = %exe.display(), "starting service");

        let child = Command::new(&exe)
            .arg("--state-dir")
            .arg(self.state_dir.root())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let pid = child.id().unwrap_or(0);
        pidfile::write_pid(&self.state_dir, service, pid)?;

        let entry = self.services.get_mut(service).expect("known service name");
        entry.child = Some(child);
        entry.state = ServiceState::Running;
        Ok(())
    }

    /// `start`: launch every supervised service in priority order.
    pub async fn start_all(&mut self) -> anyhow::Result<()> {
        for service in SUPERVISED_SERVICES.to_vec() {
            self.spawn(service).await?;
        }
        Ok(())
    }

    /// `stop`: send a graceful shutdown (SIGTERM on Unix) to every running
    /// child, wait up to 30 s, then force-kill stragglers (spec §5
    /// "Cancellation and timeouts").
    pub async fn stop_all(&mut self) -> anyhow::Result<()> {
        for service in SUPERVISED_SERVICES {
            if let Some(entry) = self.services.get_mut(*service) {
                if let Some(child) = entry.child.as_mut() {
                    terminate_gracefully(service, child, Duration::from_secs(30)).await;
                    entry.state = ServiceState::Stopped;
                }
                pidfile::remove_pid(&self.state_dir, service);
            }
        }
        Ok(())
    }

    pub async fn restart_all(&mut self) -> anyhow::Result<()> {
        self.stop_all().await?;
        self.start_all().await
    }

    /// One supervision tick: reap any exited child, and if it crashed,
    /// restart with exponential backoff capped at 60 s; reset the backoff
    /// after 5 minutes of stability (spec §4.7 `monitor`).
    pub async fn tick(&mut self) -> anyhow::Result<()> {
        for service in SUPERVISED_SERVICES.to_vec() {
            let exited = {
                let entry = self.services.get_mut(service).expect("known service name");
                match entry.child.as_mut() {
                    Some(child) => child.try_wait().ok().flatten().is_some(),
                    None => true,
                }
            };

            if !exited {
                continue;
            }

            let entry = self.services.get_mut(service).expect("known service name");
            if let Some(last) = entry.last_restart {
                if last.elapsed() >= Duration::from_secs(5 * 60) {
                    entry.backoff = Duration::from_secs(1);
                    entry.restart_count = 0;
                }
            }
            entry.state = ServiceState::Crashed;
            warn!(service, backoff_secs = entry.backoff.as_secs(), "service crashed, restarting");

            let wait = entry.backoff;
            tokio::time::sleep(wait).await;

            if let Err(e) = self.spawn(service).await {
                error!(service, error = %e, "failed to restart crashed service");
                continue;
            }
            let entry = self.services.get_mut(service).expect("known service name");
            entry.restart_count += 1;
            entry.last_restart = Some(Instant::now());
            entry.backoff = (entry.backoff * 2).min(Duration::from_secs(60));
        }
        Ok(())
    }

    /// `status`: compute and persist the whole-engine snapshot.
    pub fn write_status(&self, cfg: &Config) -> anyhow::Result<()> {
        let services = SUPERVISED_SERVICES
            .iter()
            .map(|service| {
                let interval = service_interval(service, cfg);
                let alive = pidfile::is_alive(&self.state_dir, service, interval);
                let entry = self.services.get(*service);
                ServiceStatus {
                    name: service.to_string(),
                    state: if alive {
                        ServiceState::Running
                    } else {
                        entry.map(|e| e.state).unwrap_or(ServiceState::Stopped)
                    },
                    pid: read_pid(&self.state_dir, service),
                    heartbeat_age_seconds: heartbeat_age(&self.state_dir, service),
                    restart_count: entry.map(|e| e.restart_count).unwrap_or(0),
                }
            })
            .collect();

        status::save(
            &self.state_dir,
            &OrchestratorStatus { generated_at: now_unix(), services },
        )
    }
}

fn service_interval(service: &str, cfg: &Config) -> Duration {
    let secs = match service {
        "scanner" => cfg.scan_interval_seconds,
        "monitor" => cfg.monitor_interval_seconds,
        "buyer" => cfg.buyer_interval_seconds,
        "seller" => cfg.seller_interval_seconds,
        _ => cfg.monitor_interval_seconds,
    };
    Duration::from_secs(secs)
}

fn read_pid(state: &StateDir, service: &str) -> Option<u32> {
    std::fs::read_to_string(state.pid_file(service)).ok()?.trim().parse().ok()
}

fn heartbeat_age(state: &StateDir, service: &str) -> Option<i64> {
    let raw = std::fs::read_to_string(state.path(&format!("{service}.heartbeat"))).ok()?;
    let last_beat: i64 = raw.trim().parse().ok()?;
    Some(now_unix() - last_beat)
}

#[cfg(unix)]
async fn terminate_gracefully(service: &str, child: &mut Child, timeout: Duration) {
    if let Some(pid) = child.id() {
        let _ = std::process::Command::new("kill")
            .arg("-TERM")
            .arg(pid.to_string())
            .status();
    }

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(_) => info!(service, "service exited gracefully"),
        Err(_) => {
            warn!(service, "graceful shutdown timed out, force-killing");
            let _ = child.kill().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_gracefully(service: &str, child: &mut Child, _timeout: Duration) {
    warn!(service, "non-unix platform: force-killing directly");
    let _ = child.kill().await;
}
