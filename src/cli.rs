// =============================================================================
// Shared binary bootstrap — logging, state dir, broker client (SPEC_FULL §A.1)
// =============================================================================
//
// Every `src/bin/*.rs` entry point does the same three things before it gets
// to its service loop: load `.env`, stand up dual stdout + rotating-file
// tracing, and build an `AlpacaClient` behind the shared rate limiter. That
// boilerplate lives here once instead of six times.

use std::path::PathBuf;
use std::sync::Arc;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::broker::{AlpacaClient, RateLimiter};
use crate::config::Config;
use crate::state::StateDir;

/// Initialize the dual stdout + `logs/<service>.log` subscriber (SPEC_FULL
/// §A.1). The returned guard must be held for the process lifetime or the
/// non-blocking file writer stops flushing.
pub fn init_logging(state_root: &std::path::Path, service: &str) -> WorkerGuard {
    let log_dir = state_root.join("logs");
    let _ = std::fs::create_dir_all(&log_dir);

    // tracing-appender has no size-based rotation; daily rotation is the
    // nearest built-in equivalent to the "10 MB x 5" file appender named in
    // SPEC_FULL §A.1 (see DESIGN.md).
    let file_appender = tracing_appender::rolling::daily(&log_dir, format!("{service}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(non_blocking);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Common CLI surface shared by every service binary (spec §6.3): a state
/// directory and an optional config file path.
#[derive(Debug, Clone, clap::Args)]
pub struct CommonArgs {
    /// Directory holding the shared state files (spec §3).
    #[arg(long, default_value = "./state")]
    pub state_dir: PathBuf,

    /// Path to the JSON config file (spec §6.4). Defaults are used if absent.
    #[arg(long, default_value = "./config.json")]
    pub config: PathBuf,
}

impl CommonArgs {
    pub fn load_config(&self) -> Config {
        Config::load_or_default(&self.config)
    }

    pub fn state(&self, cfg: &Config) -> anyhow::Result<StateDir> {
        std::fs::create_dir_all(&self.state_dir)?;
        Ok(StateDir::new(
            self.state_dir.clone(),
            std::time::Duration::from_secs(cfg.lock_timeout_seconds),
        ))
    }
}

/// Build the shared `AlpacaClient` + rate limiter every service uses to talk
/// to the broker (spec §5 "200 calls/min across all services"). The limiter
/// is backed by a file under `state`'s root so the budget is actually
/// shared across the six independent service processes, not just within
/// this one.
pub fn broker_client(cfg: &Config, state: &StateDir) -> anyhow::Result<AlpacaClient> {
    let limiter = Arc::new(RateLimiter::new(
        cfg.api_rate_limit,
        state.root(),
        state.lock_timeout,
    ));
    AlpacaClient::from_env(limiter)
}

/// Resolve `RUST_LOG`-style service-local defaults: `.env` in the current
/// directory, falling back silently (spec §6.4 config already has its own
/// defaults; a missing `.env` is not an error).
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Listens for Ctrl-C and, on Unix, SIGTERM — the signal the Orchestrator's
/// `stop` sends a child before escalating to a hard kill (spec §4.7, §5
/// "Cancellation and timeouts"). `recv()` resolves once and is meant to be
/// raced against the service's cycle interval inside a `tokio::select!`.
pub struct Shutdown {
    #[cfg(unix)]
    sigterm: tokio::signal::unix::Signal,
}

impl Shutdown {
    pub fn new() -> anyhow::Result<Self> {
        #[cfg(unix)]
        {
            let sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
            Ok(Self { sigterm })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    pub async fn recv(&mut self) {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = self.sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
