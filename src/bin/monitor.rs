// =============================================================================
// monitor — every 30 s, reconcile positions and evaluate exit rules
// (spec §4.4)
// =============================================================================

use clap::Parser;
use tracing::{info, warn};

use aurora_momentum::cli::{broker_client, CommonArgs};
use aurora_momentum::monitor;

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Run a single cycle and exit, instead of looping (debugging aid).
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aurora_momentum::cli::load_dotenv();
    let args = Args::parse();
    let cfg = args.common.load_config();
    let state = args.common.state(&cfg)?;
    let _guard = aurora_momentum::cli::init_logging(state.root(), "monitor");
    let broker = broker_client(&cfg, &state)?;

    info!(state_dir = %state.root().display(), interval = cfg.monitor_interval_seconds, "monitor starting");

    // Reconcile once immediately on startup (spec §5 "Restart safety":
    // positions not actually held at the broker are dropped before the
    // first scheduled cycle).
    if let Err(e) = monitor::run(&broker, &state, &cfg).await {
        warn!(error = %e, "startup reconciliation cycle failed");
    }
    state.heartbeat("monitor");

    if args.once {
        return Ok(());
    }

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(cfg.monitor_interval_seconds));
    interval.tick().await; // first tick fires immediately; we already ran above
    let mut shutdown = aurora_momentum::cli::Shutdown::new()?;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.recv() => {
                info!("shutdown signal received, exiting");
                break;
            }
        }
        if let Err(e) = monitor::run(&broker, &state, &cfg).await {
            warn!(error = %e, "monitor cycle failed");
        }
        state.heartbeat("monitor");
    }
    Ok(())
}
