// =============================================================================
// scanner — every 45 s during market hours, score the watchlist and emit
// entry signals (spec §4.2)
// =============================================================================

use clap::Parser;
use tracing::{info, warn};

use aurora_momentum::cli::{broker_client, CommonArgs};
use aurora_momentum::scanner;
use aurora_momentum::universe;

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Fallback ticker list used when no daily watchlist exists yet
    /// (spec §4.2 step 1, degraded mode).
    #[arg(long, default_value = "./base_universe.txt")]
    universe: std::path::PathBuf,

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
    let _guard = aurora_momentum::cli::init_logging(state.root(), "scanner");
    let broker = broker_client(&cfg, &state)?;

    info!(state_dir = %state.root().display(), interval = cfg.scan_interval_seconds, "scanner starting");

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(cfg.scan_interval_seconds));
    let mut shutdown = aurora_momentum::cli::Shutdown::new()?;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.recv() => {
                info!("shutdown signal received, exiting");
                break;
            }
        }

        match broker.get_clock().await {
            Ok(clock) if !clock.is_open => {
                info!("market closed, skipping scan cycle");
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch market clock, skipping cycle");
            }
            _ => {
                let base_universe = universe::load_base_universe(&args.universe);
                if let Err(e) = scanner::run(&broker, &state, &cfg, &base_universe).await {
                    warn!(error = %e, "scanner cycle failed");
                }
            }
        }
        state.heartbeat("scanner");

        if args.once {
            break;
        }
    }
    Ok(())
}
