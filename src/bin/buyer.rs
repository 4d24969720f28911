// =============================================================================
// buyer — every 15 s (full), plus a 5 s fast path for score >= 90 signals
// (spec §4.3)
// =============================================================================

use clap::Parser;
use tracing::{info, warn};

use aurora_momentum::buyer::{self, dedupe::SignalDedupe};
use aurora_momentum::cli::{broker_client, CommonArgs};

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Run a single cycle and exit, instead of looping (debugging aid).
    #[arg(long)]
    once: bool,
}

const DEDUPE_CAPACITY: usize = 4096;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aurora_momentum::cli::load_dotenv();
    let args = Args::parse();
    let cfg = args.common.load_config();
    let state = args.common.state(&cfg)?;
    let _guard = aurora_momentum::cli::init_logging(state.root(), "buyer");
    let broker = broker_client(&cfg, &state)?;

    info!(
        state_dir = %state.root().display(),
        full_interval = cfg.buyer_interval_seconds,
        fast_interval = cfg.hot_check_interval_seconds,
        "buyer starting"
    );

    let mut dedupe = SignalDedupe::new(DEDUPE_CAPACITY);
    let mut ticks_since_full: u64 = 0;
    // Ceiling division so a full cycle runs at least as often as spec's 15 s.
    let ticks_per_full = cfg
        .buyer_interval_seconds
        .div_ceil(cfg.hot_check_interval_seconds.max(1));

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(
        cfg.hot_check_interval_seconds.max(1),
    ));
    let mut shutdown = aurora_momentum::cli::Shutdown::new()?;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.recv() => {
                info!("shutdown signal received, exiting");
                break;
            }
        }

        let market_open = match broker.get_clock().await {
            Ok(clock) => clock.is_open,
            Err(e) => {
                warn!(error = %e, "failed to fetch market clock, skipping cycle");
                false
            }
        };

        if market_open {
            let fast_path_only = ticks_since_full < ticks_per_full - 1;
            if let Err(e) = buyer::run(&broker, &state, &cfg, &mut dedupe, fast_path_only).await {
                warn!(error = %e, "buyer cycle failed");
            }
            ticks_since_full = if fast_path_only { ticks_since_full + 1 } else { 0 };
        }
        state.heartbeat("buyer");

        if args.once {
            break;
        }
    }
    Ok(())
}
