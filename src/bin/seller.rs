// =============================================================================
// seller — every 15 s, execute pending exits and finalize bookkeeping
// (spec §4.5)
// =============================================================================

use std::collections::HashMap;

use clap::Parser;
use tracing::{info, warn};

use aurora_momentum::cli::{broker_client, CommonArgs};
use aurora_momentum::seller;

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
    let _guard = aurora_momentum::cli::init_logging(state.root(), "seller");
    let broker = broker_client(&cfg, &state)?;

    info!(state_dir = %state.root().display(), interval = cfg.seller_interval_seconds, "seller starting");

    let mut failure_counts: HashMap<String, u32> = HashMap::new();
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(cfg.seller_interval_seconds));
    let mut shutdown = aurora_momentum::cli::Shutdown::new()?;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.recv() => {
                info!("shutdown signal received, exiting");
                break;
            }
        }
        if let Err(e) = seller::run(&broker, &state, &cfg, &mut failure_counts).await {
            warn!(error = %e, "seller cycle failed");
        }
        state.heartbeat("seller");

        if args.once {
            break;
        }
    }
    Ok(())
}
