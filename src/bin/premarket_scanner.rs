// =============================================================================
// premarket-scanner — single-shot binary, scheduled by the Orchestrator
// between 08:00-09:25 ET (spec §4.1)
// =============================================================================

use chrono::Utc;
use clap::Parser;
use tracing::{error, info};

use aurora_momentum::cli::{broker_client, CommonArgs};
use aurora_momentum::state::watchlist;
use aurora_momentum::universe;

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Path to the base universe ticker list (spec §4.1 step 1).
    #[arg(long, default_value = "./base_universe.txt")]
    universe: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aurora_momentum::cli::load_dotenv();
    let args = Args::parse();
    let cfg = args.common.load_config();
    let state = args.common.state(&cfg)?;
    let _guard = aurora_momentum::cli::init_logging(state.root(), "premarket_scanner");

    info!(state_dir = %state.root().display(), "premarket-scanner starting");

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    if watchlist::load_for_date(&state, &today).is_some() {
        info!(date = %today, "watchlist already produced for today, nothing to do");
        return Ok(());
    }

    let base_universe = universe::load_base_universe(&args.universe);
    if base_universe.is_empty() {
        error!("base universe is empty, cannot build today's watchlist");
        return Ok(());
    }
    info!(symbols = base_universe.len(), "scanning base universe");

    let broker = broker_client(&cfg, &state)?;
    aurora_momentum::premarket::run(&broker, &state, &cfg, &base_universe).await?;
    state.heartbeat("premarket_scanner");

    info!("premarket-scanner run complete");
    Ok(())
}
