// =============================================================================
// orchestrator — lifecycle supervision for the five services (spec §4.7)
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use aurora_momentum::cli::{broker_client, CommonArgs};
use aurora_momentum::orchestrator::{api, Supervisor};
use aurora_momentum::state::watchlist;
use aurora_momentum::universe;

#[derive(Parser)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory the service binaries live in (default: alongside this
    /// executable, i.e. cargo's own build output directory).
    #[arg(long)]
    binary_dir: Option<std::path::PathBuf>,

    /// Base universe file, forwarded to the premarket-scanner when the
    /// orchestrator triggers it on schedule.
    #[arg(long, default_value = "./base_universe.txt")]
    universe: std::path::PathBuf,

    /// Address the read-only `/status` mirror binds to during `start`/`monitor`.
    #[arg(long, default_value = "127.0.0.1:8787")]
    status_addr: std::net::SocketAddr,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Launch every service in priority order and exit once started.
    Start,
    /// Gracefully stop every running service.
    Stop,
    /// Stop then start every service.
    Restart,
    /// Print the current status of every service.
    Status,
    /// Like `start`, but stays resident and restarts crashed services with
    /// exponential backoff (spec §4.7 `monitor`).
    Monitor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aurora_momentum::cli::load_dotenv();
    let args = Args::parse();
    let cfg = args.common.load_config();
    let state = args.common.state(&cfg)?;
    let _guard = aurora_momentum::cli::init_logging(state.root(), "orchestrator");

    let binary_dir = args
        .binary_dir
        .clone()
        .or_else(|| std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.to_path_buf())))
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    let mut supervisor = Supervisor::new(state.clone(), binary_dir);

    let exit_code = match args.command {
        Command::Start => match supervisor.start_all().await {
            Ok(()) => {
                supervisor.write_status(&cfg)?;
                info!("all services started");
                0
            }
            Err(e) => {
                error!(error = %e, "failed to start services");
                1
            }
        },
        Command::Stop => match supervisor.stop_all().await {
            Ok(()) => {
                supervisor.write_status(&cfg)?;
                info!("all services stopped");
                0
            }
            Err(e) => {
                error!(error = %e, "failed to stop services");
                1
            }
        },
        Command::Restart => match supervisor.restart_all().await {
            Ok(()) => {
                supervisor.write_status(&cfg)?;
                info!("all services restarted");
                0
            }
            Err(e) => {
                error!(error = %e, "failed to restart services");
                1
            }
        },
        Command::Status => {
            supervisor.write_status(&cfg)?;
            match aurora_momentum::state::status::load(&state) {
                Some(status) => {
                    for svc in &status.services {
                        println!(
                            "{:<10} {:<9} pid={:<8} heartbeat_age={:<6} restarts={}",
                            svc.name,
                            svc.state,
                            svc.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                            svc.heartbeat_age_seconds
                                .map(|a| format!("{a}s"))
                                .unwrap_or_else(|| "-".into()),
                            svc.restart_count,
                        );
                    }
                    0
                }
                None => {
                    println!("no status recorded yet");
                    0
                }
            }
        }
        Command::Monitor => {
            run_monitor_loop(&mut supervisor, &cfg, &state, &args).await?;
            0
        }
    };

    std::process::exit(exit_code);
}

/// `monitor`: supervise indefinitely, restarting crashed services and
/// running the PreMarketScanner once per trading day on its own schedule
/// (spec §4.7 `monitor`, §4.1).
async fn run_monitor_loop(
    supervisor: &mut Supervisor,
    cfg: &aurora_momentum::config::Config,
    state: &aurora_momentum::state::StateDir,
    args: &Args,
) -> anyhow::Result<()> {
    supervisor.start_all().await?;
    supervisor.write_status(cfg)?;

    let router = api::router(Arc::new(state.clone()));
    let listener = tokio::net::TcpListener::bind(args.status_addr).await?;
    info!(addr = %args.status_addr, "status endpoint listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            warn!(error = %e, "status server exited");
        }
    });

    let broker = broker_client(cfg, state)?;
    let mut tick = tokio::time::interval(Duration::from_secs(5));
    let mut shutdown = aurora_momentum::cli::Shutdown::new()?;
    loop {
        tokio::select! {
            _ = tick.tick() => {
                supervisor.tick().await?;
                supervisor.write_status(cfg)?;
                maybe_run_premarket_scan(&broker, state, cfg, &args.universe).await;
            }
            _ = shutdown.recv() => {
                info!("shutdown signal received, stopping all services");
                supervisor.stop_all().await?;
                supervisor.write_status(cfg)?;
                break;
            }
        }
    }
    Ok(())
}

/// Run the premarket-scanner exactly once, inside its 08:00-09:25 ET-
/// equivalent window (90 to 5 minutes before the broker's reported next
/// open), if today's watchlist hasn't been produced yet.
async fn maybe_run_premarket_scan(
    broker: &aurora_momentum::broker::AlpacaClient,
    state: &aurora_momentum::state::StateDir,
    cfg: &aurora_momentum::config::Config,
    universe_path: &std::path::Path,
) {
    use aurora_momentum::broker::BrokerClient;

    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    if watchlist::load_for_date(state, &today).is_some() {
        return;
    }

    let clock = match broker.get_clock().await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "failed to fetch market clock for premarket scheduling");
            return;
        }
    };

    let now = chrono::Utc::now();
    let window_start = clock.next_open - chrono::Duration::minutes(90);
    let window_end = clock.next_open - chrono::Duration::minutes(5);
    if now < window_start || now > window_end {
        return;
    }

    info!("within premarket scan window, running premarket scan");
    let base_universe = universe::load_base_universe(universe_path);
    if base_universe.is_empty() {
        error!("base universe is empty, cannot build today's watchlist");
        return;
    }
    if let Err(e) = aurora_momentum::premarket::run(broker, state, cfg, &base_universe).await {
        error!(error = %e, "premarket scan failed");
    }
}
