use orders_cache::config::Config;
use orders_cache::remote::HttpRemoteClient;
use orders_cache::storage::{OrderStore, SqliteStore};
use orders_cache::sync::{SyncCoordinator, SyncOutcome};
use std::env;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_CONFIG_PATH: &str = "configs/config.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Sync,
    List,
    Status,
}

fn parse_config_path() -> String {
    env::args()
        .skip(1)
        .find_map(|arg| arg.strip_prefix("--config=").map(str::to_string))
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

fn parse_command() -> Result<Command, String> {
    let command = env::args().skip(1).find(|arg| !arg.starts_with("--"));
    match command.as_deref() {
        None | Some("sync") => Ok(Command::Sync),
        Some("list") => Ok(Command::List),
        Some("status") => Ok(Command::Status),
        Some(other) => Err(format!("unknown command: {} (expected sync, list or status)", other)),
    }
}

/// RUST_LOG wins over `app.log_level`; an unparseable level falls back to info.
fn init_tracing(log_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

#[tokio::main]
async fn main() {
    let command = match parse_command() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let config_path = parse_config_path();
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.app.log_level.as_deref());

    info!(app = %config.app.name, env = %config.app.env, config = %config_path, ?command, "Starting");

    let store = match SqliteStore::new(config.storage.clone().into()).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, path = %config.storage.path, "Failed to open order store");
            std::process::exit(1);
        }
    };

    let remote = match HttpRemoteClient::from_config(&config.remote) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!(error = %e, "Failed to create remote client");
            std::process::exit(1);
        }
    };

    let coordinator = SyncCoordinator::new(remote, store.clone());

    let ok = match command {
        Command::Sync => run_sync(&coordinator).await,
        Command::List => run_list(&coordinator).await,
        Command::Status => run_status(&coordinator, store.as_ref()).await,
    };

    if let Err(e) = store.close().await {
        error!(error = %e, "Failed to close order store");
    }

    if !ok {
        std::process::exit(1);
    }
}

async fn run_sync(coordinator: &SyncCoordinator) -> bool {
    match coordinator.sync().await {
        Ok(SyncOutcome::AlreadyCached) => {
            info!("Orders already cached");
            true
        }
        Ok(SyncOutcome::Fetched { inserted }) => {
            info!(inserted, "Orders downloaded and cached");
            true
        }
        Err(e) => {
            error!(stage = %e.stage(), kind = ?e.kind(), error = %e, "Sync failed");
            false
        }
    }
}

async fn run_list(coordinator: &SyncCoordinator) -> bool {
    match coordinator.cached_orders().await {
        Ok(orders) => {
            for order in &orders {
                println!(
                    "{}  {}  {:>24} {:<6} {:<8} {}",
                    order.created_at.format("%Y-%m-%d %H:%M:%S"),
                    order.order_id,
                    order.signed_amount(),
                    order.currency,
                    order.order_type,
                    order.status,
                );
            }
            info!(count = orders.len(), "Listed cached orders");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to read cached orders");
            false
        }
    }
}

async fn run_status(coordinator: &SyncCoordinator, store: &dyn OrderStore) -> bool {
    let cached = match coordinator.has_cached_orders().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to query order store");
            return false;
        }
    };

    match store.count().await {
        Ok(count) => {
            println!("cached: {}  orders: {}", cached, count);
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to count cached orders");
            false
        }
    }
}
