//! Dev Ledger - Entry point.

use dev_ledger::{create_router, AppState, Config, DevLedger};
use ledger_client::Ledger;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let json = config.log.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    info!("Starting development ledger");

    let ledger = DevLedger::new(config.chain.clone());
    if let Ok(accounts) = ledger.accounts().await {
        for (index, account) in accounts.iter().enumerate() {
            info!("Account ({}) {}", index, account);
        }
    }
    let state = AppState::new(ledger);
    let app = create_router(state);

    let addr = match config.server.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid listen address: {:#}", e);
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
