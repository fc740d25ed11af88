use anyhow::Context;
use p2p_exchange::{api, config::Config, db::init_db, Exchange, Repository, SystemClock};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Periodically expire orders whose time has run out, releasing their escrow.
fn spawn_expiry_sweep(exchange: Arc<Exchange>, interval_ms: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = exchange.sweep_expired().await {
                tracing::warn!(error = %e, "Background expiry sweep failed");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let repo = Arc::new(Repository::new(pool));
    let exchange = Arc::new(Exchange::new(
        repo,
        Arc::new(SystemClock),
        config.exchange_settings(),
    ));

    let summary = exchange
        .escrow_summary()
        .await
        .context("Failed to read ledger totals")?;
    tracing::info!(?summary, "Ledger loaded");

    if config.expiry_sweep_interval_ms > 0 {
        spawn_expiry_sweep(exchange.clone(), config.expiry_sweep_interval_ms);
    }

    let app = api::create_router(api::AppState::new(exchange));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
