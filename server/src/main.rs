use anyhow::Result;
use dotenvy::dotenv;
use flight_server::{build_router, config::Config, AppState};
use std::{env, net::SocketAddr, time::Duration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "flight_server=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let port = config.port;
    let idle = config.session_idle()?;
    let retention = config.transcript_retention()?;
    let max_records = config.transcript_max_records;
    let sweep_every = Duration::from_secs(config.session_sweep_secs.max(1));

    let state = AppState::new(config)?;

    // Idle chat sessions, old transcript records and spent rate-limit windows
    // are dropped periodically.
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now();
            let pruned = sweeper.assistant.sessions().write().await.prune_idle(idle, now);
            let records = sweeper.assistant.transcript().prune(now - retention, max_records).await;
            let windows = sweeper.limiters.sweep().await;
            if pruned > 0 || records > 0 || windows > 0 {
                info!(
                    "Swept {} idle sessions, {} chat records, {} rate-limit windows",
                    pruned, records, windows
                );
            }
        }
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
