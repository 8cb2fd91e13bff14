use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{app, config::Config, services::sweeper::ExpirationSweeper, AppState};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cinema booking service ({})", config.app.environment);

    // Create the shared application state
    let state = AppState::new(config.clone()).await?;

    // --- Start background tasks ---

    // Expired screenings are reclaimed every interval; the task is never joined
    ExpirationSweeper::from_config(Arc::clone(&state.store), &config.sweeper).spawn();

    // --- Start the web server ---

    let router = app(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;
    Ok(())
}
