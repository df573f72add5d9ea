use std::{sync::Arc, time::Duration};

use dotenvy::dotenv;
use kaminari_merch::{
    bootstrap, create_app, create_socketed_app, AppConfig, AppState, ExpiredDeletion, SeaOrmStore,
    StrikeClient,
};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    dotenv().ok();
    let config = AppConfig::from_env()?;

    info!("Connecting to database");
    let db = bootstrap::init_database(&config.database_url).await?;
    if config.seed_demo_data {
        bootstrap::seed_demo_data(&db).await?;
    }

    let store = SeaOrmStore::new(db.clone());
    let cleanup_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = cleanup_store.delete_expired().await {
                error!(error = %e, "Session cleanup failed");
            }
        }
    });

    let payments =
        Arc::new(StrikeClient::new(&config.strike_api_key)?.with_endpoint(&config.strike_endpoint));
    let addr = config.bind_addr;
    let sockets = config.enable_sockets;
    let state = AppState::new(db, payments, config);
    let app = if sockets {
        create_socketed_app(state, store)
    } else {
        create_app(state, store)
    };

    info!("Server starting on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
