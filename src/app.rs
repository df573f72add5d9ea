//! Application state and router construction.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use time::Duration;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::{
    admin,
    config::AppConfig,
    routes,
    session_store::SeaOrmStore,
    strike::PaymentProcessor,
    ws::{self, PaymentEvents},
};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub payments: Arc<dyn PaymentProcessor>,
    pub events: PaymentEvents,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        payments: Arc<dyn PaymentProcessor>,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            payments,
            events: PaymentEvents::default(),
            config: Arc::new(config),
        }
    }
}

/// Builds the store, blog and admin routes behind the session layer.
///
/// ```no_run
/// use std::sync::Arc;
/// use kaminari_merch::{create_app, AppConfig, AppState, SeaOrmStore, StrikeClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::from_env()?;
/// let db = sea_orm::Database::connect(&config.database_url).await?;
/// let payments = Arc::new(StrikeClient::new(&config.strike_api_key)?);
/// let store = SeaOrmStore::new(db.clone());
///
/// let app = create_app(AppState::new(db, payments, config), store);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_app(state: AppState, store: SeaOrmStore) -> Router {
    build(state, store, false)
}

/// Same as [`create_app`] plus `/ws` and the webhook that notifies open
/// sockets when an order is paid.
pub fn create_socketed_app(state: AppState, store: SeaOrmStore) -> Router {
    build(state, store, true)
}

fn build(state: AppState, store: SeaOrmStore, sockets: bool) -> Router {
    let session_layer = SessionManagerLayer::new(store)
        .with_secure(state.config.session_secure)
        .with_expiry(Expiry::OnInactivity(Duration::days(
            state.config.session_expiry_days,
        )));

    let mut router = Router::new()
        .merge(routes::router())
        .merge(admin::router())
        .nest_service("/static/images", ServeDir::new(&state.config.image_dir));

    if sockets {
        router = router
            .route("/ws", get(ws::ws_handler))
            .route(
                "/confirm_payment_socket",
                post(routes::webhook::confirm_payment_socket),
            );
    }

    router
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
