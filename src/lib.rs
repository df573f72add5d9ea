//! # KaminariMerch
//!
//! A small merch storefront paid over the Lightning Network, with a blog on
//! the side, built on [axum](https://crates.io/crates/axum),
//! [Sea-ORM](https://crates.io/crates/sea-orm) and
//! [`tower-sessions`](https://crates.io/crates/tower-sessions).
//!
//! ## Features
//!
//! - Product catalogue with a session-backed shopping cart
//! - Checkout through Strike Lightning charges, confirmed by webhook or by polling
//! - Optional websocket notifications when an order is paid
//! - Accounts with bcrypt passwords and an `admin` role
//! - Admin panel with list, details, inline edit, CSV export and image upload
//! - Sessions persisted through Sea-ORM and serialized with MessagePack
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kaminari_merch::{bootstrap, create_app, AppConfig, AppState, SeaOrmStore, StrikeClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let db = bootstrap::init_database(&config.database_url).await?;
//! bootstrap::seed_demo_data(&db).await?;
//!
//! let payments = Arc::new(StrikeClient::new(&config.strike_api_key)?);
//! let store = SeaOrmStore::new(db.clone());
//! let app = create_app(AppState::new(db, payments, config), store);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Payment flow
//!
//! `GET /checkout` turns the cart into an order and a Lightning charge. The
//! order is marked paid once the processor reports the charge paid, either
//! through `POST /confirm_payment` or when the customer checks the order.
//!
//! ```no_run
//! use kaminari_merch::{core::order, PaymentProcessor};
//! use sea_orm::DatabaseConnection;
//!
//! # async fn example(db: DatabaseConnection, payments: &dyn PaymentProcessor) -> kaminari_merch::Result<()> {
//! if let Some(order) = order::find_by_charge_id(&db, "ch_123").await? {
//!     let paid = order::check_paid(&db, payments, &order).await?;
//!     println!("order {} paid: {paid}", order.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod app;
pub mod auth;
pub mod bootstrap;
pub mod cart;
pub mod config;
pub mod core;
pub mod entity;
pub mod error;
pub mod migration;
pub mod routes;
pub mod session_store;
pub mod strike;
pub mod ws;

#[cfg(test)]
mod test_utils;

pub use app::{create_app, create_socketed_app, AppState};
pub use config::AppConfig;
pub use error::{AppError, Result};
pub use strike::{PaymentProcessor, StrikeClient};

/// Sea-ORM backed `tower-sessions` store
///
/// See [`SeaOrmStore`] documentation for usage details.
pub use session_store::SeaOrmStore;

/// Trait for implementing session store expiration cleanup
///
/// Implemented by `SeaOrmStore`; the binary runs it periodically.
pub use tower_sessions::ExpiredDeletion;
