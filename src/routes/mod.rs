//! HTTP handlers for the storefront and the blog.
//!
//! Pages answer with JSON view models; form posts take
//! `application/x-www-form-urlencoded` bodies like the HTML forms they back.

use axum::Router;
use serde::Deserialize;

use crate::app::AppState;

pub mod auth;
pub mod blog;
pub mod orders;
pub mod settings;
pub mod store;
pub mod webhook;

/// Form body carrying a single product or order id.
#[derive(Debug, Deserialize)]
pub struct IdForm {
    pub id: i32,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(store::router())
        .merge(auth::router())
        .merge(settings::router())
        .merge(orders::router())
        .merge(webhook::router())
        .merge(blog::router())
}
