use axum::{
    extract::State,
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_sessions::Session;
use tracing::info;

use crate::{
    app::AppState,
    auth::{session_user, CurrentUser},
    cart,
    core::{order::order_total, product as products, user as users},
    entity::product,
    error::{AppError, Result},
};

use super::IdForm;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(store_page))
        .route("/index", get(store_page))
        .route("/cart", get(shopping_cart))
        .route("/add_to_cart", post(add_to_cart))
        .route("/remove_from_cart", post(remove_from_cart))
        .route("/example_products", get(example_products))
}

#[derive(Debug, Serialize)]
pub struct StoreItem {
    #[serde(flatten)]
    pub product: product::Model,
    pub in_cart: bool,
}

#[derive(Debug, Serialize)]
pub struct StorePage {
    pub user: Option<String>,
    pub products: Vec<StoreItem>,
    pub cart: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct CartPage {
    pub products: Vec<product::Model>,
    pub total: i64,
}

async fn store_page(State(state): State<AppState>, session: Session) -> Result<Json<StorePage>> {
    let cart = cart::ensure(&session).await?;
    let user = session_user(&session, &state.db).await?.map(|u| u.email);
    let products = products::list_active(&state.db)
        .await?
        .into_iter()
        .map(|product| StoreItem {
            in_cart: cart.contains(&product.id),
            product,
        })
        .collect();

    Ok(Json(StorePage {
        user,
        products,
        cart,
    }))
}

async fn shopping_cart(State(state): State<AppState>, session: Session) -> Result<Json<CartPage>> {
    let ids = cart::items(&session).await?;
    let products = products::find_many(&state.db, &ids).await?;
    let total = order_total(&products);
    Ok(Json(CartPage { products, total }))
}

async fn add_to_cart(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    session: Session,
    Form(form): Form<IdForm>,
) -> Result<Json<Value>> {
    match products::get_product(&state.db, form.id).await? {
        Some(product) if product.active => {
            cart::add(&session, product.id).await?;
            Ok(Json(json!({ "success": true })))
        }
        _ => Err(AppError::NotFound(format!("product {} not found", form.id))),
    }
}

async fn remove_from_cart(
    CurrentUser(_user): CurrentUser,
    session: Session,
    Form(form): Form<IdForm>,
) -> Result<Json<Value>> {
    cart::remove(&session, form.id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Seeds the demo catalogue. Hidden from everyone but admins.
async fn example_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Redirect> {
    if !users::is_admin(&state.db, &user).await? {
        return Err(AppError::NotFound("page not found".to_string()));
    }
    let created = products::generate_example_products(&state.db).await?;
    info!(user_id = user.id, count = created.len(), "Example products generated");
    Ok(Redirect::to("/"))
}
