use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use tower_sessions::Session;
use tracing::error;

use crate::{
    app::AppState,
    auth::CurrentUser,
    cart,
    core::{
        order::{self as orders, OrderDetails},
        product as products,
        user as users,
    },
    entity::{order, user},
    error::{AppError, Result},
};

use super::IdForm;

pub const CHECKOUT_FAILED: &str =
    "Error: Could not create order. Please contact store administration.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", get(checkout))
        .route("/order/{order_id}", get(show_order))
        .route("/check_payment", post(check_payment))
}

/// Loads an order the user may look at. Other people's orders are reported
/// as missing so their ids cannot be probed.
async fn visible_order(
    state: &AppState,
    user: &user::Model,
    order_id: i32,
    allow_admin: bool,
) -> Result<order::Model> {
    let not_found = || AppError::NotFound(format!("order {order_id} not found"));
    let order = orders::get_order(&state.db, order_id)
        .await?
        .ok_or_else(not_found)?;
    if order.user_id == Some(user.id) {
        return Ok(order);
    }
    if allow_admin && users::is_admin(&state.db, user).await? {
        return Ok(order);
    }
    Err(not_found())
}

async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    session: Session,
) -> Result<Response> {
    let ids = cart::items(&session).await?;
    let products: Vec<_> = products::find_many(&state.db, &ids)
        .await?
        .into_iter()
        .filter(|p| p.active)
        .collect();

    match orders::create_order(&state.db, state.payments.as_ref(), &user, &products).await {
        Ok(order) => {
            cart::clear(&session).await?;
            Ok(Redirect::to(&format!("/order/{}", order.id)).into_response())
        }
        Err(AppError::Payment(e)) => {
            error!(user_id = user.id, error = %e, "Checkout failed");
            Ok((StatusCode::BAD_GATEWAY, CHECKOUT_FAILED).into_response())
        }
        Err(e) => Err(e),
    }
}

/// Order page for its owner. Unpaid orders are re-checked against the
/// processor; a processor outage leaves the order shown as unpaid.
async fn show_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderDetails>> {
    let mut order = visible_order(&state, &user, order_id, false).await?;
    if !order.paid {
        match orders::check_paid(&state.db, state.payments.as_ref(), &order).await {
            Ok(paid) => order.paid = paid,
            Err(AppError::Payment(e)) => {
                tracing::warn!(order_id, error = %e, "Could not refresh payment status");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(Json(orders::details(&state.db, order).await?))
}

async fn check_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<IdForm>,
) -> Result<Json<Value>> {
    let order = visible_order(&state, &user, form.id, true).await?;
    let paid = orders::check_paid(&state.db, state.payments.as_ref(), &order).await?;
    Ok(Json(json!({ "paid": paid })))
}
