//! Payment processor webhooks.
//!
//! The webhook is unauthenticated, so its payload is only used to find the
//! order. Whether the charge was paid is always asked of the processor.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::{app::AppState, core::order as orders, entity::order, error::Result};

pub fn router() -> Router<AppState> {
    Router::new().route("/confirm_payment", post(confirm_payment))
}

#[derive(Debug, Deserialize)]
pub struct ChargeRef {
    pub id: String,
}

/// Body sent by the processor when a charge changes.
#[derive(Debug, Deserialize)]
pub struct ChargeEvent {
    pub data: ChargeRef,
}

type WebhookResponse = (StatusCode, Json<Value>);

fn outcome(success: bool) -> WebhookResponse {
    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(json!({ "success": success })))
}

/// Finds the order for the event and re-checks it. Returns the order when
/// the processor reports it paid.
#[instrument(skip_all)]
async fn confirm(
    state: &AppState,
    payload: std::result::Result<Json<ChargeEvent>, JsonRejection>,
) -> Result<Option<order::Model>> {
    let Json(event) = match payload {
        Ok(event) => event,
        Err(rejection) => {
            debug!(error = %rejection, "Malformed webhook payload");
            return Ok(None);
        }
    };
    let Some(mut order) = orders::find_by_charge_id(&state.db, &event.data.id).await? else {
        debug!(charge_id = %event.data.id, "Webhook for unknown charge");
        return Ok(None);
    };

    order.paid = orders::check_paid(&state.db, state.payments.as_ref(), &order).await?;
    if order.paid {
        info!(order_id = order.id, "Payment confirmed by webhook");
        Ok(Some(order))
    } else {
        Ok(None)
    }
}

fn respond(result: Result<Option<order::Model>>) -> (WebhookResponse, Option<i32>) {
    match result {
        Ok(Some(order)) => (outcome(true), Some(order.id)),
        Ok(None) => (outcome(false), None),
        Err(e) => {
            warn!(error = %e, "Webhook payment check failed");
            (outcome(false), None)
        }
    }
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChargeEvent>, JsonRejection>,
) -> WebhookResponse {
    respond(confirm(&state, payload).await).0
}

/// Webhook variant that also notifies sockets subscribed to the order.
pub async fn confirm_payment_socket(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChargeEvent>, JsonRejection>,
) -> WebhookResponse {
    let (response, paid_order) = respond(confirm(&state, payload).await);
    if let Some(order_id) = paid_order {
        let listeners = state.events.publish(order_id);
        debug!(order_id, listeners, "Published payment confirmation");
    }
    response
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        core::order as orders,
        entity::order,
        error::Result,
        test_utils::{create_test_product, create_test_user, TestApp},
    };

    async fn place_order(app: &TestApp) -> Result<order::Model> {
        let user = create_test_user(&app.db, "someone@example.com").await?;
        let shirt = create_test_product(&app.db, "Shirt", 420).await?;
        orders::create_order(&app.db, app.payments.as_ref(), &user, &[shirt]).await
    }

    #[tokio::test]
    async fn test_webhook_confirms_paid_charge() -> Result<()> {
        let app = TestApp::new().await?;
        let order = place_order(&app).await?;
        let charge_id = order.charge_id.clone().unwrap();
        let body = json!({ "data": { "id": charge_id } });

        let response = app.server.post("/confirm_payment").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "success": false }));

        app.payments.mark_paid(&charge_id);
        let response = app.server.post("/confirm_payment").json(&body).await;
        response.assert_status_ok();
        response.assert_json(&json!({ "success": true }));
        assert!(orders::get_order(&app.db, order.id).await?.unwrap().paid);
        Ok(())
    }

    #[tokio::test]
    async fn test_webhook_rejects_unknown_or_malformed() -> Result<()> {
        let app = TestApp::new().await?;

        app.server
            .post("/confirm_payment")
            .json(&json!({ "data": { "id": "ch_unknown" } }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        app.server
            .post("/confirm_payment")
            .json(&json!({ "charge": 1 }))
            .await
            .assert_json(&json!({ "success": false }));
        Ok(())
    }

    #[tokio::test]
    async fn test_socket_webhook_publishes_event() -> Result<()> {
        let app = TestApp::socketed().await?;
        let order = place_order(&app).await?;
        let charge_id = order.charge_id.clone().unwrap();
        let mut rx = app.state.events.subscribe();

        app.payments.mark_paid(&charge_id);
        app.server
            .post("/confirm_payment_socket")
            .json(&json!({ "data": { "id": charge_id } }))
            .await
            .assert_status_ok();

        assert_eq!(rx.recv().await.unwrap().order_id, order.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_socket_routes_only_on_socketed_app() -> Result<()> {
        let app = TestApp::new().await?;
        app.server
            .post("/confirm_payment_socket")
            .json(&json!({ "data": { "id": "x" } }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        Ok(())
    }
}
