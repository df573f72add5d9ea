//! Live payment notifications over websockets.
//!
//! A client opens `/ws` from the order page and subscribes to its order:
//!
//! ```json
//! {"event": "subscribe", "order": 42}
//! ```
//!
//! When the socket webhook confirms the charge, every socket subscribed to
//! that order receives `{"event": "confirm_payment", "order": 42, "paid": true}`.

use std::collections::HashSet;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::app::AppState;

/// Payment confirmed for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentConfirmed {
    pub order_id: i32,
}

/// Broadcast channel fanning payment confirmations out to open sockets.
///
/// Sockets that fall behind receive `RecvError::Lagged` and skip ahead.
#[derive(Debug, Clone)]
pub struct PaymentEvents {
    tx: broadcast::Sender<PaymentConfirmed>,
}

impl PaymentEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a confirmation. Returns the number of sockets listening; the
    /// event is dropped when there are none.
    pub fn publish(&self, order_id: i32) -> usize {
        self.tx.send(PaymentConfirmed { order_id }).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PaymentConfirmed> {
        self.tx.subscribe()
    }
}

impl Default for PaymentEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe { order: i32 },
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ServerMessage {
    ConfirmPayment { order: i32, paid: bool },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.events.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, events))
}

async fn handle_socket(mut socket: WebSocket, events: PaymentEvents) {
    let mut rx = events.subscribe();
    let mut orders = HashSet::new();

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(text.as_str()) {
                        Ok(ClientMessage::Subscribe { order }) => {
                            debug!(order_id = order, "Socket subscribed");
                            orders.insert(order);
                        }
                        Err(e) => debug!(error = %e, "Ignoring socket message"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "Socket error");
                    break;
                }
            },
            event = rx.recv() => match event {
                Ok(PaymentConfirmed { order_id }) if orders.contains(&order_id) => {
                    let message = ServerMessage::ConfirmPayment { order: order_id, paid: true };
                    let Ok(text) = serde_json::to_string(&message) else {
                        continue;
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Socket lagged behind payment events"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}
