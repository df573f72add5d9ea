//! Client for the Strike Lightning charge API.
//!
//! The store only needs three calls: create a charge for an order total,
//! fetch a single charge to see whether it was paid, and list charges for
//! the operator. [`PaymentProcessor`] is the seam the web layer talks to so
//! it can run against [`StrikeClient`] in production and an in-memory
//! processor in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Endpoint of the Strike development API.
pub const DEFAULT_ENDPOINT: &str = "https://api.dev.strike.acinq.co/api/v1";

/// Currency used for every store charge.
pub const DEFAULT_CURRENCY: &str = "btc";

/// Description used when the caller has nothing better.
pub const DEFAULT_DESCRIPTION: &str = "A Lightning Payment";

/// Errors returned by the payment processor client.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("request to payment processor failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment processor returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("charge {0} not found")]
    ChargeNotFound(String),
}

/// A charge as returned by the processor.
///
/// Only the fields the store reads are required; everything else the API
/// sends is optional so schema additions on their side do not break us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_satoshi: Option<i64>,
    pub currency: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub payment_request: Option<String>,
    #[serde(default)]
    pub payment_hash: Option<String>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub updated: Option<i64>,
}

/// Parameters for a new charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCharge {
    pub amount: i64,
    pub currency: String,
    pub description: String,
}

impl NewCharge {
    /// A BTC charge for `amount` satoshi with the default description.
    pub fn btc(amount: i64) -> Self {
        Self {
            amount,
            currency: DEFAULT_CURRENCY.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Operations the store needs from a Lightning payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn create_charge(&self, charge: &NewCharge) -> Result<Charge, PaymentError>;

    async fn get_charge(&self, charge_id: &str) -> Result<Charge, PaymentError>;

    async fn list_charges(&self, page: u32, size: u32) -> Result<Vec<Charge>, PaymentError>;
}

/// HTTP client for the Strike API.
///
/// Authenticates with HTTP basic auth, using the API key as the user name and
/// an empty password.
#[derive(Debug, Clone)]
pub struct StrikeClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

impl StrikeClient {
    /// Creates a client against [`DEFAULT_ENDPOINT`].
    pub fn new(api_key: impl Into<String>) -> Result<Self, PaymentError> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Points the client at another API root, e.g. production or a mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.api_key, Some(""))
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, PaymentError> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PaymentProcessor for StrikeClient {
    #[instrument(skip(self), fields(amount = charge.amount))]
    async fn create_charge(&self, charge: &NewCharge) -> Result<Charge, PaymentError> {
        let request = self.http.post(self.url("/charges")).form(charge);
        let created: Charge = self.send(request).await?;
        debug!(charge_id = %created.id, "Created charge");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn get_charge(&self, charge_id: &str) -> Result<Charge, PaymentError> {
        let path = format!("/charges/{}", urlencoding::encode(charge_id));
        let request = self.http.get(self.url(&path));
        match self.send(request).await {
            Err(PaymentError::Status { status: 404, .. }) => {
                Err(PaymentError::ChargeNotFound(charge_id.to_string()))
            }
            other => other,
        }
    }

    #[instrument(skip(self))]
    async fn list_charges(&self, page: u32, size: u32) -> Result<Vec<Charge>, PaymentError> {
        let path = format!("/charges?page={page}&size={size}");
        let request = self.http.get(self.url(&path));
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_charge_defaults() {
        let charge = NewCharge::btc(420);
        assert_eq!(charge.amount, 420);
        assert_eq!(charge.currency, "btc");
        assert_eq!(charge.description, "A Lightning Payment");

        let charge = charge.with_description("Order #1");
        assert_eq!(charge.description, "Order #1");
    }

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let client = StrikeClient::new("sk_test")
            .unwrap()
            .with_endpoint("http://localhost:9000/api/v1/");
        assert_eq!(client.endpoint(), "http://localhost:9000/api/v1");
        assert_eq!(client.url("/charges"), "http://localhost:9000/api/v1/charges");
    }

    #[test]
    fn test_charge_tolerates_missing_optional_fields() {
        let charge: Charge = serde_json::from_str(
            r#"{"id": "ch_1", "amount": 900, "currency": "btc", "extra": "ignored"}"#,
        )
        .unwrap();
        assert_eq!(charge.id, "ch_1");
        assert!(!charge.paid);
        assert!(charge.payment_request.is_none());
    }
}
