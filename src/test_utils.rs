//! Shared fixtures for the unit and HTTP tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum_test::{TestServer, TestServerConfig, Transport};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::{
    app::{create_app, create_socketed_app, AppState},
    config::AppConfig,
    core::{product as products, user as users},
    entity::{product, user},
    error::Result,
    migration::Migrator,
    session_store::SeaOrmStore,
    strike::{Charge, NewCharge, PaymentError, PaymentProcessor},
};

/// A migrated in-memory SQLite database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// A user whose password is `password`.
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    users::create_user(db, email, "password").await
}

pub async fn create_test_admin(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    let user = create_test_user(db, email).await?;
    users::find_or_create_role(db, users::ADMIN_ROLE, None).await?;
    users::add_role_to_user(db, email, users::ADMIN_ROLE).await?;
    Ok(user)
}

pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    price: i64,
) -> Result<product::Model> {
    products::create_product(db, name, &format!("{name} for testing"), price).await
}

/// In-memory payment processor.
///
/// Charges are unpaid until [`FakePayments::mark_paid`] is called. A failing
/// processor rejects every call with HTTP 503.
#[derive(Debug, Default)]
pub struct FakePayments {
    charges: Mutex<HashMap<String, Charge>>,
    created: AtomicUsize,
    failing: bool,
}

impl FakePayments {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn charge(&self, charge_id: &str) -> Option<Charge> {
        self.charges.lock().unwrap().get(charge_id).cloned()
    }

    pub fn charge_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn mark_paid(&self, charge_id: &str) {
        if let Some(charge) = self.charges.lock().unwrap().get_mut(charge_id) {
            charge.paid = true;
        }
    }

    fn unavailable() -> PaymentError {
        PaymentError::Status {
            status: 503,
            body: "service unavailable".to_string(),
        }
    }
}

#[async_trait]
impl PaymentProcessor for FakePayments {
    async fn create_charge(&self, request: &NewCharge) -> std::result::Result<Charge, PaymentError> {
        if self.failing {
            return Err(Self::unavailable());
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        let charge = Charge {
            id: format!("ch_test_{n}"),
            amount: request.amount,
            amount_satoshi: Some(request.amount),
            currency: request.currency.clone(),
            description: Some(request.description.clone()),
            payment_request: Some(format!("lnbcrt{}n1ptest{n}", request.amount)),
            payment_hash: Some(format!("{n:064x}")),
            paid: false,
            created: None,
            updated: None,
        };
        self.charges
            .lock()
            .unwrap()
            .insert(charge.id.clone(), charge.clone());
        Ok(charge)
    }

    async fn get_charge(&self, charge_id: &str) -> std::result::Result<Charge, PaymentError> {
        if self.failing {
            return Err(Self::unavailable());
        }
        self.charge(charge_id)
            .ok_or_else(|| PaymentError::ChargeNotFound(charge_id.to_string()))
    }

    async fn list_charges(&self, page: u32, size: u32) -> std::result::Result<Vec<Charge>, PaymentError> {
        if self.failing {
            return Err(Self::unavailable());
        }
        let mut charges: Vec<Charge> = self.charges.lock().unwrap().values().cloned().collect();
        charges.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(charges
            .into_iter()
            .skip((page * size) as usize)
            .take(size as usize)
            .collect())
    }
}

/// Configuration suitable for tests: no seeding, images in a temp dir.
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: ([127, 0, 0, 1], 0).into(),
        strike_api_key: "sk_test".to_string(),
        strike_endpoint: crate::strike::DEFAULT_ENDPOINT.to_string(),
        session_secure: false,
        session_expiry_days: 1,
        seed_demo_data: false,
        image_dir: std::env::temp_dir().join(format!("kaminari-merch-{}", uuid::Uuid::new_v4())),
        enable_sockets: true,
    }
}

/// Everything an HTTP test needs: the running server, its database and the
/// fake processor behind it.
pub struct TestApp {
    pub server: TestServer,
    pub db: DatabaseConnection,
    pub payments: Arc<FakePayments>,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::build(Arc::new(FakePayments::default()), false).await
    }

    pub async fn with_payments(payments: FakePayments) -> Result<Self> {
        Self::build(Arc::new(payments), false).await
    }

    pub async fn socketed() -> Result<Self> {
        Self::build(Arc::new(FakePayments::default()), true).await
    }

    async fn build(payments: Arc<FakePayments>, sockets: bool) -> Result<Self> {
        let db = setup_test_db().await?;
        let state = AppState::new(db.clone(), payments.clone(), test_config());
        let store = SeaOrmStore::new(db.clone());
        let router = if sockets {
            create_socketed_app(state.clone(), store)
        } else {
            create_app(state.clone(), store)
        };
        // Websockets need a real socket rather than the mock transport.
        let config = TestServerConfig {
            save_cookies: true,
            transport: sockets.then_some(Transport::HttpRandomPort),
            ..TestServerConfig::default()
        };
        let server = TestServer::new_with_config(router, config).unwrap();
        Ok(Self {
            server,
            db,
            payments,
            state,
        })
    }

    /// Logs in through the login route so the session cookie is kept.
    pub async fn login(&self, email: &str) {
        self.server
            .post("/login")
            .form(&[("email", email), ("password", "password")])
            .await
            .assert_status(axum::http::StatusCode::SEE_OTHER);
    }
}
