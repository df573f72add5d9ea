//! Database setup at startup.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::{
    core::user as users,
    error::Result,
    migration::Migrator,
};

pub const DEMO_USER: &str = "someone@example.com";
pub const DEMO_ADMIN: &str = "admin@example.com";
pub const DEMO_PASSWORD: &str = "password";

/// Connects to `database_url` and applies pending migrations.
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(database_url);
    opt.connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let db = Database::connect(opt).await?;
    Migrator::up(&db, None).await?;
    info!("Database migrations applied");
    Ok(db)
}

/// Creates the `admin` role and the two demo accounts, granting the role to
/// the admin account. Existing rows are left as they are.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<()> {
    users::find_or_create_role(db, users::ADMIN_ROLE, Some("Administrator")).await?;
    for email in [DEMO_USER, DEMO_ADMIN] {
        if users::find_by_email(db, email).await?.is_none() {
            users::create_user(db, email, DEMO_PASSWORD).await?;
        }
    }
    users::add_role_to_user(db, DEMO_ADMIN, users::ADMIN_ROLE).await?;
    info!("Demo accounts ready");
    Ok(())
}
