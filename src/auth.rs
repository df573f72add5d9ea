//! Password hashing, login state and the extractors guarding routes.
//!
//! The logged-in user's id lives in the session under [`USER_ID_KEY`].
//! Handlers ask for [`CurrentUser`] when a login is required and for
//! [`AdminUser`] on admin pages.

use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::DatabaseConnection;
use tower_sessions::Session;
use tracing::{debug, info, instrument};

use crate::{
    app::AppState,
    core::user as users,
    entity::user,
    error::{AppError, Result},
};

pub const USER_ID_KEY: &str = "user_id";

// bcrypt's minimum cost keeps the test suite fast
const BCRYPT_COST: u32 = if cfg!(test) { 4 } else { bcrypt::DEFAULT_COST };

pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

/// Checks `password` against a stored bcrypt hash. A malformed hash counts as
/// a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Looks up the account for a login attempt.
///
/// # Errors
/// `AppError::Authentication` for an unknown email, a wrong password or a
/// deactivated account.
#[instrument(skip(db, password))]
pub async fn authenticate(db: &DatabaseConnection, email: &str, password: &str) -> Result<user::Model> {
    let invalid = || AppError::Authentication("Invalid email or password.".to_string());

    let user = users::find_by_email(db, email).await?.ok_or_else(invalid)?;
    if !verify_password(password, &user.password) {
        return Err(invalid());
    }
    if !user.active {
        return Err(AppError::Authentication("Account is disabled.".to_string()));
    }
    Ok(user)
}

/// Marks the session as belonging to `user`, issuing a fresh session id.
pub async fn login_user(session: &Session, user: &user::Model) -> Result<()> {
    session.cycle_id().await?;
    session.insert(USER_ID_KEY, user.id).await?;
    info!(user_id = user.id, "User logged in");
    Ok(())
}

/// Drops everything in the session, cart included.
pub async fn logout_user(session: &Session) -> Result<()> {
    session.flush().await?;
    Ok(())
}

/// The logged-in, active user for this session, if any.
pub async fn session_user(session: &Session, db: &DatabaseConnection) -> Result<Option<user::Model>> {
    let Some(user_id) = session.get::<i32>(USER_ID_KEY).await? else {
        return Ok(None);
    };
    match users::get_user(db, user_id).await? {
        Some(user) if user.active => Ok(Some(user)),
        _ => {
            debug!(user_id, "Session refers to a missing or inactive user");
            Ok(None)
        }
    }
}

async fn session_from_parts(parts: &mut Parts, state: &AppState) -> Result<Session> {
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| AppError::Internal(msg.to_string()))
}

/// Extractor for routes that need a logged-in user; rejects with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let session = session_from_parts(parts, state).await?;
        session_user(&session, &state.db)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Please log in to access this page.".to_string()))
    }
}

/// Extractor for admin pages.
///
/// Anonymous visitors are redirected to the login page and come back here
/// afterwards; logged-in users without the admin role get a 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub user::Model);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let session = session_from_parts(parts, state).await?;
        let Some(user) = session_user(&session, &state.db).await? else {
            let next = parts
                .uri
                .path_and_query()
                .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);
            return Err(AppError::LoginRequired(next));
        };
        if !users::is_admin(&state.db, &user).await? {
            return Err(AppError::Authorization(
                "Administrator access required.".to_string(),
            ));
        }
        Ok(Self(user))
    }
}
