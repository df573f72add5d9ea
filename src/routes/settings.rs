use axum::{
    extract::State,
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{
    app::AppState,
    auth::{logout_user, CurrentUser},
    core::user as users,
    error::Result,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/settings", get(user_settings))
        .route("/settings/password", post(change_password))
        .route("/settings/delete_account", post(delete_account))
}

#[derive(Debug, Serialize)]
pub struct SettingsPage {
    pub email: String,
    pub roles: Vec<String>,
    pub orders: Vec<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm: String,
}

async fn user_settings(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SettingsPage>> {
    let roles = users::roles_for_user(&state.db, &user)
        .await?
        .into_iter()
        .map(|r| r.name)
        .collect();
    let orders = users::order_ids_for_user(&state.db, &user).await?;
    Ok(Json(SettingsPage {
        email: user.email,
        roles,
        orders,
        created_at: user.created_at,
    }))
}

async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PasswordForm>,
) -> Result<Redirect> {
    users::change_password(
        &state.db,
        &user,
        &form.old_password,
        &form.new_password,
        &form.confirm,
    )
    .await?;
    Ok(Redirect::to("/"))
}

async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    session: Session,
    Form(form): Form<DeleteAccountForm>,
) -> Result<Redirect> {
    users::delete_account(&state.db, &user, &form.password, &form.confirm).await?;
    logout_user(&session).await?;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;

    use crate::{
        auth::authenticate,
        core::user as users,
        error::Result,
        test_utils::{create_test_user, TestApp},
    };

    #[tokio::test]
    async fn test_settings_requires_login() -> Result<()> {
        let app = TestApp::new().await?;
        app.server.get("/settings").await.assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_settings_summary() -> Result<()> {
        let app = TestApp::new().await?;
        create_test_user(&app.db, "someone@example.com").await?;
        app.login("someone@example.com").await;

        let page: Value = app.server.get("/settings").await.json();
        assert_eq!(page["email"], "someone@example.com");
        assert_eq!(page["roles"], serde_json::json!([]));
        assert_eq!(page["orders"], serde_json::json!([]));
        assert!(page.get("password").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_change_password() -> Result<()> {
        let app = TestApp::new().await?;
        create_test_user(&app.db, "someone@example.com").await?;
        app.login("someone@example.com").await;

        app.server
            .post("/settings/password")
            .form(&[
                ("old_password", "password"),
                ("new_password", "hunter2"),
                ("confirm", "hunter3"),
            ])
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.server
            .post("/settings/password")
            .form(&[
                ("old_password", "password"),
                ("new_password", "hunter2"),
                ("confirm", "hunter2"),
            ])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        assert!(authenticate(&app.db, "someone@example.com", "hunter2").await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_account_logs_out() -> Result<()> {
        let app = TestApp::new().await?;
        create_test_user(&app.db, "someone@example.com").await?;
        app.login("someone@example.com").await;

        app.server
            .post("/settings/delete_account")
            .form(&[("password", "password"), ("confirm", "password")])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        assert!(users::find_by_email(&app.db, "someone@example.com").await?.is_none());
        app.server.get("/settings").await.assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
