use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{
    app::AppState,
    auth::{authenticate, login_user, logout_user, session_user},
    core::user as users,
    error::{AppError, Result},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout).post(logout))
        .route("/register", post(register))
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub user: Option<String>,
    pub next: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm: String,
}

/// Only local paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<NextQuery>,
) -> Result<Json<LoginPage>> {
    let user = session_user(&session, &state.db).await?.map(|u| u.email);
    Ok(Json(LoginPage {
        user,
        next: safe_next(query.next.as_deref()).to_string(),
    }))
}

async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let user = authenticate(&state.db, &form.email, &form.password).await?;
    login_user(&session, &user).await?;
    Ok(Redirect::to(safe_next(form.next.as_deref())))
}

async fn logout(session: Session) -> Result<Redirect> {
    logout_user(&session).await?;
    Ok(Redirect::to("/"))
}

async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect> {
    if form.password != form.confirm {
        return Err(AppError::Validation("Passwords must match.".to_string()));
    }
    let user = users::create_user(&state.db, &form.email, &form.password).await?;
    login_user(&session, &user).await?;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;

    use super::safe_next;
    use crate::{
        error::Result,
        test_utils::{create_test_user, TestApp},
    };

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/admin/products")), "/admin/products");
        assert_eq!(safe_next(Some("//evil.example.com")), "/");
        assert_eq!(safe_next(Some("https://evil.example.com")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[tokio::test]
    async fn test_login_redirects_to_next() -> Result<()> {
        let app = TestApp::new().await?;
        create_test_user(&app.db, "someone@example.com").await?;

        let response = app
            .server
            .post("/login")
            .form(&[
                ("email", "someone@example.com"),
                ("password", "password"),
                ("next", "/settings"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("location"), "/settings");

        let page: Value = app.server.get("/login").await.json();
        assert_eq!(page["user"], "someone@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_credentials_are_rejected() -> Result<()> {
        let app = TestApp::new().await?;
        create_test_user(&app.db, "someone@example.com").await?;

        app.server
            .post("/login")
            .form(&[("email", "someone@example.com"), ("password", "wrong")])
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        app.server.get("/settings").await.assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_logout_forgets_user() -> Result<()> {
        let app = TestApp::new().await?;
        create_test_user(&app.db, "someone@example.com").await?;
        app.login("someone@example.com").await;
        app.server.get("/settings").await.assert_status_ok();

        app.server
            .post("/logout")
            .await
            .assert_status(StatusCode::SEE_OTHER);
        app.server.get("/settings").await.assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_logs_in() -> Result<()> {
        let app = TestApp::new().await?;

        app.server
            .post("/register")
            .form(&[
                ("email", "new@example.com"),
                ("password", "secret"),
                ("confirm", "other"),
            ])
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.server
            .post("/register")
            .form(&[
                ("email", "new@example.com"),
                ("password", "secret"),
                ("confirm", "secret"),
            ])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let settings: Value = app.server.get("/settings").await.json();
        assert_eq!(settings["email"], "new@example.com");

        app.server
            .post("/register")
            .form(&[
                ("email", "new@example.com"),
                ("password", "secret"),
                ("confirm", "secret"),
            ])
            .await
            .assert_status(StatusCode::CONFLICT);
        Ok(())
    }
}
