use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;

use crate::{
    app::AppState,
    auth::CurrentUser,
    core::blog::{self, PostWithComments},
    entity::post,
    error::{AppError, Result},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/{post_id}", get(show_post))
        .route("/posts/{post_id}/comments", post(add_comment))
}

#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub body: String,
}

async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<post::Model>>> {
    Ok(Json(blog::list_posts(&state.db).await?))
}

async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PostForm>,
) -> Result<Redirect> {
    let post = blog::create_post(&state.db, &user, &form.title, &form.body).await?;
    Ok(Redirect::to(&format!("/posts/{}", post.id)))
}

async fn show_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
) -> Result<Json<PostWithComments>> {
    blog::get_post(&state.db, post_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("post {post_id} not found")))
}

async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<i32>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect> {
    blog::add_comment(&state.db, &user, post_id, &form.body).await?;
    Ok(Redirect::to(&format!("/posts/{post_id}")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::Value;

    use crate::{
        error::Result,
        test_utils::{create_test_user, TestApp},
    };

    #[tokio::test]
    async fn test_post_and_comment_flow() -> Result<()> {
        let app = TestApp::new().await?;
        create_test_user(&app.db, "writer@example.com").await?;

        app.server
            .post("/posts")
            .form(&[("title", "Hello"), ("body", "First post")])
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        app.login("writer@example.com").await;
        let response = app
            .server
            .post("/posts")
            .form(&[("title", "Hello"), ("body", "First post")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        let location = response.header("location").to_str().unwrap().to_string();

        app.server
            .post(&format!("{location}/comments"))
            .form(&[("body", "Self-reply")])
            .await
            .assert_status(StatusCode::SEE_OTHER);

        let post: Value = app.server.get(&location).await.json();
        assert_eq!(post["title"], "Hello");
        assert_eq!(post["comments"][0]["user_email"], "writer@example.com");

        let posts: Value = app.server.get("/posts").await.json();
        assert_eq!(posts.as_array().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_post_is_not_found() -> Result<()> {
        let app = TestApp::new().await?;
        app.server.get("/posts/7").await.assert_status(StatusCode::NOT_FOUND);
        Ok(())
    }
}
