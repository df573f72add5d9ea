//! Blog posts and comments.

use chrono::Utc;
use sea_orm::{prelude::*, QueryOrder, Set};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    entity::{comment, post, user, Comment, Post},
    error::{AppError, Result},
};

pub const TITLE_MAX_LEN: usize = 140;
pub const BODY_MAX_LEN: usize = 1000;

/// A post with its comments, oldest comment first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostWithComments {
    #[serde(flatten)]
    pub post: post::Model,
    pub comments: Vec<comment::Model>,
}

pub(crate) fn check_length(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::Validation(format!("{field} is required.")));
    }
    if len > max {
        return Err(AppError::Validation(format!(
            "{field} must be at most {max} characters."
        )));
    }
    Ok(())
}

#[instrument(skip_all, fields(user_id = author.id))]
pub async fn create_post(
    db: &DatabaseConnection,
    author: &user::Model,
    title: &str,
    body: &str,
) -> Result<post::Model> {
    check_length("Title", title, TITLE_MAX_LEN)?;
    check_length("Body", body, BODY_MAX_LEN)?;

    let post = post::ActiveModel {
        title: Set(title.trim().to_string()),
        body: Set(body.trim().to_string()),
        timestamp: Set(Utc::now()),
        user_id: Set(Some(author.id)),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(post_id = post.id, "Created post");
    Ok(post)
}

/// All posts, newest first.
pub async fn list_posts(db: &DatabaseConnection) -> Result<Vec<post::Model>> {
    Post::find()
        .order_by_desc(post::Column::Timestamp)
        .order_by_desc(post::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_post(db: &DatabaseConnection, post_id: i32) -> Result<Option<PostWithComments>> {
    let Some(post) = Post::find_by_id(post_id).one(db).await? else {
        return Ok(None);
    };
    let comments = comments_for_post(db, post.id).await?;
    Ok(Some(PostWithComments { post, comments }))
}

pub async fn comments_for_post(db: &DatabaseConnection, post_id: i32) -> Result<Vec<comment::Model>> {
    Comment::find()
        .filter(comment::Column::PostId.eq(post_id))
        .order_by_asc(comment::Column::Timestamp)
        .order_by_asc(comment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a comment by `author` to a post.
///
/// # Errors
/// `AppError::NotFound` for an unknown post, `AppError::Validation` for an
/// empty or overlong body.
#[instrument(skip_all, fields(user_id = author.id, post_id))]
pub async fn add_comment(
    db: &DatabaseConnection,
    author: &user::Model,
    post_id: i32,
    body: &str,
) -> Result<comment::Model> {
    check_length("Comment", body, BODY_MAX_LEN)?;
    if Post::find_by_id(post_id).one(db).await?.is_none() {
        return Err(AppError::NotFound(format!("post {post_id} not found")));
    }

    let comment = comment::ActiveModel {
        body: Set(body.trim().to_string()),
        timestamp: Set(Utc::now()),
        user_id: Set(Some(author.id)),
        user_email: Set(Some(author.email.clone())),
        post_id: Set(post_id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_user, setup_test_db};

    #[tokio::test]
    async fn test_posts_are_listed_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let author = create_test_user(&db, "writer@example.com").await?;

        let first = create_post(&db, &author, "First", "Hello").await?;
        let second = create_post(&db, &author, "Second", "Again").await?;

        let ids: Vec<i32> = list_posts(&db).await?.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_post_length_limits() -> Result<()> {
        let db = setup_test_db().await?;
        let author = create_test_user(&db, "writer@example.com").await?;

        let long_title = "x".repeat(TITLE_MAX_LEN + 1);
        assert!(matches!(
            create_post(&db, &author, &long_title, "body").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            create_post(&db, &author, "Title", "   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(create_post(&db, &author, &"x".repeat(TITLE_MAX_LEN), "ok").await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_comments_carry_author_email() -> Result<()> {
        let db = setup_test_db().await?;
        let author = create_test_user(&db, "writer@example.com").await?;
        let reader = create_test_user(&db, "reader@example.com").await?;
        let post = create_post(&db, &author, "Title", "Body").await?;

        add_comment(&db, &reader, post.id, "Nice post").await?;
        add_comment(&db, &author, post.id, "Thanks").await?;

        let with_comments = get_post(&db, post.id).await?.unwrap();
        assert_eq!(with_comments.comments.len(), 2);
        assert_eq!(
            with_comments.comments[0].user_email.as_deref(),
            Some("reader@example.com")
        );
        assert_eq!(with_comments.comments[1].body, "Thanks");
        Ok(())
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() -> Result<()> {
        let db = setup_test_db().await?;
        let reader = create_test_user(&db, "reader@example.com").await?;

        let result = add_comment(&db, &reader, 42, "Hello?").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(get_post(&db, 42).await?.is_none());
        Ok(())
    }
}
