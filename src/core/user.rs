//! Accounts and roles.
//!
//! Covers what the login layer and the settings page need: creating users,
//! looking them up, granting roles and the two self-service account actions
//! (changing the password and deleting the account).

use chrono::Utc;
use sea_orm::{prelude::*, sea_query::Expr, PaginatorTrait, QueryOrder, Set, TransactionTrait};
use tracing::{info, instrument};

use crate::{
    auth::{hash_password, verify_password},
    entity::{order, role, user, user_role, Role, User, UserRole},
    error::{AppError, Result},
};

/// Name of the role that unlocks the admin panel.
pub const ADMIN_ROLE: &str = "admin";

/// Creates an active user with a freshly hashed password.
///
/// # Errors
/// Returns `AppError::Validation` for a blank email or password and
/// `AppError::Conflict` when the email is already registered.
#[instrument(skip(db, password))]
pub async fn create_user(db: &DatabaseConnection, email: &str, password: &str) -> Result<user::Model> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("A valid email address is required.".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password is required.".to_string()));
    }
    if find_by_email(db, email).await?.is_some() {
        return Err(AppError::Conflict(format!("{email} is already registered")));
    }

    let now = Utc::now();
    let user = user::ActiveModel {
        email: Set(email.to_string()),
        password: Set(hash_password(password)?),
        active: Set(true),
        created_at: Set(now),
        modified_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(user_id = user.id, "Created user");
    Ok(user)
}

pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Email.eq(email.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

pub async fn get_user(db: &DatabaseConnection, user_id: i32) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Email)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns the role called `name`, creating it first if needed.
#[instrument(skip(db, description))]
pub async fn find_or_create_role(
    db: &DatabaseConnection,
    name: &str,
    description: Option<&str>,
) -> Result<role::Model> {
    if let Some(existing) = Role::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    let role = role::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.map(str::to_string)),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(role_id = role.id, "Created role");
    Ok(role)
}

/// Grants `role_name` to the user with `email`. Granting a role twice is a no-op.
///
/// # Errors
/// Returns `AppError::NotFound` if either the user or the role does not exist.
#[instrument(skip(db))]
pub async fn add_role_to_user(db: &DatabaseConnection, email: &str, role_name: &str) -> Result<()> {
    let user = find_by_email(db, email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {email} not found")))?;
    let role = Role::find()
        .filter(role::Column::Name.eq(role_name))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("role {role_name} not found")))?;

    if UserRole::find_by_id((user.id, role.id)).one(db).await?.is_some() {
        return Ok(());
    }

    user_role::ActiveModel {
        user_id: Set(user.id),
        role_id: Set(role.id),
    }
    .insert(db)
    .await?;
    info!(user_id = user.id, role = role_name, "Granted role");
    Ok(())
}

pub async fn roles_for_user(db: &DatabaseConnection, user: &user::Model) -> Result<Vec<role::Model>> {
    user.find_related(Role)
        .order_by_asc(role::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn has_role(db: &DatabaseConnection, user: &user::Model, role_name: &str) -> Result<bool> {
    let count = user
        .find_related(Role)
        .filter(role::Column::Name.eq(role_name))
        .count(db)
        .await?;
    Ok(count > 0)
}

pub async fn is_admin(db: &DatabaseConnection, user: &user::Model) -> Result<bool> {
    has_role(db, user, ADMIN_ROLE).await
}

/// Ids of the orders placed by `user`, oldest first.
pub async fn order_ids_for_user(db: &DatabaseConnection, user: &user::Model) -> Result<Vec<i32>> {
    let orders = user
        .find_related(crate::entity::Order)
        .order_by_asc(order::Column::Id)
        .all(db)
        .await?;
    Ok(orders.into_iter().map(|o| o.id).collect())
}

fn require_matching(password: &str, confirm: &str) -> Result<()> {
    if password.is_empty() {
        return Err(AppError::Validation("This field is required.".to_string()));
    }
    if password != confirm {
        return Err(AppError::Validation("Passwords must match.".to_string()));
    }
    Ok(())
}

/// Replaces the user's password after checking the current one.
///
/// # Errors
/// `AppError::Validation` when the new password is empty, does not match its
/// confirmation, or `old_password` is wrong.
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn change_password(
    db: &DatabaseConnection,
    user: &user::Model,
    old_password: &str,
    new_password: &str,
    confirm: &str,
) -> Result<user::Model> {
    require_matching(new_password, confirm)?;
    if !verify_password(old_password, &user.password) {
        return Err(AppError::Validation("Incorrect password.".to_string()));
    }

    let mut active: user::ActiveModel = user.clone().into();
    active.password = Set(hash_password(new_password)?);
    active.modified_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!("Password changed");
    Ok(updated)
}

/// Deletes the user's account after checking the password.
///
/// Role grants go with the account; orders, posts and comments stay but lose
/// their owner.
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn delete_account(
    db: &DatabaseConnection,
    user: &user::Model,
    password: &str,
    confirm: &str,
) -> Result<()> {
    require_matching(password, confirm)?;
    if !verify_password(password, &user.password) {
        return Err(AppError::Validation("Incorrect password.".to_string()));
    }

    // SQLite only honours ON DELETE actions with foreign keys enabled, so
    // detach dependants explicitly.
    let txn = db.begin().await?;
    UserRole::delete_many()
        .filter(user_role::Column::UserId.eq(user.id))
        .exec(&txn)
        .await?;
    crate::entity::Order::update_many()
        .col_expr(order::Column::UserId, Expr::value(Option::<i32>::None))
        .filter(order::Column::UserId.eq(user.id))
        .exec(&txn)
        .await?;
    crate::entity::Post::update_many()
        .col_expr(crate::entity::post::Column::UserId, Expr::value(Option::<i32>::None))
        .filter(crate::entity::post::Column::UserId.eq(user.id))
        .exec(&txn)
        .await?;
    crate::entity::Comment::update_many()
        .col_expr(crate::entity::comment::Column::UserId, Expr::value(Option::<i32>::None))
        .filter(crate::entity::comment::Column::UserId.eq(user.id))
        .exec(&txn)
        .await?;
    User::delete_by_id(user.id).exec(&txn).await?;
    txn.commit().await?;

    info!("Account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_user, setup_test_db};

    #[tokio::test]
    async fn test_create_and_find_user() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user(&db, " someone@example.com ", "password").await?;

        assert_eq!(user.email, "someone@example.com");
        assert!(user.active);
        assert_ne!(user.password, "password");

        let found = find_by_email(&db, "someone@example.com").await?.unwrap();
        assert_eq!(found.id, user.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_user(&db, "dup@example.com").await?;

        let err = create_user(&db, "dup@example.com", "other").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_roles_are_created_once_and_granted_once() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "admin@example.com").await?;
        assert!(!is_admin(&db, &user).await?);

        let first = find_or_create_role(&db, ADMIN_ROLE, Some("Administrator")).await?;
        let second = find_or_create_role(&db, ADMIN_ROLE, None).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(second.description.as_deref(), Some("Administrator"));

        add_role_to_user(&db, "admin@example.com", ADMIN_ROLE).await?;
        add_role_to_user(&db, "admin@example.com", ADMIN_ROLE).await?;

        assert!(is_admin(&db, &user).await?);
        assert_eq!(roles_for_user(&db, &user).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_grant_rows_resolve_user_and_role() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "admin@example.com").await?;
        let role = find_or_create_role(&db, ADMIN_ROLE, None).await?;
        add_role_to_user(&db, "admin@example.com", ADMIN_ROLE).await?;

        let grants = UserRole::find().find_also_related(User).all(&db).await?;
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].1.as_ref().map(|u| u.id), Some(user.id));

        let grants = UserRole::find().find_also_related(Role).all(&db).await?;
        assert_eq!(grants[0].1.as_ref(), Some(&role));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_role_to_unknown_user_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        find_or_create_role(&db, ADMIN_ROLE, None).await?;
        let err = add_role_to_user(&db, "ghost@example.com", ADMIN_ROLE)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_change_password_checks_old_and_confirmation() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "pw@example.com").await?;

        let mismatch = change_password(&db, &user, "password", "new", "other").await;
        assert!(matches!(mismatch, Err(AppError::Validation(msg)) if msg == "Passwords must match."));

        let wrong_old = change_password(&db, &user, "nope", "new", "new").await;
        assert!(matches!(wrong_old, Err(AppError::Validation(_))));

        let updated = change_password(&db, &user, "password", "new", "new").await?;
        assert!(verify_password("new", &updated.password));
        assert!(!verify_password("password", &updated.password));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_account_removes_user_and_grants() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "bye@example.com").await?;
        find_or_create_role(&db, ADMIN_ROLE, None).await?;
        add_role_to_user(&db, "bye@example.com", ADMIN_ROLE).await?;

        let wrong = delete_account(&db, &user, "nope", "nope").await;
        assert!(wrong.is_err());
        assert!(get_user(&db, user.id).await?.is_some());

        delete_account(&db, &user, "password", "password").await?;
        assert!(get_user(&db, user.id).await?.is_none());
        assert_eq!(UserRole::find().count(&db).await?, 0);
        Ok(())
    }
}
