//! Session entity backing the [`SeaOrmStore`](crate::session_store::SeaOrmStore).
//!
//! Each row holds one `tower-sessions` record. The cart, the logged-in user id
//! and anything else a handler puts in the session end up MessagePack-encoded
//! in the `data` column.

use sea_orm::entity::prelude::*;

/// Sea-ORM entity model representing a stored session.
///
/// # Database Schema
///
/// | Column      | Type                    | Description                       |
/// |-------------|-------------------------|-----------------------------------|
/// | id          | TEXT (Primary Key)      | Session ID                        |
/// | data        | BLOB / BYTEA            | MessagePack serialized record     |
/// | expiry_date | TIMESTAMPTZ             | Session expiration timestamp      |
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tower_sessions")]
pub struct Model {
    /// The session identifier as rendered by `tower_sessions::session::Id`.
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,

    /// MessagePack encoding of the whole `tower_sessions::session::Record`.
    pub data: Vec<u8>,

    /// Loads filter on this column and the cleanup task deletes rows past it.
    pub expiry_date: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
