use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use time::OffsetDateTime;
use tower_sessions::{session::Id, session::Record, session_store, ExpiredDeletion, SessionStore};
use tracing::{debug, instrument};

use crate::entity::session::{self, ActiveModel as SessionActiveModel, Entity as SessionEntity};

/// `tower-sessions` store persisting sessions through Sea-ORM.
///
/// Works on any backend the crate is built with (SQLite for development and
/// tests, PostgreSQL in production). Records are stored MessagePack-encoded
/// in the `tower_sessions` table created by [`crate::migration::Migrator`].
///
/// Errors from Sea-ORM become `session_store::Error::Backend`, encoding
/// failures `Encode` and decoding failures `Decode`.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    conn: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

fn backend(e: impl ToString) -> session_store::Error {
    session_store::Error::Backend(e.to_string())
}

#[async_trait]
impl SessionStore for SeaOrmStore {
    /// Inserts a new record, regenerating the id until it does not collide
    /// with an existing row.
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let txn = self.conn.begin().await.map_err(backend)?;

        while SessionEntity::find_by_id(record.id.to_string())
            .one(&txn)
            .await
            .map_err(backend)?
            .is_some()
        {
            record.id = Id::default();
        }

        let data =
            rmp_serde::to_vec(record).map_err(|e| session_store::Error::Encode(e.to_string()))?;

        SessionActiveModel {
            id: Set(record.id.to_string()),
            data: Set(data),
            expiry_date: Set(to_db_datetime(record.expiry_date)?),
        }
        .insert(&txn)
        .await
        .map_err(backend)?;

        txn.commit().await.map_err(backend)?;

        Ok(())
    }

    /// Upserts the record.
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let data =
            rmp_serde::to_vec(record).map_err(|e| session_store::Error::Encode(e.to_string()))?;
        let expiry_date = to_db_datetime(record.expiry_date)?;

        match SessionEntity::find_by_id(record.id.to_string())
            .one(&self.conn)
            .await
            .map_err(backend)?
        {
            Some(existing) => {
                let mut active_model = existing.into_active_model();
                active_model.data = Set(data);
                active_model.expiry_date = Set(expiry_date);
                active_model.update(&self.conn).await.map_err(backend)?;
            }
            None => {
                SessionActiveModel {
                    id: Set(record.id.to_string()),
                    data: Set(data),
                    expiry_date: Set(expiry_date),
                }
                .insert(&self.conn)
                .await
                .map_err(backend)?;
            }
        }

        Ok(())
    }

    /// Loads a record; expired rows are treated as missing.
    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = to_db_datetime(OffsetDateTime::now_utc())?;

        let session = SessionEntity::find_by_id(session_id.to_string())
            .filter(session::Column::ExpiryDate.gt(now))
            .one(&self.conn)
            .await
            .map_err(backend)?;

        session
            .map(|model| {
                rmp_serde::from_slice(&model.data)
                    .map_err(|e| session_store::Error::Decode(e.to_string()))
            })
            .transpose()
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        SessionEntity::delete_by_id(session_id.to_string())
            .exec(&self.conn)
            .await
            .map_err(backend)?;

        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for SeaOrmStore {
    #[instrument(skip(self))]
    async fn delete_expired(&self) -> session_store::Result<()> {
        let now = to_db_datetime(OffsetDateTime::now_utc())?;

        let result = SessionEntity::delete_many()
            .filter(session::Column::ExpiryDate.lt(now))
            .exec(&self.conn)
            .await
            .map_err(backend)?;

        debug!(deleted = result.rows_affected, "Deleted expired sessions");
        Ok(())
    }
}

// tower-sessions speaks `time`, the entity columns speak chrono
fn to_db_datetime(time: OffsetDateTime) -> session_store::Result<DateTimeWithTimeZone> {
    chrono::DateTime::from_timestamp(time.unix_timestamp(), time.nanosecond())
        .map(Into::into)
        .ok_or_else(|| {
            session_store::Error::Encode(format!("expiry date {time} is out of range"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use std::collections::HashMap;
    use time::Duration;

    fn record_expiring_in(duration: Duration) -> Record {
        let mut data = HashMap::new();
        data.insert("cart".to_string(), serde_json::json!([1, 2, 3]));
        Record {
            id: Id::default(),
            data,
            expiry_date: OffsetDateTime::now_utc() + duration,
        }
    }

    #[tokio::test]
    async fn test_create_then_load_round_trips_data() {
        let store = SeaOrmStore::new(setup_test_db().await.unwrap());
        let mut record = record_expiring_in(Duration::days(1));

        store.create(&mut record).await.unwrap();
        let loaded = store.load(&record.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.data["cart"], serde_json::json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_expired_session_is_not_loaded_and_gets_cleaned_up() {
        let db = setup_test_db().await.unwrap();
        let store = SeaOrmStore::new(db.clone());
        let mut expired = record_expiring_in(Duration::minutes(-5));
        let mut live = record_expiring_in(Duration::hours(1));
        store.create(&mut expired).await.unwrap();
        store.create(&mut live).await.unwrap();

        assert!(store.load(&expired.id).await.unwrap().is_none());

        store.delete_expired().await.unwrap();
        let remaining = SessionEntity::find().all(&db).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, live.id.to_string());
    }

    #[tokio::test]
    async fn test_save_updates_existing_and_inserts_missing() {
        let store = SeaOrmStore::new(setup_test_db().await.unwrap());
        let mut record = record_expiring_in(Duration::days(1));
        store.create(&mut record).await.unwrap();

        record
            .data
            .insert("user_id".to_string(), serde_json::json!(7));
        store.save(&record).await.unwrap();
        let loaded = store.load(&record.id).await.unwrap().unwrap();
        assert_eq!(loaded.data["user_id"], serde_json::json!(7));

        let fresh = record_expiring_in(Duration::days(1));
        store.save(&fresh).await.unwrap();
        assert!(store.load(&fresh.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_session() {
        let store = SeaOrmStore::new(setup_test_db().await.unwrap());
        let mut record = record_expiring_in(Duration::days(1));
        store.create(&mut record).await.unwrap();

        store.delete(&record.id).await.unwrap();
        assert!(store.load(&record.id).await.unwrap().is_none());
    }
}
