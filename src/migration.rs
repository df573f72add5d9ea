pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_session_table;
mod m20240101_000002_create_store_tables;
mod m20240101_000003_create_blog_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    // Keep our bookkeeping table apart from anything else sharing the database
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("kaminari_merch_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_session_table::Migration),
            Box::new(m20240101_000002_create_store_tables::Migration),
            Box::new(m20240101_000003_create_blog_tables::Migration),
        ]
    }
}

/// Builds the `CREATE TABLE IF NOT EXISTS` statement for an entity on the
/// connected backend.
pub(crate) fn create_table_for<E: sea_orm::EntityTrait>(
    manager: &SchemaManager<'_>,
    entity: E,
) -> TableCreateStatement {
    let schema = sea_orm::Schema::new(manager.get_database_backend());
    schema
        .create_table_from_entity(entity)
        .if_not_exists()
        .to_owned()
}
