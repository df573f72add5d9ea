use sea_orm_migration::prelude::*;

use super::create_table_for;
use crate::entity::{order, order_product, product, role, user, user_role};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Parents before the join tables that reference them
        manager
            .create_table(create_table_for(manager, user::Entity))
            .await?;
        manager
            .create_table(create_table_for(manager, role::Entity))
            .await?;
        manager
            .create_table(create_table_for(manager, user_role::Entity))
            .await?;
        manager
            .create_table(create_table_for(manager, product::Entity))
            .await?;
        manager
            .create_table(create_table_for(manager, order::Entity))
            .await?;
        manager
            .create_table(create_table_for(manager, order_product::Entity))
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_charge_id")
                    .table(order::Entity)
                    .col(order::Column::ChargeId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(order_product::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(order::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(product::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(user_role::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(role::Entity).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(user::Entity).to_owned())
            .await
    }
}
