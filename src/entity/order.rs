//! Orders placed at checkout.
//!
//! An order is created together with a Lightning charge. `charge_id` is the
//! processor's identifier for that charge and is what the payment webhook
//! looks orders up by; `paid` is only ever flipped from false to true.

use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "order")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owner; cleared when the account is deleted.
    pub user_id: Option<i32>,
    /// Sum of the product prices at checkout time, in satoshi
    pub total_cost: i64,
    pub paid: bool,
    #[sea_orm(indexed)]
    pub charge_id: Option<String>,
    /// BOLT11 invoice the customer pays
    pub payment_request: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
    #[sea_orm(has_many = "super::order_product::Entity")]
    OrderProduct,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        super::order_product::Relation::Product.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::order_product::Relation::Order.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
