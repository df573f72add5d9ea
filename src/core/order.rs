//! Orders and their payment state.
//!
//! Checkout creates a Lightning charge for the cart total and stores the
//! charge id on the new order. Payment is confirmed later, either when the
//! processor calls the webhook or when the customer (or the order page)
//! polls; both paths end in [`check_paid`], which asks the processor for the
//! charge instead of trusting whoever triggered the check.

use chrono::Utc;
use sea_orm::{prelude::*, PaginatorTrait, QueryOrder, Set, TransactionTrait};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    entity::{order, order_product, product, user, Order, Product},
    error::{AppError, Result},
    strike::{NewCharge, PaymentProcessor},
};

/// An order together with the products on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: order::Model,
    pub products: Vec<product::Model>,
}

/// Sum of the product prices in satoshi.
pub fn order_total(products: &[product::Model]) -> i64 {
    products.iter().map(|p| p.price).sum()
}

/// Creates a charge for `products` and records the order for `user`.
///
/// Nothing is written when the charge cannot be created.
///
/// # Errors
/// `AppError::Validation` for an empty product list, `AppError::Payment`
/// when the processor rejects the charge.
#[instrument(skip_all, fields(user_id = user.id, items = products.len()))]
pub async fn create_order(
    db: &DatabaseConnection,
    payments: &dyn PaymentProcessor,
    user: &user::Model,
    products: &[product::Model],
) -> Result<order::Model> {
    if products.is_empty() {
        return Err(AppError::Validation("Your cart is empty.".to_string()));
    }

    let total_cost = order_total(products);
    let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
    let request = NewCharge::btc(total_cost)
        .with_description(format!("KaminariMerch order: {}", names.join(", ")));
    let charge = payments.create_charge(&request).await?;

    let txn = db.begin().await?;
    let order = order::ActiveModel {
        user_id: Set(Some(user.id)),
        total_cost: Set(total_cost),
        paid: Set(charge.paid),
        charge_id: Set(Some(charge.id.clone())),
        payment_request: Set(charge.payment_request.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut product_ids: Vec<i32> = products.iter().map(|p| p.id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();
    order_product::Entity::insert_many(product_ids.into_iter().map(|product_id| {
        order_product::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(product_id),
        }
    }))
    .exec_without_returning(&txn)
    .await?;
    txn.commit().await?;

    info!(order_id = order.id, charge_id = %charge.id, total_cost, "Created order");
    Ok(order)
}

/// Refreshes the order's payment flag from the processor and returns it.
///
/// Paid orders are returned as-is without a processor round trip, and an
/// order is never marked unpaid again.
#[instrument(skip_all, fields(order_id = order.id))]
pub async fn check_paid(
    db: &DatabaseConnection,
    payments: &dyn PaymentProcessor,
    order: &order::Model,
) -> Result<bool> {
    if order.paid {
        return Ok(true);
    }
    let Some(charge_id) = order.charge_id.as_deref() else {
        warn!("Order has no charge to check");
        return Ok(false);
    };

    let charge = payments.get_charge(charge_id).await?;
    if charge.paid {
        let mut active: order::ActiveModel = order.clone().into();
        active.paid = Set(true);
        active.update(db).await?;
        info!(charge_id, "Order paid");
    }
    Ok(charge.paid)
}

pub async fn get_order(db: &DatabaseConnection, order_id: i32) -> Result<Option<order::Model>> {
    Order::find_by_id(order_id).one(db).await.map_err(Into::into)
}

pub async fn find_by_charge_id(
    db: &DatabaseConnection,
    charge_id: &str,
) -> Result<Option<order::Model>> {
    Order::find()
        .filter(order::Column::ChargeId.eq(charge_id))
        .one(db)
        .await
        .map_err(Into::into)
}

pub async fn list_orders(db: &DatabaseConnection) -> Result<Vec<order::Model>> {
    Order::find()
        .order_by_desc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn products_for_order(
    db: &DatabaseConnection,
    order: &order::Model,
) -> Result<Vec<product::Model>> {
    order
        .find_related(Product)
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn details(db: &DatabaseConnection, order: order::Model) -> Result<OrderDetails> {
    let products = products_for_order(db, &order).await?;
    Ok(OrderDetails { order, products })
}

/// An admin edit of an order. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderEdit {
    /// New owner; `Some(None)` detaches the order from any user.
    pub user_id: Option<Option<i32>>,
    pub product_ids: Option<Vec<i32>>,
}

/// Applies an admin edit in a single transaction, so a rejected product
/// list leaves the owner untouched too. The total is left alone since the
/// charge was issued for it.
#[instrument(skip(db))]
pub async fn update_order(db: &DatabaseConnection, order_id: i32, edit: &OrderEdit) -> Result<()> {
    let txn = db.begin().await?;
    let order = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("orders {order_id} not found")))?;

    if let Some(user_id) = edit.user_id {
        let mut active: order::ActiveModel = order.into();
        active.user_id = Set(user_id);
        active.update(&txn).await?;
    }

    if let Some(product_ids) = &edit.product_ids {
        order_product::Entity::delete_many()
            .filter(order_product::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;

        let mut ids = product_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        if !ids.is_empty() {
            let known = Product::find()
                .filter(product::Column::Id.is_in(ids.iter().copied()))
                .count(&txn)
                .await?;
            if known != ids.len() as u64 {
                return Err(AppError::Validation("Unknown product id.".to_string()));
            }
            order_product::Entity::insert_many(ids.into_iter().map(|product_id| {
                order_product::ActiveModel {
                    order_id: Set(order_id),
                    product_id: Set(product_id),
                }
            }))
            .exec_without_returning(&txn)
            .await?;
        }
    }
    txn.commit().await?;
    Ok(())
}
