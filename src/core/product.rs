//! Product catalogue operations.

use sea_orm::{prelude::*, QueryOrder, Set};
use tracing::{info, instrument};

use crate::{
    entity::{product, Product},
    error::{AppError, Result},
};

/// Products shown on the store page, in catalogue order.
pub async fn list_active(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::Active.eq(true))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

pub async fn get_product(db: &DatabaseConnection, product_id: i32) -> Result<Option<product::Model>> {
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Fetches the products with the given ids; unknown ids are skipped.
pub async fn find_many(db: &DatabaseConnection, ids: &[i32]) -> Result<Vec<product::Model>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Product::find()
        .filter(product::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds an active product.
///
/// # Errors
/// `AppError::Validation` for an empty name or a negative price.
#[instrument(skip(db, description))]
pub async fn create_product(
    db: &DatabaseConnection,
    name: &str,
    description: &str,
    price: i64,
) -> Result<product::Model> {
    validate(name, price)?;

    let product = product::ActiveModel {
        name: Set(name.trim().to_string()),
        description: Set(description.to_string()),
        price: Set(price),
        active: Set(true),
        image: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(product_id = product.id, "Created product");
    Ok(product)
}

pub(crate) fn validate(name: &str, price: i64) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Product name cannot be empty.".to_string()));
    }
    if price < 0 {
        return Err(AppError::Validation("Product price cannot be negative.".to_string()));
    }
    Ok(())
}

/// Records the stored image file name for a product.
pub async fn set_image(
    db: &DatabaseConnection,
    product_id: i32,
    image: Option<String>,
) -> Result<product::Model> {
    let product = get_product(db, product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))?;
    let mut active: product::ActiveModel = product.into();
    active.image = Set(image);
    active.update(db).await.map_err(Into::into)
}

/// Demo catalogue for trying the store out, prices in satoshi.
const EXAMPLE_PRODUCTS: &[(&str, &str, i64)] = &[
    ("T-shirt", "Really hip t-shirt that will get you all the ladies!", 420),
    ("Shoes", "Snazzy shoes. Probably crocs though.", 900),
    ("Hat", "Tophat designed for gentlemen.", 50),
    ("Jeans", "Jeans that will get the people talking!", 510),
    ("Shorts", "Why are you wearing shorts in Scotland", 95),
    ("Sunglasses", "Sunglasses to make sure your eyes do not die.", 83),
    ("Socks", "Some socks you can buy for your grandson's christmas. I'm sure he will love it.", 500),
    ("Hoodie", "Keeps your head warm I guess", 1337),
    ("Boots", "Some good big boy shoes", 250),
];

/// Inserts the demo catalogue and returns the new rows.
#[instrument(skip(db))]
pub async fn generate_example_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    let mut created = Vec::with_capacity(EXAMPLE_PRODUCTS.len());
    for (name, description, price) in EXAMPLE_PRODUCTS {
        created.push(create_product(db, name, description, *price).await?);
    }
    info!(count = created.len(), "Generated example products");
    Ok(created)
}
