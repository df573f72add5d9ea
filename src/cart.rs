//! Session-scoped shopping cart.
//!
//! The cart is a list of product ids stored under [`CART_KEY`]. Each product
//! appears at most once; adding an item already in the cart and removing one
//! that is not there are both no-ops.

use tower_sessions::Session;

use crate::error::Result;

pub const CART_KEY: &str = "cart";

/// Product ids in the cart, in the order they were added.
pub async fn items(session: &Session) -> Result<Vec<i32>> {
    Ok(session.get::<Vec<i32>>(CART_KEY).await?.unwrap_or_default())
}

/// Starts an empty cart unless one already exists.
pub async fn ensure(session: &Session) -> Result<Vec<i32>> {
    match session.get::<Vec<i32>>(CART_KEY).await? {
        Some(cart) => Ok(cart),
        None => {
            session.insert(CART_KEY, Vec::<i32>::new()).await?;
            Ok(Vec::new())
        }
    }
}

pub async fn contains(session: &Session, product_id: i32) -> Result<bool> {
    Ok(items(session).await?.contains(&product_id))
}

/// Returns `true` if the product was added.
pub async fn add(session: &Session, product_id: i32) -> Result<bool> {
    let mut cart = items(session).await?;
    if cart.contains(&product_id) {
        return Ok(false);
    }
    cart.push(product_id);
    session.insert(CART_KEY, cart).await?;
    Ok(true)
}

/// Returns `true` if the product was in the cart.
pub async fn remove(session: &Session, product_id: i32) -> Result<bool> {
    let mut cart = items(session).await?;
    let before = cart.len();
    cart.retain(|id| *id != product_id);
    if cart.len() == before {
        return Ok(false);
    }
    session.insert(CART_KEY, cart).await?;
    Ok(true)
}

pub async fn clear(session: &Session) -> Result<()> {
    session.insert(CART_KEY, Vec::<i32>::new()).await?;
    Ok(())
}
