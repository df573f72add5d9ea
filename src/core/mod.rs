//! Business logic, independent of HTTP.
//!
//! Handlers in [`crate::routes`] and [`crate::admin`] call into these
//! modules; everything here takes a `DatabaseConnection` and returns
//! [`crate::error::Result`].

pub mod blog;
pub mod order;
pub mod product;
pub mod user;
