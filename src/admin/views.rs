//! The model views registered in the admin panel.

use async_trait::async_trait;
use sea_orm::{prelude::*, QueryOrder, Set};
use serde_json::{json, Map, Value};

use super::{
    formatters::{payment_status_formatter, product_image_formatter},
    AdminView, Record, ViewConfig,
};
use crate::{
    core::{
        blog,
        order::{self as orders, OrderEdit},
        product as products,
        user as users,
    },
    entity::{order, post, product, user, Order, Post, User},
    error::{AppError, Result},
};

pub static ORDER_VIEW: ViewConfig = ViewConfig {
    name: "Orders",
    endpoint: "orders",
    column_list: &["id", "user", "products", "total_cost", "paid"],
    column_editable_list: &["user", "products"],
    column_labels: &[
        ("id", "ID"),
        ("paid", "Payment Status"),
        ("total_cost", "Total Cost (Satoshi)"),
    ],
    column_formatters: &[("paid", payment_status_formatter)],
    can_export: true,
    can_view_details: true,
};

pub static PRODUCT_VIEW: ViewConfig = ViewConfig {
    name: "Products",
    endpoint: "products",
    column_list: &["image", "name", "description", "price", "active"],
    column_editable_list: &["name", "description", "price", "active"],
    column_labels: &[],
    column_formatters: &[("image", product_image_formatter)],
    can_export: true,
    can_view_details: true,
};

pub static USER_VIEW: ViewConfig = ViewConfig {
    name: "Users",
    endpoint: "users",
    column_list: &["email", "roles", "orders"],
    column_editable_list: &[],
    column_labels: &[],
    column_formatters: &[],
    can_export: false,
    can_view_details: false,
};

pub static POST_VIEW: ViewConfig = ViewConfig {
    name: "Posts",
    endpoint: "posts",
    column_list: &["title", "body", "user"],
    column_editable_list: &["title", "body"],
    column_labels: &[],
    column_formatters: &[],
    can_export: false,
    can_view_details: true,
};

fn invalid(column: &str, expected: &str) -> AppError {
    AppError::Validation(format!("{column} must be {expected}."))
}

fn as_string(column: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid(column, "a string"))
}

async fn user_email(db: &DatabaseConnection, user_id: Option<i32>) -> Result<Option<String>> {
    match user_id {
        Some(id) => Ok(users::get_user(db, id).await?.map(|u| u.email)),
        None => Ok(None),
    }
}

fn not_found(view: &ViewConfig, id: i32) -> AppError {
    AppError::NotFound(format!("{} {id} not found", view.endpoint))
}

pub struct OrderView;

impl OrderView {
    async fn record(db: &DatabaseConnection, order: &order::Model, owner: Option<&user::Model>) -> Result<Record> {
        let names: Vec<String> = orders::products_for_order(db, order)
            .await?
            .into_iter()
            .map(|p| p.name)
            .collect();
        let mut values = Map::new();
        values.insert("id".into(), json!(order.id));
        values.insert("user".into(), json!(owner.map(|u| u.email.as_str())));
        values.insert("products".into(), json!(names));
        values.insert("total_cost".into(), json!(order.total_cost));
        values.insert("paid".into(), json!(order.paid));
        Ok(Record { id: order.id, values })
    }
}

#[async_trait]
impl AdminView for OrderView {
    fn config(&self) -> &'static ViewConfig {
        &ORDER_VIEW
    }

    async fn records(&self, db: &DatabaseConnection) -> Result<Vec<Record>> {
        let rows = Order::find()
            .find_also_related(User)
            .order_by_desc(order::Column::Id)
            .all(db)
            .await?;
        let mut records = Vec::with_capacity(rows.len());
        for (order, owner) in &rows {
            records.push(Self::record(db, order, owner.as_ref()).await?);
        }
        Ok(records)
    }

    async fn details(&self, db: &DatabaseConnection, id: i32) -> Result<Option<Value>> {
        let Some(order) = orders::get_order(db, id).await? else {
            return Ok(None);
        };
        let email = user_email(db, order.user_id).await?;
        let details = orders::details(db, order).await?;
        let mut value = serde_json::to_value(details).map_err(|e| AppError::Internal(e.to_string()))?;
        value["user"] = json!(email);
        Ok(Some(value))
    }

    /// `user` takes an email (or null to detach), `products` a list of
    /// product ids.
    async fn update(&self, db: &DatabaseConnection, id: i32, changes: &Map<String, Value>) -> Result<()> {
        let mut edit = OrderEdit::default();
        if let Some(value) = changes.get("user") {
            edit.user_id = Some(match value {
                Value::Null => None,
                other => {
                    let email = as_string("user", other)?;
                    let owner = users::find_by_email(db, &email)
                        .await?
                        .ok_or_else(|| AppError::Validation(format!("Unknown user {email}.")))?;
                    Some(owner.id)
                }
            });
        }
        if let Some(value) = changes.get("products") {
            let ids = value
                .as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|v| v.as_i64().and_then(|n| i32::try_from(n).ok()))
                        .collect::<Option<Vec<i32>>>()
                })
                .ok_or_else(|| invalid("products", "a list of product ids"))?;
            edit.product_ids = Some(ids);
        }
        orders::update_order(db, id, &edit).await
    }
}

pub struct ProductView;

fn product_record(product: &product::Model) -> Record {
    let mut values = Map::new();
    values.insert("image".into(), json!(product.image));
    values.insert("name".into(), json!(product.name));
    values.insert("description".into(), json!(product.description));
    values.insert("price".into(), json!(product.price));
    values.insert("active".into(), json!(product.active));
    Record {
        id: product.id,
        values,
    }
}

#[async_trait]
impl AdminView for ProductView {
    fn config(&self) -> &'static ViewConfig {
        &PRODUCT_VIEW
    }

    async fn records(&self, db: &DatabaseConnection) -> Result<Vec<Record>> {
        Ok(products::list_all(db).await?.iter().map(product_record).collect())
    }

    async fn details(&self, db: &DatabaseConnection, id: i32) -> Result<Option<Value>> {
        let product = products::get_product(db, id).await?;
        product
            .map(|p| serde_json::to_value(p).map_err(|e| AppError::Internal(e.to_string())))
            .transpose()
    }

    async fn update(&self, db: &DatabaseConnection, id: i32, changes: &Map<String, Value>) -> Result<()> {
        let product = products::get_product(db, id)
            .await?
            .ok_or_else(|| not_found(&PRODUCT_VIEW, id))?;

        let mut name = product.name.clone();
        let mut price = product.price;
        let mut active: product::ActiveModel = product.into();
        for (column, value) in changes {
            match column.as_str() {
                "name" => {
                    name = as_string(column, value)?;
                    active.name = Set(name.trim().to_string());
                }
                "description" => active.description = Set(as_string(column, value)?),
                "price" => {
                    price = value.as_i64().ok_or_else(|| invalid(column, "an integer"))?;
                    active.price = Set(price);
                }
                "active" => {
                    active.active = Set(value.as_bool().ok_or_else(|| invalid(column, "a boolean"))?)
                }
                _ => {}
            }
        }
        products::validate(&name, price)?;
        active.update(db).await?;
        Ok(())
    }
}

pub struct UserView;

#[async_trait]
impl AdminView for UserView {
    fn config(&self) -> &'static ViewConfig {
        &USER_VIEW
    }

    async fn records(&self, db: &DatabaseConnection) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for user in users::list_users(db).await? {
            let roles: Vec<String> = users::roles_for_user(db, &user)
                .await?
                .into_iter()
                .map(|r| r.name)
                .collect();
            let order_ids = users::order_ids_for_user(db, &user).await?;
            let mut values = Map::new();
            values.insert("email".into(), json!(user.email));
            values.insert("roles".into(), json!(roles));
            values.insert("orders".into(), json!(order_ids));
            records.push(Record { id: user.id, values });
        }
        Ok(records)
    }

    async fn details(&self, _db: &DatabaseConnection, _id: i32) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn update(&self, _db: &DatabaseConnection, id: i32, _changes: &Map<String, Value>) -> Result<()> {
        Err(not_found(&USER_VIEW, id))
    }
}

pub struct PostView;

#[async_trait]
impl AdminView for PostView {
    fn config(&self) -> &'static ViewConfig {
        &POST_VIEW
    }

    async fn records(&self, db: &DatabaseConnection) -> Result<Vec<Record>> {
        let rows = Post::find()
            .find_also_related(User)
            .order_by_desc(post::Column::Timestamp)
            .all(db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(post, author)| {
                let mut values = Map::new();
                values.insert("title".into(), json!(post.title));
                values.insert("body".into(), json!(post.body));
                values.insert("user".into(), json!(author.map(|u| u.email)));
                Record { id: post.id, values }
            })
            .collect())
    }

    async fn details(&self, db: &DatabaseConnection, id: i32) -> Result<Option<Value>> {
        blog::get_post(db, id)
            .await?
            .map(|p| serde_json::to_value(p).map_err(|e| AppError::Internal(e.to_string())))
            .transpose()
    }

    async fn update(&self, db: &DatabaseConnection, id: i32, changes: &Map<String, Value>) -> Result<()> {
        let post = Post::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| not_found(&POST_VIEW, id))?;

        let mut active: post::ActiveModel = post.into();
        if let Some(value) = changes.get("title") {
            let title = as_string("title", value)?;
            blog::check_length("Title", &title, blog::TITLE_MAX_LEN)?;
            active.title = Set(title.trim().to_string());
        }
        if let Some(value) = changes.get("body") {
            let body = as_string("body", value)?;
            blog::check_length("Body", &body, blog::BODY_MAX_LEN)?;
            active.body = Set(body.trim().to_string());
        }
        active.update(db).await?;
        Ok(())
    }
}
