//! Admin panel.
//!
//! Each model view is declared with a [`ViewConfig`] (columns, editable
//! columns, labels, formatters, export and details switches) and backed by
//! an [`AdminView`] that loads and edits the rows. The orders view doubles
//! as the panel's index page. Every route requires [`AdminUser`].

use async_trait::async_trait;
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    app::AppState,
    auth::AdminUser,
    core::product as products,
    error::{AppError, Result},
};

pub mod export;
pub mod formatters;
pub mod views;

use formatters::Formatter;

/// Declarative description of a model view.
#[derive(Debug)]
pub struct ViewConfig {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub column_list: &'static [&'static str],
    pub column_editable_list: &'static [&'static str],
    pub column_labels: &'static [(&'static str, &'static str)],
    pub column_formatters: &'static [(&'static str, Formatter)],
    pub can_export: bool,
    pub can_view_details: bool,
}

impl ViewConfig {
    /// Header for `column`: the configured label, else the column name with
    /// underscores turned into spaces and each word capitalised.
    pub fn label(&self, column: &str) -> String {
        if let Some((_, label)) = self.column_labels.iter().find(|(c, _)| *c == column) {
            return (*label).to_string();
        }
        column
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    pub fn is_editable(&self, column: &str) -> bool {
        self.column_editable_list.contains(&column)
    }

    /// Display value for a list page cell.
    pub fn format(&self, column: &str, value: &Value) -> Value {
        match self.column_formatters.iter().find(|(c, _)| *c == column) {
            Some((_, formatter)) => Value::String(formatter(value)),
            None => value.clone(),
        }
    }
}

/// One row of a list view: the primary key and the raw column values.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub id: i32,
    pub values: Map<String, Value>,
}

#[async_trait]
pub trait AdminView: Send + Sync {
    fn config(&self) -> &'static ViewConfig;

    async fn records(&self, db: &DatabaseConnection) -> Result<Vec<Record>>;

    async fn details(&self, db: &DatabaseConnection, id: i32) -> Result<Option<Value>>;

    /// Applies `changes`, already restricted to editable columns.
    async fn update(&self, db: &DatabaseConnection, id: i32, changes: &Map<String, Value>) -> Result<()>;
}

static VIEWS: &[&dyn AdminView] = &[
    &views::OrderView,
    &views::ProductView,
    &views::UserView,
    &views::PostView,
];

pub fn find_view(endpoint: &str) -> Result<&'static dyn AdminView> {
    VIEWS
        .iter()
        .copied()
        .find(|v| v.config().endpoint == endpoint)
        .ok_or_else(|| AppError::NotFound(format!("admin view {endpoint} not found")))
}

/// Rejects changes to columns that are not editable in the list view.
pub fn check_editable(config: &ViewConfig, changes: &Map<String, Value>) -> Result<()> {
    if changes.is_empty() {
        return Err(AppError::Validation("Nothing to update.".to_string()));
    }
    if let Some(column) = changes.keys().find(|c| !config.is_editable(c)) {
        return Err(AppError::Validation(format!(
            "Column {column} is not editable."
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub label: String,
    pub editable: bool,
}

#[derive(Debug, Serialize)]
pub struct MenuItem {
    pub name: &'static str,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ListPage {
    pub title: &'static str,
    pub endpoint: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<Record>,
    pub can_export: bool,
    pub can_view_details: bool,
    pub menu: Vec<MenuItem>,
}

fn menu() -> Vec<MenuItem> {
    let mut items = vec![MenuItem {
        name: "Home",
        url: "/".to_string(),
    }];
    items.extend(VIEWS.iter().map(|v| MenuItem {
        name: v.config().name,
        url: format!("/admin/{}", v.config().endpoint),
    }));
    items
}

async fn list_page(db: &DatabaseConnection, view: &dyn AdminView) -> Result<ListPage> {
    let config = view.config();
    let rows = view
        .records(db)
        .await?
        .into_iter()
        .map(|mut record| {
            for (column, value) in record.values.iter_mut() {
                *value = config.format(column, value);
            }
            record
        })
        .collect();

    Ok(ListPage {
        title: config.name,
        endpoint: config.endpoint,
        columns: config
            .column_list
            .iter()
            .map(|c| Column {
                name: c,
                label: config.label(c),
                editable: config.is_editable(c),
            })
            .collect(),
        rows,
        can_export: config.can_export,
        can_view_details: config.can_view_details,
        menu: menu(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(index))
        .route("/admin/", get(index))
        .route("/admin/{view}", get(list))
        .route("/admin/{view}/export", get(export_csv))
        .route("/admin/{view}/{id}", get(details).patch(update))
        .route("/admin/products/{id}/image", post(upload_image))
}

async fn index(State(state): State<AppState>, AdminUser(_admin): AdminUser) -> Result<Json<ListPage>> {
    Ok(Json(list_page(&state.db, &views::OrderView).await?))
}

async fn list(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(endpoint): Path<String>,
) -> Result<Json<ListPage>> {
    let view = find_view(&endpoint)?;
    Ok(Json(list_page(&state.db, view).await?))
}

async fn details(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path((endpoint, id)): Path<(String, i32)>,
) -> Result<Json<Value>> {
    let view = find_view(&endpoint)?;
    if !view.config().can_view_details {
        return Err(AppError::NotFound(format!("{endpoint} has no details view")));
    }
    view.details(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{endpoint} {id} not found")))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((endpoint, id)): Path<(String, i32)>,
    Json(changes): Json<Map<String, Value>>,
) -> Result<Json<Value>> {
    let view = find_view(&endpoint)?;
    check_editable(view.config(), &changes)?;
    view.update(&state.db, id, &changes).await?;
    info!(admin_id = admin.id, view = %endpoint, id, "Admin edit");
    Ok(Json(json!({ "success": true })))
}

async fn export_csv(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(endpoint): Path<String>,
) -> Result<Response> {
    let view = find_view(&endpoint)?;
    let config = view.config();
    if !config.can_export {
        return Err(AppError::NotFound(format!("{endpoint} cannot be exported")));
    }
    let records = view.records(&state.db).await?;
    let body = export::to_csv(config, &records);
    let disposition = format!("attachment; filename=\"{}.csv\"", config.endpoint);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

const IMAGE_EXTENSIONS: &[&str] = &["gif", "jpg", "jpeg", "png", "tiff", "webp"];

/// Unique file name for an upload, keeping only a known image extension.
pub fn image_filename(original: &str) -> Result<String> {
    let ext = std::path::Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
        .ok_or_else(|| AppError::Validation("Unsupported image type.".to_string()))?;
    Ok(format!("{}.{ext}", Uuid::new_v4()))
}

/// Stores the `image` field of a multipart upload and points the product at
/// it. The previous image file is removed.
async fn upload_image(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(product_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let product = products::get_product(&state.db, product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id} not found")))?;

    let bad_upload = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Invalid upload: {e}"))
    };
    let mut stored = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        if field.name() != Some("image") {
            continue;
        }
        let filename = image_filename(field.file_name().unwrap_or_default())?;
        let data = field.bytes().await.map_err(bad_upload)?;
        if data.is_empty() {
            return Err(AppError::Validation("Uploaded image is empty.".to_string()));
        }
        tokio::fs::create_dir_all(&state.config.image_dir).await?;
        tokio::fs::write(state.config.image_dir.join(&filename), &data).await?;
        debug!(product_id, bytes = data.len(), file = %filename, "Stored product image");
        stored = Some(filename);
        break;
    }
    let filename = stored.ok_or_else(|| AppError::Validation("No image uploaded.".to_string()))?;

    let updated = match products::set_image(&state.db, product_id, Some(filename.clone())).await {
        Ok(updated) => updated,
        Err(e) => {
            remove_image(&state.config.image_dir, &filename, product_id).await;
            return Err(e);
        }
    };
    if let Some(old) = product.image.as_deref() {
        remove_image(&state.config.image_dir, old, product_id).await;
    }
    Ok(Json(json!({ "success": true, "image": updated.image })))
}

async fn remove_image(dir: &std::path::Path, filename: &str, product_id: i32) {
    if let Err(e) = tokio::fs::remove_file(dir.join(filename)).await {
        warn!(product_id, file = %filename, error = %e, "Could not remove image");
    }
}
