//! Product catalog plumbing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use creamline_core::Product;
use creamline_db::repository::product::NewProduct;
use creamline_db::Database;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    /// Optional name/SKU search term.
    pub q: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    #[serde(flatten)]
    pub product: NewProduct,
    pub staff_id: String,
}

/// `POST /products`
pub async fn create(
    State(db): State<Database>,
    Json(input): Json<CreateProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = db.products().create(input.product, &input.staff_id).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products` — active listing, or search when `q` is present.
pub async fn list(
    State(db): State<Database>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = match query.q.as_deref() {
        Some(q) => db.products().search(q, query.limit).await?,
        None => db.products().list_active(query.limit).await?,
    };
    Ok(Json(products))
}

/// `GET /products/{id}`
pub async fn get(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let product = db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Product not found: {}", id)))?;
    Ok(Json(product))
}
