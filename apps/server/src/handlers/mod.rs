//! HTTP handlers, one module per resource.
//!
//! ## Route Map
//! ```text
//! POST   /sales                 checkout
//! GET    /sales                 recent sales
//! GET    /sales/{id}            sale with items + additional payments
//! PATCH  /sales/{id}            add payment
//! DELETE /sales/{id}            cancel
//! POST   /returns               return/exchange settlement
//! GET    /returns/history       all returns, newest first
//! GET    /customers/credit      available credit lookup
//! POST   /customers             create customer
//! GET    /customers             list customers
//! POST   /products              create product
//! GET    /products              list / search products
//! GET    /products/{id}         product by id
//! POST   /stock/transactions    inventory ledger operation
//! GET    /stock/transactions    ledger listing
//! POST   /expenses              record expense
//! GET    /expenses              ranged expense listing
//! GET    /reports/day-end       day-end rollup
//! GET    /reports/full          range rollup with categories
//! GET    /reports/vehicle/{id}  per-vehicle rollup
//! POST   /auth/login            credential check
//! GET    /health                liveness + db ping
//! ```

pub mod auth;
pub mod customers;
pub mod expenses;
pub mod products;
pub mod reports;
pub mod returns;
pub mod sales;
pub mod stock;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use creamline_db::Database;

use crate::error::ApiResult;

/// Builds the application router.
pub fn router(db: Database) -> Router {
    Router::new()
        .route("/sales", post(sales::checkout).get(sales::list))
        .route(
            "/sales/{id}",
            get(sales::get)
                .patch(sales::add_payment)
                .delete(sales::cancel),
        )
        .route("/returns", post(returns::settle))
        .route("/returns/history", get(returns::history))
        .route(
            "/customers",
            post(customers::create).get(customers::list),
        )
        .route("/customers/credit", get(customers::credit))
        .route(
            "/products",
            post(products::create).get(products::list),
        )
        .route("/products/{id}", get(products::get))
        .route(
            "/stock/transactions",
            post(stock::apply).get(stock::list),
        )
        .route(
            "/expenses",
            post(expenses::record).get(expenses::list),
        )
        .route("/reports/day-end", get(reports::day_end))
        .route("/reports/full", get(reports::full))
        .route("/reports/vehicle/{id}", get(reports::vehicle))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .with_state(db)
}

/// Liveness check with a database ping.
async fn health(
    axum::extract::State(db): axum::extract::State<Database>,
) -> ApiResult<Json<serde_json::Value>> {
    if !db.health_check().await {
        return Err(crate::error::ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Database unreachable",
        ));
    }
    Ok(Json(json!({ "status": "ok" })))
}
