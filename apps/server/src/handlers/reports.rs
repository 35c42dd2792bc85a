//! Read-only reporting endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use creamline_db::repository::report::{DayEndReport, FullReport, VehicleReport};
use creamline_db::Database;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEndQuery {
    /// Calendar date (UTC), `YYYY-MM-DD`. Defaults to today.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub from: NaiveDate,
    /// Inclusive.
    pub to: NaiveDate,
}

/// `GET /reports/day-end?date=`
pub async fn day_end(
    State(db): State<Database>,
    Query(query): Query<DayEndQuery>,
) -> ApiResult<Json<DayEndReport>> {
    let date = query
        .date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let report = db.reports().day_end(date).await?;
    Ok(Json(report))
}

/// `GET /reports/full?from=&to=`
pub async fn full(
    State(db): State<Database>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<FullReport>> {
    if query.to < query.from {
        return Err(ApiError::bad_request("'to' must not be before 'from'"));
    }
    let report = db.reports().full(query.from, query.to).await?;
    Ok(Json(report))
}

/// `GET /reports/vehicle/{id}`
pub async fn vehicle(
    State(db): State<Database>,
    Path(id): Path<String>,
) -> ApiResult<Json<VehicleReport>> {
    // Answer 404 rather than an all-zero report for an unknown vehicle
    if db.vehicles().get_by_id(&id).await?.is_none() {
        return Err(ApiError::not_found(format!("Vehicle not found: {}", id)));
    }
    let report = db.reports().vehicle(&id).await?;
    Ok(Json(report))
}
