//! Login endpoint over the credential-store seam.
//!
//! Unknown usernames and wrong passwords answer identically, so the endpoint
//! can't be used to probe which staff accounts exist.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use creamline_core::auth::CredentialStore;
use creamline_db::Database;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
}

/// `POST /auth/login`
pub async fn login(
    State(db): State<Database>,
    Json(input): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let store = db.users();

    let Some(user) = store.find_by_username(&input.username).await? else {
        return Err(ApiError::unauthorized("Invalid username or password"));
    };

    if !store.verify_password(&user, &input.password).await? {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    info!(username = %user.username, "Login succeeded");

    Ok(Json(LoginResponse {
        user_id: user.id,
        username: user.username,
        display_name: user.display_name,
    }))
}
