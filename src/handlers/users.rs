// handlers/users.rs - /api/v1/users handlers (admin only)

use axum::extract::{RawQuery, State};
use serde_json::{json, Value};

use crate::database::models::{User, USER_SCHEMA};
use crate::middleware::{ApiResponse, ApiResult, RecordId, ValidJson};
use crate::server::AppState;
use crate::services::user_service::{CreateUser, UpdateUser};
use crate::services::{advanced_results, Populate, UserService};

fn service(state: &AppState) -> UserService {
    UserService::new(&state.pool, state.config.security.bcrypt_cost)
}

pub async fn get_users(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Vec<Value>> {
    advanced_results(&state, &USER_SCHEMA, Populate::Nothing, query.as_deref()).await
}

pub async fn get_user(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<User> {
    Ok(ApiResponse::success(service(&state).get(id).await?))
}

/// POST /users - any role, including admin
pub async fn create_user(State(state): State<AppState>, ValidJson(input): ValidJson<CreateUser>) -> ApiResult<User> {
    Ok(ApiResponse::created(service(&state).create(input).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    ValidJson(input): ValidJson<UpdateUser>,
) -> ApiResult<User> {
    Ok(ApiResponse::success(service(&state).update(id, input).await?))
}

pub async fn delete_user(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<Value> {
    service(&state).delete(id).await?;
    Ok(ApiResponse::success(json!({})))
}
