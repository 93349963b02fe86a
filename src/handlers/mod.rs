// HTTP handlers for /api/v1, one module per resource

use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::format::populate_reference;
use crate::error::ApiError;
use crate::services::bootcamp_service;

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod users;

/// Serialize a child record with its `bootcamp` reference expanded
pub(crate) async fn with_bootcamp<T: Serialize>(pool: &PgPool, record: &T, bootcamp_id: Uuid) -> Result<Value, ApiError> {
    let value = serde_json::to_value(record).map_err(|e| {
        tracing::error!("Failed to serialize record: {}", e);
        ApiError::server_error()
    })?;

    let summaries = bootcamp_service::summaries(pool, &[bootcamp_id]).await?;
    let mut rows = [value];
    populate_reference(&mut rows, "bootcamp", &summaries);
    let [value] = rows;
    Ok(value)
}
