// handlers/reviews.rs - /api/v1/reviews and /api/v1/bootcamps/:id/reviews handlers

use axum::extract::{RawQuery, State};
use serde_json::{json, Value};

use crate::database::models::{Review, REVIEW_SCHEMA};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, RecordId, ValidJson};
use crate::server::AppState;
use crate::services::review_service::{CreateReview, UpdateReview};
use crate::services::{advanced_results, Populate, ReviewService};

use super::with_bootcamp;

pub async fn get_reviews(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Vec<Value>> {
    advanced_results(&state, &REVIEW_SCHEMA, Populate::Bootcamp, query.as_deref()).await
}

pub async fn get_bootcamp_reviews(
    State(state): State<AppState>,
    RecordId(bootcamp_id): RecordId,
) -> ApiResult<Vec<Review>> {
    let reviews = ReviewService::new(&state.pool).list_for_bootcamp(bootcamp_id).await?;
    let count = reviews.len();
    Ok(ApiResponse::success(reviews).with_count(count))
}

pub async fn get_review(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<Value> {
    let review = ReviewService::new(&state.pool).get(id).await?;
    let data = with_bootcamp(&state.pool, &review, review.bootcamp_id).await?;
    Ok(ApiResponse::success(data))
}

/// POST /bootcamps/:id/reviews - a second review by the same user is a duplicate
pub async fn add_review(
    State(state): State<AppState>,
    RecordId(bootcamp_id): RecordId,
    user: CurrentUser,
    ValidJson(input): ValidJson<CreateReview>,
) -> ApiResult<Review> {
    let review = ReviewService::new(&state.pool).create(&user.0, bootcamp_id, input).await?;
    Ok(ApiResponse::created(review))
}

pub async fn update_review(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    user: CurrentUser,
    ValidJson(input): ValidJson<UpdateReview>,
) -> ApiResult<Review> {
    let review = ReviewService::new(&state.pool).update(&user.0, id, input).await?;
    Ok(ApiResponse::success(review))
}

pub async fn delete_review(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    user: CurrentUser,
) -> ApiResult<Value> {
    ReviewService::new(&state.pool).delete(&user.0, id).await?;
    Ok(ApiResponse::success(json!({})))
}
