// handlers/courses.rs - /api/v1/courses and /api/v1/bootcamps/:id/courses handlers

use axum::extract::{RawQuery, State};
use serde_json::{json, Value};

use crate::database::models::{Course, COURSE_SCHEMA};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, RecordId, ValidJson};
use crate::server::AppState;
use crate::services::course_service::{CreateCourse, UpdateCourse};
use crate::services::{advanced_results, CourseService, Populate};

use super::with_bootcamp;

/// GET /courses - filtered, paginated list with the bootcamp populated
pub async fn get_courses(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Vec<Value>> {
    advanced_results(&state, &COURSE_SCHEMA, Populate::Bootcamp, query.as_deref()).await
}

/// GET /bootcamps/:id/courses - every course of one bootcamp
pub async fn get_bootcamp_courses(
    State(state): State<AppState>,
    RecordId(bootcamp_id): RecordId,
) -> ApiResult<Vec<Course>> {
    let courses = CourseService::new(&state.pool).list_for_bootcamp(bootcamp_id).await?;
    let count = courses.len();
    Ok(ApiResponse::success(courses).with_count(count))
}

/// GET /courses/:id
pub async fn get_course(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<Value> {
    let course = CourseService::new(&state.pool).get(id).await?;
    let data = with_bootcamp(&state.pool, &course, course.bootcamp_id).await?;
    Ok(ApiResponse::success(data))
}

/// POST /bootcamps/:id/courses - bootcamp owner or admin
pub async fn add_course(
    State(state): State<AppState>,
    RecordId(bootcamp_id): RecordId,
    user: CurrentUser,
    ValidJson(input): ValidJson<CreateCourse>,
) -> ApiResult<Course> {
    let course = CourseService::new(&state.pool).create(&user.0, bootcamp_id, input).await?;
    Ok(ApiResponse::created(course))
}

/// PUT /courses/:id
pub async fn update_course(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    user: CurrentUser,
    ValidJson(input): ValidJson<UpdateCourse>,
) -> ApiResult<Course> {
    let course = CourseService::new(&state.pool).update(&user.0, id, input).await?;
    Ok(ApiResponse::success(course))
}

/// DELETE /courses/:id
pub async fn delete_course(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    user: CurrentUser,
) -> ApiResult<Value> {
    CourseService::new(&state.pool).delete(&user.0, id).await?;
    Ok(ApiResponse::success(json!({})))
}
