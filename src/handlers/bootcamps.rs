// handlers/bootcamps.rs - /api/v1/bootcamps handlers

use axum::extract::{multipart::MultipartRejection, Multipart, Path, RawQuery, State};
use serde_json::{json, Value};

use crate::database::models::{Bootcamp, BOOTCAMP_SCHEMA};
use crate::database::Repository;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, RecordId, ValidJson};
use crate::server::AppState;
use crate::services::bootcamp_service::{CreateBootcamp, UpdateBootcamp};
use crate::services::{advanced_results, BootcampService, Populate, UploadedFile};

/// GET /bootcamps - filtered, paginated list with each bootcamp's courses
pub async fn get_bootcamps(State(state): State<AppState>, RawQuery(query): RawQuery) -> ApiResult<Vec<Value>> {
    advanced_results(&state, &BOOTCAMP_SCHEMA, Populate::Courses, query.as_deref()).await
}

/// GET /bootcamps/:id
pub async fn get_bootcamp(State(state): State<AppState>, RecordId(id): RecordId) -> ApiResult<Bootcamp> {
    let bootcamp = Repository::<Bootcamp>::new(&state.pool).select_404(id).await?;
    Ok(ApiResponse::success(bootcamp))
}

/// POST /bootcamps - publisher or admin; one bootcamp per publisher
pub async fn create_bootcamp(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(input): ValidJson<CreateBootcamp>,
) -> ApiResult<Bootcamp> {
    let bootcamp = BootcampService::new(&state).create(&user.0, input).await?;
    Ok(ApiResponse::created(bootcamp))
}

/// PUT /bootcamps/:id
pub async fn update_bootcamp(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    user: CurrentUser,
    ValidJson(input): ValidJson<UpdateBootcamp>,
) -> ApiResult<Bootcamp> {
    let bootcamp = BootcampService::new(&state).update(&user.0, id, input).await?;
    Ok(ApiResponse::success(bootcamp))
}

/// DELETE /bootcamps/:id - also removes its courses and reviews
pub async fn delete_bootcamp(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    user: CurrentUser,
) -> ApiResult<Value> {
    BootcampService::new(&state).delete(&user.0, id).await?;
    Ok(ApiResponse::success(json!({})))
}

/// GET /bootcamps/radius/:zipcode/:distance - distance in kilometres
pub async fn get_bootcamps_in_radius(
    State(state): State<AppState>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> ApiResult<Vec<Bootcamp>> {
    let distance: f64 = distance
        .parse()
        .map_err(|_| ApiError::bad_request("Distance must be a non-negative number"))?;

    let bootcamps = BootcampService::new(&state).within_radius(&zipcode, distance).await?;
    let count = bootcamps.len();
    Ok(ApiResponse::success(bootcamps).with_count(count))
}

/// PUT /bootcamps/:id/photo - multipart field `file`, responds with the stored name
pub async fn bootcamp_photo_upload(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<String> {
    let file = match multipart {
        Ok(multipart) => read_file_field(multipart).await?,
        Err(rejection) => {
            tracing::debug!("Photo upload without multipart body: {}", rejection);
            None
        }
    };

    let file_name = BootcampService::new(&state).upload_photo(&user.0, id, file).await?;
    Ok(ApiResponse::success(file_name))
}

async fn read_file_field(mut multipart: Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}
