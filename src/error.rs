// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::manager::DatabaseError;

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// This is the only type that renders the `{ success: false, error }` envelope.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    Validation(Vec<String>),
    InvalidJson(String),
    Duplicate(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 429 Too Many Requests
    TooManyRequests(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::Validation(_)
            | ApiError::InvalidJson(_)
            | ApiError::Duplicate(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::Validation(messages) => messages.join(", "),
            ApiError::BadRequest(msg)
            | ApiError::InvalidJson(msg)
            | ApiError::Duplicate(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::TooManyRequests(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let error = match self {
            ApiError::Validation(messages) => json!(messages),
            ApiError::InternalServerError(msg) if msg.is_empty() => json!("Server Error"),
            _ => json!(self.message()),
        };

        json!({
            "success": false,
            "error": error
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation(messages: Vec<String>) -> Self {
        ApiError::Validation(messages)
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn duplicate() -> Self {
        ApiError::Duplicate("Duplicate field value entered".to_string())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn resource_not_found() -> Self {
        ApiError::NotFound("Resource not found".to_string())
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        ApiError::TooManyRequests(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn server_error() -> Self {
        ApiError::InternalServerError("Server Error".to_string())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Sqlx(sqlx_err) => sqlx_err.into(),
            DatabaseError::Query(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::server_error()
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::ConfigMissing(key) => {
                tracing::error!("Missing database configuration: {}", key);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::resource_not_found(),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => ApiError::duplicate(),
                // invalid_text_representation, i.e. a malformed id
                Some("22P02") => ApiError::resource_not_found(),
                // foreign_key_violation
                Some("23503") => ApiError::not_found("Referenced resource does not exist"),
                // check_violation
                Some("23514") => ApiError::validation(vec![format!(
                    "Invalid value rejected by {}",
                    db_err.constraint().unwrap_or("a field constraint")
                )]),
                _ => {
                    tracing::error!("Database error: {}", db_err);
                    ApiError::server_error()
                }
            },
            e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => {
                tracing::error!("Database connection error: {}", e);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", other);
                ApiError::server_error()
            }
        }
    }
}

impl From<crate::filter::error::FilterError> for ApiError {
    fn from(err: crate::filter::error::FilterError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let messages = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {}", field),
                })
            })
            .collect();

        ApiError::validation(messages)
    }
}

impl From<crate::auth::AuthError> for ApiError {
    fn from(err: crate::auth::AuthError) -> Self {
        match err {
            crate::auth::AuthError::InvalidToken(msg) => {
                tracing::debug!("Token rejected: {}", msg);
                ApiError::unauthorized("Not authorized to access this route")
            }
            other => {
                tracing::error!("Auth error: {}", other);
                ApiError::server_error()
            }
        }
    }
}

impl From<crate::services::geocoder::GeocodeError> for ApiError {
    fn from(err: crate::services::geocoder::GeocodeError) -> Self {
        tracing::warn!("Geocoding failed: {}", err);
        match err {
            crate::services::geocoder::GeocodeError::NoResults(_) => {
                ApiError::bad_request("Unable to geocode address")
            }
            _ => ApiError::service_unavailable("Geocoding service unavailable"),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if self.status_code().is_server_error() {
            tracing::error!("Request failed: {}", self.message());
        }
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "Please add a name"))]
        name: String,
        #[validate(range(min = 1, max = 10, message = "Rating must be between 1 and 10"))]
        rating: i32,
    }

    #[test]
    fn envelope_carries_single_message() {
        let err = ApiError::not_found("Bootcamp not found with id of 42");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            err.to_json(),
            json!({ "success": false, "error": "Bootcamp not found with id of 42" })
        );
    }

    #[test]
    fn duplicate_maps_to_bad_request() {
        let err = ApiError::duplicate();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_json()["error"], "Duplicate field value entered");
    }

    #[test]
    fn validation_errors_render_as_array_sorted_by_field() {
        let payload = Payload { name: String::new(), rating: 11 };
        let err: ApiError = payload.validate().unwrap_err().into();

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_json()["error"],
            json!(["Please add a name", "Rating must be between 1 and 10"])
        );
    }

    #[test]
    fn row_not_found_is_404() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Resource not found");
    }

    #[test]
    fn unclassified_errors_hide_details() {
        let err: ApiError = DatabaseError::Query("syntax error at or near".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_json()["error"], "Server Error");
    }
}
