// handlers/auth.rs - /api/v1/auth handlers
// Token issuing routes answer `{ success, token }` and set the same JWT in an
// HTTP-only `token` cookie. `protect` accepts either form.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::auth::{generate_jwt, generate_reset_token, verify_password};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidJson, TOKEN_COOKIE};
use crate::server::AppState;
use crate::services::user_service::{CreateUser, UpdateDetails};
use crate::services::{Email, UserService};

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(required(message = "Please add an email"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(
        required(message = "Please add a password"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[validate(required(message = "Please provide your current password"))]
    pub current_password: Option<String>,
    #[validate(
        required(message = "Please add a password"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub new_password: Option<String>,
}

fn users(state: &AppState) -> UserService {
    UserService::new(&state.pool, state.config.security.bcrypt_cost)
}

/// Sign a token for `user` and return it in both the body and the cookie
fn token_response(state: &AppState, user: &User) -> Result<Response, ApiError> {
    let token = generate_jwt(user.id, &state.config.security)?;

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.config.is_production())
        .max_age(time::Duration::days(state.config.security.cookie_expiry_days))
        .build();

    Ok((
        CookieJar::new().add(cookie),
        Json(json!({ "success": true, "token": token })),
    )
        .into_response())
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateUser>,
) -> Result<Response, ApiError> {
    let user = users(&state).register(input).await?;
    token_response(&state, &user)
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let (Some(email), Some(password)) = (input.email, input.password) else {
        return Err(ApiError::bad_request("Please provide an email and password"));
    };

    let user = users(&state)
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(password, user.password.clone()).await? {
        tracing::debug!("Failed login for {}", user.id);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    token_response(&state, &user)
}

/// GET /auth/logout - overwrite the cookie with a short-lived placeholder
pub async fn logout() -> (CookieJar, ApiResponse<Value>) {
    let cookie = Cookie::build((TOKEN_COOKIE, "none"))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(10))
        .build();

    (CookieJar::new().add(cookie), ApiResponse::success(json!({})))
}

/// GET /auth/me
pub async fn get_me(user: CurrentUser) -> ApiResult<User> {
    Ok(ApiResponse::success(user.0))
}

/// POST /auth/forgotpassword - emails a single-use reset link
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<ForgotPasswordRequest>,
) -> ApiResult<String> {
    let service = users(&state);
    let email = input.email.unwrap_or_default();
    let user = service
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("There is no user with that email"))?;

    let (token, hashed) = generate_reset_token();
    service
        .set_reset_token(user.id, &hashed, state.config.security.reset_token_expiry_minutes)
        .await?;

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = if state.config.is_production() { "https" } else { "http" };
    let reset_url = format!("{}://{}/api/v1/auth/resetpassword/{}", scheme, host, token);

    let message = Email {
        to: user.email.clone(),
        subject: "Password reset token".to_string(),
        body: format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password. \
             Please make a PUT request to: \n\n {}",
            reset_url
        ),
    };

    if let Err(e) = state.mailer.send(message).await {
        tracing::error!("Reset email to user {} failed: {}", user.id, e);
        service.clear_reset_token(user.id).await?;
        return Err(ApiError::internal_server_error("Email could not be sent"));
    }

    Ok(ApiResponse::success("Email sent".to_string()))
}

/// PUT /auth/resetpassword/:resettoken
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    ValidJson(input): ValidJson<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let service = users(&state);
    let user = service
        .find_by_reset_token(&reset_token)
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid token"))?;

    service
        .set_password(user.id, input.password.unwrap_or_default())
        .await?;
    token_response(&state, &user)
}

/// PUT /auth/updatedetails - name and email only
pub async fn update_details(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(input): ValidJson<UpdateDetails>,
) -> ApiResult<User> {
    let updated = users(&state).update_details(user.0.id, input).await?;
    Ok(ApiResponse::success(updated))
}

/// PUT /auth/updatepassword
pub async fn update_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidJson(input): ValidJson<UpdatePasswordRequest>,
) -> Result<Response, ApiError> {
    let current = input.current_password.unwrap_or_default();
    if !verify_password(current, user.0.password.clone()).await? {
        return Err(ApiError::unauthorized("Password is incorrect"));
    }

    users(&state)
        .set_password(user.0.id, input.new_password.unwrap_or_default())
        .await?;
    token_response(&state, &user.0)
}
