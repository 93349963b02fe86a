mod common;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{call, offline_state, test_config};
use devcamper_api::auth::generate_jwt;

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let state = offline_state(test_config());
    let res = call(&state, Method::GET, "/", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["data"]["name"], "DevCamper API");
    assert_eq!(
        res.headers.get(header::X_CONTENT_TYPE_OPTIONS).map(|v| v.as_bytes()),
        Some(&b"nosniff"[..])
    );
    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let state = offline_state(test_config());

    for (method, uri) in [
        (Method::GET, "/api/v1/auth/me"),
        (Method::POST, "/api/v1/bootcamps"),
        (Method::PUT, "/api/v1/auth/updatepassword"),
        (Method::GET, "/api/v1/users"),
        (Method::DELETE, "/api/v1/reviews/5d7a514b-5d2c-12c8-9fea-0000000000a1"),
    ] {
        let res = call(&state, method.clone(), uri, None, None).await?;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(
            res.body,
            json!({ "success": false, "error": "Not authorized to access this route" })
        );
    }
    Ok(())
}

#[tokio::test]
async fn foreign_tokens_are_rejected() -> Result<()> {
    let state = offline_state(test_config());

    let mut other = test_config().security;
    other.jwt_secret = "some-other-secret".to_string();
    let token = generate_jwt(Uuid::new_v4(), &other)?;

    let res = call(&state, Method::GET, "/api/v1/auth/me", None, Some(&token)).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = call(&state, Method::GET, "/api/v1/auth/me", None, Some("not-a-jwt")).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn malformed_ids_read_as_missing_resources() -> Result<()> {
    let state = offline_state(test_config());

    for uri in [
        "/api/v1/bootcamps/123",
        "/api/v1/courses/abc",
        "/api/v1/reviews/zzz",
        "/api/v1/bootcamps/not-a-uuid/courses",
        "/api/v1/bootcamps/not-a-uuid/reviews",
    ] {
        let res = call(&state, Method::GET, uri, None, None).await?;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(res.body["error"], "Resource not found");
    }
    Ok(())
}

#[tokio::test]
async fn unknown_filter_fields_are_bad_requests() -> Result<()> {
    let state = offline_state(test_config());

    let res = call(&state, Method::GET, "/api/v1/bootcamps?password=x", None, None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);

    let res = call(&state, Method::GET, "/api/v1/courses?tuition%5Blte%5D=cheap", None, None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = call(&state, Method::GET, "/api/v1/reviews?limit=0", None, None).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn oversized_page_is_a_bad_request() -> Result<()> {
    let state = offline_state(test_config());
    let res = call(&state, Method::GET, "/api/v1/bootcamps?page=9223372036854775807", None, None).await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
    assert!(res.body["error"].as_str().is_some_and(|e| e.contains("page")), "{}", res.body);
    Ok(())
}

#[tokio::test]
async fn radius_distance_must_be_numeric() -> Result<()> {
    let state = offline_state(test_config());
    let res = call(&state, Method::GET, "/api/v1/bootcamps/radius/02118/far", None, None).await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Distance must be a non-negative number");
    Ok(())
}

#[tokio::test]
async fn login_requires_both_credentials() -> Result<()> {
    let state = offline_state(test_config());
    let body = json!({ "email": "john@gmail.com" });
    let res = call(&state, Method::POST, "/api/v1/auth/login", Some(&body), None).await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Please provide an email and password");
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() -> Result<()> {
    let state = offline_state(test_config());
    let req = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{\"email\": "))?;

    let res = common::send(devcamper_api::server::app(state), req).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["success"], false);
    assert!(res.body["error"].as_str().is_some_and(|e| !e.is_empty()));
    Ok(())
}

#[tokio::test]
async fn register_validates_payload() -> Result<()> {
    let state = offline_state(test_config());
    let body = json!({ "name": "", "email": "nope", "password": "1" });
    let res = call(&state, Method::POST, "/api/v1/auth/register", Some(&body), None).await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        res.body["error"],
        json!([
            "Please add a valid email",
            "Please add a name",
            "Password must be at least 6 characters"
        ])
    );
    Ok(())
}

#[tokio::test]
async fn logout_overwrites_the_cookie() -> Result<()> {
    let state = offline_state(test_config());
    let res = call(&state, Method::GET, "/api/v1/auth/logout", None, None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "success": true, "data": {} }));

    let cookie = res
        .headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("token=none"), "{}", cookie);
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=10"));
    Ok(())
}

#[tokio::test]
async fn unknown_paths_use_the_error_envelope() -> Result<()> {
    let state = offline_state(test_config());
    let res = call(&state, Method::GET, "/uploads/missing.jpg", None, None).await?;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body, json!({ "success": false, "error": "Not found" }));
    Ok(())
}

#[tokio::test]
async fn rate_limit_rejects_bursts() -> Result<()> {
    let mut config = test_config();
    config.api.enable_rate_limiting = true;
    config.api.rate_limit_requests = 2;
    config.api.rate_limit_window_secs = 600;
    let state = offline_state(config);
    let router = devcamper_api::server::app(state);

    let get = || {
        axum::http::Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9")
            .body(axum::body::Body::empty())
    };

    assert_eq!(common::send(router.clone(), get()?).await?.status, StatusCode::OK);
    assert_eq!(common::send(router.clone(), get()?).await?.status, StatusCode::OK);

    let res = common::send(router, get()?).await?;
    assert_eq!(res.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers.contains_key(header::RETRY_AFTER));
    assert_eq!(res.body["success"], false);
    Ok(())
}
