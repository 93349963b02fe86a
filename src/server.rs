//! Router assembly and the serve loop.

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, State},
    handler::HandlerWithoutStateExt,
    http::{header, HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post, put, MethodRouter},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::database::models::Role;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::{auth, bootcamps, courses, reviews, users};
use crate::middleware::{authorize, protect, rate_limit_middleware, ClientRateLimiter};
use crate::services::{Geocoder, Mailer, MapQuestGeocoder, SmtpMailer};

const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];
const REVIEWERS: &[Role] = &[Role::User, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub geocoder: Arc<dyn Geocoder>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig, geocoder: Arc<dyn Geocoder>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            geocoder,
            mailer,
        }
    }
}

/// Token gate only
fn protected(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), protect))
}

/// Token gate followed by a role gate
fn guarded(state: &AppState, roles: &'static [Role], route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    protected(state, route.route_layer(from_fn_with_state(roles, authorize)))
}

pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(bootcamp_routes(&state))
        .merge(course_routes(&state))
        .merge(review_routes(&state))
        .merge(auth_routes(&state))
        .merge(user_routes(&state));

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", api)
        .fallback_service(
            ServeDir::new(&state.config.uploads.public_dir).not_found_service(not_found.into_service()),
        );

    let router = match ClientRateLimiter::from_config(&state.config.api) {
        Some(limiter) => router.layer(from_fn_with_state(limiter, rate_limit_middleware)),
        None => router,
    };

    router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.api.max_request_size_bytes))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn bootcamp_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/bootcamps",
            get(bootcamps::get_bootcamps).merge(guarded(state, PUBLISHERS, post(bootcamps::create_bootcamp))),
        )
        .route(
            "/bootcamps/:id",
            get(bootcamps::get_bootcamp).merge(guarded(
                state,
                PUBLISHERS,
                put(bootcamps::update_bootcamp).delete(bootcamps::delete_bootcamp),
            )),
        )
        .route(
            "/bootcamps/radius/:zipcode/:distance",
            get(bootcamps::get_bootcamps_in_radius),
        )
        .route(
            "/bootcamps/:id/photo",
            guarded(state, PUBLISHERS, put(bootcamps::bootcamp_photo_upload)),
        )
        // Nested child collections reuse the bootcamp `:id` segment
        .route(
            "/bootcamps/:id/courses",
            get(courses::get_bootcamp_courses).merge(guarded(state, PUBLISHERS, post(courses::add_course))),
        )
        .route(
            "/bootcamps/:id/reviews",
            get(reviews::get_bootcamp_reviews).merge(guarded(state, REVIEWERS, post(reviews::add_review))),
        )
}

fn course_routes(state: &AppState) -> Router<AppState> {
    Router::new().route("/courses", get(courses::get_courses)).route(
        "/courses/:id",
        get(courses::get_course).merge(guarded(
            state,
            PUBLISHERS,
            put(courses::update_course).delete(courses::delete_course),
        )),
    )
}

fn review_routes(state: &AppState) -> Router<AppState> {
    Router::new().route("/reviews", get(reviews::get_reviews)).route(
        "/reviews/:id",
        get(reviews::get_review).merge(guarded(
            state,
            REVIEWERS,
            put(reviews::update_review).delete(reviews::delete_review),
        )),
    )
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/me", protected(state, get(auth::get_me)))
        .route("/auth/forgotpassword", post(auth::forgot_password))
        .route("/auth/resetpassword/:resettoken", put(auth::reset_password))
        .route("/auth/updatedetails", protected(state, put(auth::update_details)))
        .route("/auth/updatepassword", protected(state, put(auth::update_password)))
}

/// Admin-only account management
fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(users::get_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route_layer(from_fn_with_state(ADMINS, authorize))
        .route_layer(from_fn_with_state(state.clone(), protect))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.is_production() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "DevCamper API",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment,
            "endpoints": {
                "bootcamps": "/api/v1/bootcamps[/:id] (writes: publisher, admin)",
                "radius": "/api/v1/bootcamps/radius/:zipcode/:distance",
                "courses": "/api/v1/courses[/:id], /api/v1/bootcamps/:id/courses",
                "reviews": "/api/v1/reviews[/:id], /api/v1/bootcamps/:id/reviews",
                "auth": "/api/v1/auth/*",
                "users": "/api/v1/users[/:id] (admin)",
                "uploads": "/uploads/*",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

/// Connect the store and outbound collaborators, then serve until shutdown
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("connecting to the database")?;
    DatabaseManager::migrate(&pool).await.context("running migrations")?;

    let geocoder = MapQuestGeocoder::new(&config.geocoder).context("configuring the geocoder")?;
    let mailer = SmtpMailer::new(&config.mail).context("configuring the mailer")?;

    let port = config.api.port;
    let state = AppState::new(pool, config, Arc::new(geocoder), Arc::new(mailer));
    tracing::info!("Starting DevCamper API in {:?} mode", state.config.environment);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
