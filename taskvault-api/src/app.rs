/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskvault_api::{app::AppState, config::Config};
/// use taskvault_shared::store::postgres::PgStore;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = taskvault_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Duration;
use std::{any::Any, sync::Arc, time};
use taskvault_shared::{
    auth::{jwt::TokenIssuer, middleware::require_bearer},
    directory::IdentityDirectory,
    store::{Store, TaskStore, UserStore},
    tasks::TaskService,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Requests running longer than this are answered with 408
pub const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is reference-counted, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Registration and login
    pub directory: IdentityDirectory,

    /// Owner-scoped task operations
    pub tasks: TaskService,

    /// Bearer token issuer, shared with the auth gate
    pub tokens: Arc<TokenIssuer>,

    /// Backend handle for health checks
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services over one store backend
    pub fn new<S: Store + 'static>(store: Arc<S>, config: Config) -> Self {
        let users: Arc<dyn UserStore> = store.clone();
        let tasks: Arc<dyn TaskStore> = store.clone();
        let tokens = TokenIssuer::new(
            config.jwt.secret.clone(),
            Duration::minutes(config.jwt.expiry_minutes),
        );

        Self {
            directory: IdentityDirectory::new(users, config.password_policy),
            tasks: TaskService::new(tasks),
            tokens: Arc::new(tokens),
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health            # Health check (public)
/// ├── POST   /register          # Create account (public)
/// ├── POST   /login             # Get bearer token (public)
/// └── /api/tasks                # Bearer token required
///     ├── GET    /              # List own tasks
///     ├── POST   /              # Create task
///     ├── PUT    /:id           # Partial update
///     └── DELETE /:id           # Delete
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Security headers
/// 2. CORS
/// 3. Request ID assignment (`x-request-id`, UUID)
/// 4. Tracing span per request, tagged with the request ID
/// 5. Request ID propagation to the response
/// 6. Panic recovery (500 JSON)
/// 7. Timeout (408 after 10s)
/// 8. Bearer authentication (task routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let task_routes = Router::new()
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_bearer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .merge(public_routes)
        .nest("/api", task_routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}

fn handle_panic(_payload: Box<dyn Any + Send + 'static>) -> Response {
    ApiError::InternalError("request handler panicked".to_string()).into_response()
}
