/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /register` - Create an account
/// - `POST /login` - Exchange credentials for a bearer token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskvault_shared::{directory::Registration, models::user::UserProfile, validation::field_errors};
use validator::Validate;

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email address
    #[validate(length(min = 1, message = "Identity is required"))]
    pub identity: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Always "Bearer"
    pub token_type: &'static str,

    /// Token lifetime in seconds
    pub expires_in: i64,

    pub token: String,

    pub user: UserProfile,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /register
/// Content-Type: application/json
///
/// {
///   "username": "tester",
///   "email": "tester@example.com",
///   "password": "password123"
/// }
/// ```
///
/// # Response
///
/// `201 Created`:
///
/// ```json
/// { "user_id": 1, "username": "tester", "email": "tester@example.com" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or validation failed
/// - `409 Conflict`: Username or email already registered
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(req) = payload?;

    let user = state.directory.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            username: user.username,
            email: user.email,
        }),
    ))
}

/// Login endpoint
///
/// `identity` may be a username (exact match) or an email address (any
/// casing).
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/json
///
/// {
///   "identity": "tester@example.com",
///   "password": "password123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "token_type": "Bearer",
///   "expires_in": 1800,
///   "token": "eyJ...",
///   "user": { "id": 1, "username": "tester", "email": "tester@example.com" }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed body or empty fields
/// - `401 Unauthorized`: Invalid credentials
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = payload?;

    req.validate()
        .map_err(|e| ApiError::ValidationError(field_errors(&e)))?;

    let user = state
        .directory
        .authenticate(&req.identity, &req.password)
        .await?;

    let issued = state.tokens.issue(user.id, Utc::now())?;

    Ok(Json(LoginResponse {
        token_type: "Bearer",
        expires_in: issued.expires_in,
        token: issued.token,
        user: UserProfile::from(&user),
    }))
}
