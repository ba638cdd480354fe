/// Bearer-token authorization gate for Axum
///
/// [`require_bearer`] validates the `Authorization: Bearer <token>` header of
/// every request it guards and binds the verified user ID to the request as an
/// [`AuthContext`]. It never consults the user directory: a correctly signed,
/// unexpired token is sufficient.
///
/// # Request Extensions
///
/// After successful authentication the gate adds:
/// - `AuthContext`: the verified owner identity
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Router};
/// use chrono::Duration;
/// use taskvault_shared::auth::jwt::TokenIssuer;
/// use taskvault_shared::auth::middleware::{require_bearer, AuthContext};
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("user {}", auth.user_id())
/// }
///
/// let issuer = Arc::new(TokenIssuer::new("secret-key-at-least-32-bytes-long", Duration::minutes(30)));
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn_with_state(issuer, require_bearer));
/// ```

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

use super::jwt::TokenIssuer;

/// Verified identity of the caller
///
/// Only the gate (inside this crate) can build one, so holding an
/// `AuthContext` proves the request passed token verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    user_id: i64,
}

impl AuthContext {
    pub(crate) fn verified(user_id: i64) -> Self {
        Self { user_id }
    }

    /// Authenticated owner ID
    pub fn user_id(&self) -> i64 {
        self.user_id
    }
}

/// Error type for the authorization gate
///
/// Both variants render the same message so a client cannot tell a missing
/// header from a forged or expired token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No usable bearer credentials on the request
    #[error("Authentication required")]
    MissingCredentials,

    /// Token failed verification
    #[error("Authentication required")]
    InvalidToken,
}

/// The one message every gate rejection carries
pub const UNAUTHORIZED_MESSAGE: &str = "Authentication required";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "unauthorized",
            "message": self.to_string(),
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value
fn bearer_token(value: Option<&str>) -> Option<&str> {
    let token = value?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware guarding routes that require a bearer token
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - the Authorization header is missing or not valid UTF-8
/// - the scheme is not `Bearer ` or the token is empty
/// - the token fails verification (bad signature, wrong algorithm or issuer,
///   missing claims, expired)
pub async fn require_bearer(
    State(issuer): State<Arc<TokenIssuer>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = bearer_token(header_value).ok_or_else(|| {
        tracing::debug!("Missing or malformed Authorization header");
        AuthError::MissingCredentials
    })?;

    let user_id = issuer.verify(token, Utc::now()).map_err(|_| {
        tracing::debug!("Rejected bearer token");
        AuthError::InvalidToken
    })?;

    req.extensions_mut().insert(AuthContext::verified(user_id));

    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}
