/// JWT token generation and validation module
///
/// Access tokens are HS256-signed JWTs carrying the user ID, issue time,
/// expiry and a fixed issuer. Verification takes the current time as an
/// argument so expiry behaviour is deterministic under test.
///
/// # Security
///
/// - **Algorithm**: HS256 only. A token whose header declares any other
///   algorithm is rejected before its signature is considered.
/// - **Expiration**: valid while `now < exp`, no leeway.
/// - **Errors**: every verification failure collapses into
///   [`JwtError::InvalidToken`], so callers cannot tell an expired token from a
///   forged one.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use taskvault_shared::auth::jwt::TokenIssuer;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let issuer = TokenIssuer::new("your-secret-key-at-least-32-bytes", Duration::minutes(30));
/// let now = Utc::now();
///
/// let issued = issuer.issue(42, now)?;
/// assert_eq!(issuer.verify(&issued.token, now)?, 42);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer written into and required on every token
pub const TOKEN_ISSUER: &str = "taskvault";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token is malformed, forged, expired, or otherwise unacceptable
    #[error("Invalid token")]
    InvalidToken,
}

/// JWT claims structure
///
/// - `user_id`: owner identity
/// - `iss`: always "taskvault"
/// - `iat`: issued at (Unix seconds)
/// - `exp`: expiry (Unix seconds), `iat + ttl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user ID
    pub user_id: i64,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims for `user_id` issued at `issued_at` and living for `ttl`
    pub fn new(user_id: i64, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();

        Self {
            user_id,
            iss: TOKEN_ISSUER.to_string(),
            iat,
            exp: iat + ttl.num_seconds(),
        }
    }

    /// Checks whether the claims have expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Creates a JWT token from claims
///
/// Signs the token using HS256 with the provided secret.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token at time `now` and extracts claims
///
/// Verifies, in order:
/// - The header declares HS256
/// - The signature matches `secret`
/// - `exp`, `iat` and `iss` are present and the issuer is "taskvault"
/// - `now` is strictly before `exp`
///
/// # Errors
///
/// Returns `JwtError::InvalidToken` for every failure. The underlying reason is
/// logged at debug level only.
pub fn validate_token(token: &str, secret: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iat", "iss"]);
    // Expiry is checked below against the caller's clock
    validation.validate_exp = false;
    validation.validate_nbf = false;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        tracing::debug!("Token rejected: {:?}", e.kind());
        JwtError::InvalidToken
    })?;

    if token_data.claims.is_expired_at(now) {
        tracing::debug!("Token rejected: expired at {}", token_data.claims.exp);
        return Err(JwtError::InvalidToken);
    }

    Ok(token_data.claims)
}

/// A freshly minted access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Encoded JWT
    pub token: String,

    /// Seconds until expiry
    pub expires_in: i64,
}

/// Token issuer/verifier bound to the server secret and token lifetime
///
/// Read-only after construction; share it behind an `Arc`.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// Creates an issuer with the given signing secret and token lifetime
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `user_id` at time `now`
    pub fn issue(&self, user_id: i64, now: DateTime<Utc>) -> Result<IssuedToken, JwtError> {
        let claims = Claims::new(user_id, now, self.ttl);
        let token = create_token(&claims, &self.secret)?;

        Ok(IssuedToken {
            token,
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Verifies `token` at time `now` and returns the user ID it carries
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<i64, JwtError> {
        validate_token(token, &self.secret, now).map(|claims| claims.user_id)
    }
}
