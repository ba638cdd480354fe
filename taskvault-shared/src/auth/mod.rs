/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing, verification and policy
/// - [`jwt`]: HS256 bearer token issuance and verification
/// - [`middleware`]: Axum gate binding a verified [`AuthContext`] to requests
///
/// # Example
///
/// ```no_run
/// use chrono::{Duration, Utc};
/// use taskvault_shared::auth::jwt::TokenIssuer;
/// use taskvault_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash));
///
/// let issuer = TokenIssuer::new("secret-key-at-least-32-bytes-long", Duration::minutes(30));
/// let issued = issuer.issue(7, Utc::now())?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;

pub use middleware::AuthContext;
