/// Password hashing module using Argon2id
///
/// Passwords are hashed with Argon2id and a fresh random salt per call. The
/// output is a PHC string, so the salt and cost parameters travel with the
/// digest and verification needs nothing else.
///
/// # Parameters
///
/// - **Memory**: 19 MiB (19456 KiB)
/// - **Iterations**: 2 passes
/// - **Parallelism**: 1 lane
/// - **Output**: 32-byte hash
///
/// These land at roughly 50–100 ms per hash on a typical server core.
///
/// # Example
///
/// ```
/// use taskvault_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("super_secret_password_123")?;
///
/// assert!(verify_password("super_secret_password_123", &hash));
/// assert!(!verify_password("wrong_password", &hash));
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use serde::{Deserialize, Serialize};

/// Minimum accepted password length (characters)
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum accepted password length (characters)
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(19456)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password using Argon2id
///
/// # Returns
///
/// PHC string format hash (includes algorithm, parameters, salt, and hash):
///
/// ```text
/// $argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHRzYWx0$hash...
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` only if the parameters are rejected or the
/// hasher itself fails. Callers treat this as an internal error.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// The comparison is constant-time. A mismatch returns `false`; so does a
/// digest that cannot be parsed, since a corrupt stored hash must never let
/// anyone in.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Stored password hash could not be parsed: {}", e);
            return false;
        }
    };

    // Parameters are read from the PHC string
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Password acceptance rules applied at registration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordPolicy {
    /// Length only: 8 to 128 characters
    #[default]
    Basic,

    /// Length plus uppercase, lowercase, digit and special character
    Strong,
}

impl PasswordPolicy {
    /// Parses a policy name (`basic` or `strong`, case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(PasswordPolicy::Basic),
            "strong" => Some(PasswordPolicy::Strong),
            _ => None,
        }
    }

    /// Checks a candidate password against this policy
    ///
    /// Returns a human-readable reason on rejection.
    ///
    /// # Example
    ///
    /// ```
    /// use taskvault_shared::auth::password::PasswordPolicy;
    ///
    /// assert!(PasswordPolicy::Basic.check("pass12345").is_ok());
    /// assert!(PasswordPolicy::Strong.check("pass12345").is_err());
    /// assert!(PasswordPolicy::Strong.check("MyP@ssw0rd!").is_ok());
    /// ```
    pub fn check(&self, password: &str) -> Result<(), String> {
        let length = password.chars().count();
        if length < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ));
        }
        if length > MAX_PASSWORD_LENGTH {
            return Err(format!(
                "Password must not exceed {} characters",
                MAX_PASSWORD_LENGTH
            ));
        }

        if *self == PasswordPolicy::Basic {
            return Ok(());
        }

        if !password.chars().any(|c| c.is_uppercase()) {
            return Err("Password must contain at least one uppercase letter".to_string());
        }

        if !password.chars().any(|c| c.is_lowercase()) {
            return Err("Password must contain at least one lowercase letter".to_string());
        }

        if !password.chars().any(|c| c.is_numeric()) {
            return Err("Password must contain at least one digit".to_string());
        }

        if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
            return Err("Password must contain at least one special character".to_string());
        }

        Ok(())
    }
}
