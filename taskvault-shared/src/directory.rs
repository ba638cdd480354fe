/// Identity directory: registration and credential checks
///
/// Owns the rules for creating accounts (field validation, password policy,
/// uniqueness) and for resolving a login identity to a user. Passwords are
/// hashed and verified on tokio's blocking pool since Argon2id is deliberately
/// slow.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskvault_shared::auth::password::PasswordPolicy;
/// use taskvault_shared::directory::{IdentityDirectory, Registration};
/// use taskvault_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let directory = IdentityDirectory::new(Arc::new(MemoryStore::new()), PasswordPolicy::Basic);
///
/// let user = directory
///     .register(Registration {
///         username: "tester".to_string(),
///         email: "Tester@Example.com".to_string(),
///         password: "password123".to_string(),
///     })
///     .await?;
///
/// let same = directory.authenticate("tester@example.com", "password123").await?;
/// assert_eq!(user.id, same.id);
/// # Ok(())
/// # }
/// ```

use std::sync::{Arc, LazyLock};

use serde::Deserialize;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::auth::password::{hash_password, verify_password, PasswordError, PasswordPolicy};
use crate::models::user::{CreateUser, User};
use crate::store::{StoreError, UserStore};
use crate::validation::{
    field_errors, is_valid_email, is_valid_username_charset, normalize_email, FieldError,
};

/// Hash verified when no account matches, so misses cost as much as hits
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("taskvault-timing-equalizer").ok());

/// Which unique field collided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityField {
    Username,
    Email,
}

impl IdentityField {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityField::Username => "username",
            IdentityField::Email => "email",
        }
    }
}

/// Directory error types
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// One or more registration fields were rejected
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Username or email already registered
    #[error("{} already registered", .0.as_str())]
    DuplicateIdentity(IdentityField),

    /// Unknown identity or wrong password
    #[error("Invalid credentials")]
    AuthenticationFailed,

    /// Hashing failed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Backend failure
    #[error(transparent)]
    Store(StoreError),

    /// Blocking task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate("email") => DirectoryError::DuplicateIdentity(IdentityField::Email),
            StoreError::Duplicate(_) => DirectoryError::DuplicateIdentity(IdentityField::Username),
            other => DirectoryError::Store(other),
        }
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 3, max = 30, message = "Username must be 3-30 characters"))]
    pub username: String,

    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: String,

    pub password: String,
}

impl Registration {
    /// Collects every field problem at once
    fn check(&self, policy: PasswordPolicy) -> Result<(), Vec<FieldError>> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };

        if !self.username.is_empty() && !is_valid_username_charset(&self.username) {
            errors.push(FieldError::new(
                "username",
                "Username may only contain letters, digits, '_', '.' and '-'",
            ));
        }

        if !is_valid_email(&self.email) {
            errors.push(FieldError::new("email", "Invalid email format"));
        }

        if let Err(reason) = policy.check(&self.password) {
            errors.push(FieldError::new("password", reason));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            Err(errors)
        }
    }
}

/// Account registry over a [`UserStore`]
#[derive(Clone)]
pub struct IdentityDirectory {
    users: Arc<dyn UserStore>,
    policy: PasswordPolicy,
}

impl IdentityDirectory {
    pub fn new(users: Arc<dyn UserStore>, policy: PasswordPolicy) -> Self {
        Self { users, policy }
    }

    /// Creates a new account
    ///
    /// # Errors
    ///
    /// - `Validation` with every rejected field
    /// - `DuplicateIdentity` if the username or email is taken, including when
    ///   a concurrent registration wins the race at insert time
    pub async fn register(&self, registration: Registration) -> Result<User, DirectoryError> {
        registration
            .check(self.policy)
            .map_err(DirectoryError::Validation)?;

        let email = normalize_email(&registration.email);

        if self.users.user_by_username(&registration.username).await?.is_some() {
            debug!("Registration rejected: username taken");
            return Err(DirectoryError::DuplicateIdentity(IdentityField::Username));
        }
        if self.users.user_by_email(&email).await?.is_some() {
            debug!("Registration rejected: email taken");
            return Err(DirectoryError::DuplicateIdentity(IdentityField::Email));
        }

        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| DirectoryError::Internal(e.to_string()))??;

        let user = self
            .users
            .insert_user(CreateUser {
                username: registration.username,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, "User registered");
        Ok(user)
    }

    /// Resolves `identity` (email or username) and checks `password`
    ///
    /// An identity in email format is matched case-insensitively against
    /// emails; anything else is matched exactly against usernames.
    pub async fn authenticate(&self, identity: &str, password: &str) -> Result<User, DirectoryError> {
        let user = if is_valid_email(identity) {
            self.users.user_by_email(&normalize_email(identity)).await?
        } else {
            self.users.user_by_username(identity).await?
        };

        let password = password.to_string();
        let (user, matched) = match user {
            Some(user) => {
                let hash = user.password_hash.clone();
                let matched = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                    .await
                    .map_err(|e| DirectoryError::Internal(e.to_string()))?;
                (Some(user), matched)
            }
            None => {
                tokio::task::spawn_blocking(move || {
                    if let Some(dummy) = DUMMY_HASH.as_deref() {
                        verify_password(&password, dummy);
                    }
                })
                .await
                .map_err(|e| DirectoryError::Internal(e.to_string()))?;
                (None, false)
            }
        };

        match user {
            Some(user) if matched => {
                info!(user_id = user.id, "User authenticated");
                Ok(user)
            }
            _ => {
                warn!("Failed login attempt");
                Err(DirectoryError::AuthenticationFailed)
            }
        }
    }
}
