/// Database models for TaskVault
///
/// Each model carries its own PostgreSQL queries. Services reach them through
/// the [`store`](crate::store) traits rather than calling them directly.
///
/// # Models
///
/// - `user`: accounts and credentials
/// - `task`: owner-scoped tasks with optimistic versioning
///
/// # Example
///
/// ```no_run
/// use taskvault_shared::models::user::{User, CreateUser};
/// use taskvault_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     username: "tester".to_string(),
///     email: "tester@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod task;
pub mod user;
