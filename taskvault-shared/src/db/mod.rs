/// Database layer for TaskVault
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded schema migrations
///
/// Queries themselves live on the models and are reached through
/// [`PgStore`](crate::store::postgres::PgStore).

pub mod migrations;
pub mod pool;
