/// Middleware modules for the API server
///
/// Bearer-token authentication lives in the shared crate
/// (`taskvault_shared::auth::middleware`); this module holds the purely
/// HTTP-level layers:
/// - Security headers

pub mod security;
