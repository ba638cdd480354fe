//! # TaskVault Shared Library
//!
//! Core of the TaskVault task-tracking API: credentials, tokens, identities,
//! and owner-scoped tasks. The HTTP server in `taskvault-api` is a thin layer
//! over these modules.
//!
//! ## Module Organization
//!
//! - `auth`: password hashing, bearer tokens, and the request gate
//! - `directory`: registration and login
//! - `tasks`: owner-scoped task operations
//! - `store`: persistence traits with PostgreSQL and in-memory backends
//! - `models`: database rows and their queries
//! - `db`: connection pool and migrations
//! - `validation`: shared input checks

pub mod auth;
pub mod db;
pub mod directory;
pub mod models;
pub mod store;
pub mod tasks;
pub mod validation;

/// Current version of the TaskVault shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
