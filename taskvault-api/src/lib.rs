//! # TaskVault API Server Library
//!
//! HTTP layer of TaskVault: routing, request and response shapes, and the
//! mapping from domain errors to status codes. Business rules live in
//! `taskvault-shared`.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: HTTP-level layers (security headers)
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
