//! REST API module for portal-rs
//!
//! HTTP endpoints for authentication, email provisioning and admin
//! management

pub mod admin;
pub mod auth;
pub mod emails;
pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::ApiServer;
