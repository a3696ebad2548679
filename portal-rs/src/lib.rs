//! portal-rs: email account provisioning portal
//!
//! A web portal where registered users provision email mailboxes on
//! approved domains. Mailboxes are created for real on an external
//! mail-hosting control panel (DirectAdmin-style HTTP API) and tracked
//! locally for ownership, quota and audit purposes.
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`password`]: Cryptographically secure password generation
//! - [`mailhost`]: Client for the external control panel API
//! - [`store`]: SQLite persistence (users, domains, mailboxes)
//! - [`provisioning`]: The create/delete mailbox workflow
//! - [`access`]: Role and permission predicates
//! - [`api`]: REST API (axum)

pub mod access;
pub mod api;
pub mod config;
pub mod error;
pub mod mailhost;
pub mod password;
pub mod provisioning;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{PortalError, Result};
