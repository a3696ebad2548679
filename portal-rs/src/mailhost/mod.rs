//! External mail-hosting control panel integration
//!
//! The control panel (DirectAdmin-style) exposes mailbox CRUD over
//! HTTP POST with form-encoded bodies and an ad-hoc URL-encoded
//! response format. This module keeps that integration behind the
//! [`MailHost`] trait so the provisioning workflow takes a test double
//! instead of a live panel.

pub mod client;
pub mod response;

pub use client::DirectAdminClient;
pub use response::{parse_response, HostResponse};

use crate::error::Result;

/// Outcome of a remote existence check. `Unknown` means the panel
/// could not be reached or answered unparseably; callers must not
/// treat it as `Absent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteExistence {
    Exists,
    Absent,
    Unknown,
}

/// Operations against the external mail host.
#[async_trait::async_trait]
pub trait MailHost: Send + Sync {
    /// Create the mailbox `local_part@domain` with the given password
    /// and quota (MB).
    async fn create_mailbox(
        &self,
        local_part: &str,
        domain: &str,
        password: &str,
        quota_mb: u32,
    ) -> Result<()>;

    /// Delete the mailbox `local_part@domain`.
    async fn delete_mailbox(&self, local_part: &str, domain: &str) -> Result<()>;

    /// Check whether `local_part@domain` exists on the mail host.
    async fn mailbox_exists(&self, local_part: &str, domain: &str) -> RemoteExistence;

    /// Whether the control panel is reachable with the configured
    /// service credential.
    async fn test_connection(&self) -> bool;
}
