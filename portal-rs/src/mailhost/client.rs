//! DirectAdmin-style control panel client
//!
//! All requests go to `POST {base_url}/CMD_API_POP` as
//! `application/x-www-form-urlencoded` with HTTP Basic auth using the
//! configured service account. Transport failures (connect, timeout,
//! TLS, any body without the panel's `error` field) surface as
//! `RemoteTransport` and are never folded into the panel's own error
//! format.

use std::time::Duration;

use tracing::{debug, warn};

use super::response::{parse_response, HostResponse};
use super::{MailHost, RemoteExistence};
use crate::config::MailHostConfig;
use crate::error::{PortalError, Result};

pub struct DirectAdminClient {
    base_url: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl DirectAdminClient {
    pub fn new(config: &MailHostConfig) -> Result<Self> {
        if config.accept_invalid_certs {
            warn!(
                "TLS certificate validation disabled for mail host {}",
                config.base_url
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| PortalError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            http,
        })
    }

    /// Send one command to the panel and parse its response.
    async fn command(&self, form: &[(&str, &str)]) -> Result<HostResponse> {
        let url = format!("{}/CMD_API_POP", self.base_url);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .form(form)
            .send()
            .await
            .map_err(|e| PortalError::RemoteTransport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortalError::RemoteTransport(e.to_string()))?;

        let parsed = parse_response(&body);

        // Only a body carrying the panel's `error` field is a panel
        // verdict; anything else (gateway error pages, HTML) is a
        // transport-level problem.
        if !parsed.recognized {
            return Err(PortalError::RemoteTransport(format!(
                "mail host returned HTTP {} with an unrecognized body",
                status
            )));
        }

        debug!("Mail host response ({}): {} bytes", status, body.len());
        Ok(parsed)
    }
}

#[async_trait::async_trait]
impl MailHost for DirectAdminClient {
    async fn create_mailbox(
        &self,
        local_part: &str,
        domain: &str,
        password: &str,
        quota_mb: u32,
    ) -> Result<()> {
        let quota = quota_mb.to_string();
        let response = self
            .command(&[
                ("action", "create"),
                ("domain", domain),
                ("user", local_part),
                ("passwd", password),
                ("passwd2", password),
                ("quota", &quota),
                // 0 = unlimited send limit
                ("limit", "0"),
            ])
            .await?;

        if response.success {
            Ok(())
        } else {
            Err(PortalError::RemoteCreateFailed(response.message_or_default()))
        }
    }

    async fn delete_mailbox(&self, local_part: &str, domain: &str) -> Result<()> {
        let response = self
            .command(&[
                ("action", "delete"),
                ("domain", domain),
                ("user", local_part),
            ])
            .await?;

        if response.success {
            Ok(())
        } else {
            Err(PortalError::RemoteDeleteFailed(response.message_or_default()))
        }
    }

    async fn mailbox_exists(&self, local_part: &str, domain: &str) -> RemoteExistence {
        let response = match self.command(&[("action", "list"), ("domain", domain)]).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Mail host existence check failed for {}@{}: {}", local_part, domain, e);
                return RemoteExistence::Unknown;
            }
        };

        if !response.success {
            warn!(
                "Mail host refused listing for {}: {}",
                domain,
                response.message_or_default()
            );
            return RemoteExistence::Unknown;
        }

        if response.list.iter().any(|name| name == local_part) {
            RemoteExistence::Exists
        } else {
            RemoteExistence::Absent
        }
    }

    async fn test_connection(&self) -> bool {
        let url = format!("{}/CMD_API_SHOW_USER_CONFIG", self.base_url);

        match self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Mail host connection test failed: {}", e);
                false
            }
        }
    }
}
