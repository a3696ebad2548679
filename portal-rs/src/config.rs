use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub mailhost: MailHostConfig,
    pub provisioning: ProvisioningConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub listen_addr: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiration_hours: u64,
}

/// Connection settings for the external mail-hosting control panel.
///
/// The credential is a fixed service account, not an end-user login.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailHostConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
    /// Tolerate a self-signed certificate on the control panel.
    /// Must be enabled explicitly; never the default.
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvisioningConfig {
    pub default_quota_mb: u32,
    pub password_length: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::error::PortalError::Config(e.to_string()))?;

        toml::from_str(&content).map_err(|e| crate::error::PortalError::Config(e.to_string()))
    }

    pub fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: "0.0.0.0:8080".to_string(),
            },
            storage: StorageConfig {
                database_url: "sqlite://portal.db".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                token_expiration_hours: 24,
            },
            mailhost: MailHostConfig {
                base_url: "https://localhost:2222".to_string(),
                username: "admin".to_string(),
                password: "admin".to_string(),
                timeout_secs: 15,
                accept_invalid_certs: false,
            },
            provisioning: ProvisioningConfig {
                default_quota_mb: 1024,
                password_length: 16,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
