//! Row types shared across the store and the API layer.

use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// A portal account (not a mailbox): someone who logs into the portal.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub is_active: bool,
    pub can_create_emails: bool,
    pub created_at: String,
}

/// A domain mailboxes may be provisioned under.
#[derive(Debug, Clone, Serialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: String,
}

/// Mailbox lifecycle status. Deletion is a soft delete: the row stays
/// for audit purposes with status `deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailboxStatus {
    Active,
    Suspended,
    Deleted,
}

impl MailboxStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "suspended" => Some(Self::Suspended),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Deleted => "deleted",
        }
    }
}

/// A provisioned mailbox, tracked locally and existing for real on the
/// external mail host.
#[derive(Debug, Clone, Serialize)]
pub struct Mailbox {
    pub id: String,
    /// Full address, `local_part@domain`, globally unique.
    pub address: String,
    pub local_part: String,
    pub domain_id: String,
    pub owner_id: String,
    pub quota_mb: i64,
    pub status: MailboxStatus,
    pub created_at: String,
}

/// Partial update applied through the admin user-update path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    pub display_name: Option<String>,
    pub is_active: Option<bool>,
    pub can_create_emails: Option<bool>,
    pub role: Option<Role>,
}
