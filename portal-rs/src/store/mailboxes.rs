//! Mailbox queries
//!
//! The UNIQUE constraint on `address` is what actually guarantees one
//! mailbox per address; every caller-level existence check races.

use tracing::info;

use super::types::{Mailbox, MailboxStatus};
use super::{is_unique_violation, Store};
use crate::error::{PortalError, Result};

type MailboxRow = (String, String, String, String, String, i64, String, String);

fn row_to_mailbox(row: MailboxRow) -> Result<Mailbox> {
    let (id, address, local_part, domain_id, owner_id, quota_mb, status, created_at) = row;
    let status = MailboxStatus::from_str(&status).ok_or_else(|| {
        PortalError::Internal(format!("unknown status in mailboxes table: {}", status))
    })?;

    Ok(Mailbox {
        id,
        address,
        local_part,
        domain_id,
        owner_id,
        quota_mb,
        status,
        created_at,
    })
}

const MAILBOX_COLUMNS: &str =
    "id, address, local_part, domain_id, owner_id, quota_mb, status, created_at";

impl Store {
    /// Insert a mailbox row. A unique-constraint hit on the address is
    /// reported as `AlreadyExists` so the workflow can treat a lost
    /// insert race the same as a failed advisory check.
    pub async fn insert_mailbox(&self, mailbox: &Mailbox) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO mailboxes (id, address, local_part, domain_id, owner_id, quota_mb, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&mailbox.id)
        .bind(&mailbox.address)
        .bind(&mailbox.local_part)
        .bind(&mailbox.domain_id)
        .bind(&mailbox.owner_id)
        .bind(mailbox.quota_mb)
        .bind(mailbox.status.as_str())
        .bind(&mailbox.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortalError::AlreadyExists(format!("mailbox {}", mailbox.address))
            } else {
                e.into()
            }
        })?;

        info!("Mailbox {} recorded", mailbox.address);
        Ok(())
    }

    /// Whether any row holds the address, soft-deleted ones included:
    /// a deleted address is retired, not recyclable.
    pub async fn mailbox_address_exists(&self, address: &str) -> Result<bool> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM mailboxes WHERE address = ?")
                .bind(address)
                .fetch_one(&self.db)
                .await?;

        Ok(count.0 > 0)
    }

    pub async fn find_mailbox(&self, id: &str) -> Result<Option<Mailbox>> {
        let row = sqlx::query_as::<_, MailboxRow>(&format!(
            "SELECT {} FROM mailboxes WHERE id = ?",
            MAILBOX_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(row_to_mailbox).transpose()
    }

    pub async fn list_mailboxes_by_owner(&self, owner_id: &str) -> Result<Vec<Mailbox>> {
        let rows = sqlx::query_as::<_, MailboxRow>(&format!(
            "SELECT {} FROM mailboxes WHERE owner_id = ? ORDER BY created_at DESC",
            MAILBOX_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(row_to_mailbox).collect()
    }

    pub async fn list_all_mailboxes(&self) -> Result<Vec<Mailbox>> {
        let rows = sqlx::query_as::<_, MailboxRow>(&format!(
            "SELECT {} FROM mailboxes ORDER BY created_at DESC",
            MAILBOX_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(row_to_mailbox).collect()
    }

    pub async fn set_mailbox_status(&self, id: &str, status: MailboxStatus) -> Result<()> {
        let result = sqlx::query("UPDATE mailboxes SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound(format!("mailbox {}", id)));
        }

        Ok(())
    }

    pub async fn count_active_mailboxes_by_owner(&self, owner_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM mailboxes WHERE owner_id = ? AND status != 'deleted'",
        )
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count.0)
    }

    /// All mailbox rows held by an owner, soft-deleted audit rows
    /// included. They keep their owner reference, so they block
    /// account deletion like live ones.
    pub async fn count_mailboxes_by_owner(&self, owner_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mailboxes WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count.0)
    }

    pub async fn count_mailboxes_by_domain(&self, domain_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mailboxes WHERE domain_id = ?")
            .bind(domain_id)
            .fetch_one(&self.db)
            .await?;

        Ok(count.0)
    }

    pub async fn count_mailboxes(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mailboxes")
            .fetch_one(&self.db)
            .await?;

        Ok(count.0)
    }
}
