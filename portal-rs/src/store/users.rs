//! Account queries and credential handling
//!
//! Passwords are hashed with Argon2 before storage; verification never
//! reveals whether the account or the password was wrong.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::types::{Account, AccountUpdate, Role};
use super::{is_unique_violation, Store};
use crate::error::{PortalError, Result};

type AccountRow = (String, String, String, String, bool, bool, String);

fn row_to_account(row: AccountRow) -> Result<Account> {
    let (id, email, display_name, role, is_active, can_create_emails, created_at) = row;
    let role = Role::from_str(&role)
        .ok_or_else(|| PortalError::Internal(format!("unknown role in users table: {}", role)))?;

    Ok(Account {
        id,
        email,
        display_name,
        role,
        is_active,
        can_create_emails,
        created_at,
    })
}

const ACCOUNT_COLUMNS: &str =
    "id, email, display_name, role, is_active, can_create_emails, created_at";

impl Store {
    /// Create an account. New registrations start without the
    /// mailbox-creation permission; an admin grants it later.
    /// Emails are normalized to lowercase, like domain names.
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: Role,
    ) -> Result<Account> {
        let email = email.trim().to_lowercase();
        info!("Creating account: {}", email);

        let password_hash = hash_password(password)?;
        let id = Uuid::new_v4().to_string();
        let created_at = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, display_name, role, is_active, can_create_emails, created_at)
            VALUES (?, ?, ?, ?, ?, 1, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(&password_hash)
        .bind(display_name)
        .bind(role.as_str())
        .bind(&created_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                PortalError::AlreadyExists(format!("account {}", email))
            } else {
                e.into()
            }
        })?;

        Ok(Account {
            id,
            email,
            display_name: display_name.to_string(),
            role,
            is_active: true,
            can_create_emails: false,
            created_at,
        })
    }

    pub async fn find_account(&self, id: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(row_to_account).transpose()
    }

    pub async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await?;

        row.map(row_to_account).transpose()
    }

    /// Verify login credentials. Returns the account on success, `None`
    /// on bad credentials or an inactive account. Email casing is
    /// normalized the same way as at registration.
    pub async fn verify_login(&self, email: &str, password: &str) -> Result<Option<Account>> {
        let email = email.trim().to_lowercase();
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT id, password_hash FROM users WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await?;

        let Some((id, stored_hash)) = row else {
            warn!("Login failed: account not found: {}", email);
            return Ok(None);
        };

        let parsed_hash =
            PasswordHash::new(&stored_hash).map_err(|_| PortalError::AuthenticationFailed)?;

        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            warn!("Login failed: invalid password for {}", email);
            return Ok(None);
        }

        let account = self.find_account(&id).await?;
        match account {
            Some(account) if account.is_active => Ok(Some(account)),
            Some(_) => {
                warn!("Login rejected: account deactivated: {}", email);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(row_to_account).collect()
    }

    /// Apply a partial update and return the updated account.
    pub async fn update_account(&self, id: &str, update: &AccountUpdate) -> Result<Account> {
        let existing = self
            .find_account(id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("account {}", id)))?;

        let display_name = update
            .display_name
            .clone()
            .unwrap_or(existing.display_name);
        let is_active = update.is_active.unwrap_or(existing.is_active);
        let can_create_emails = update.can_create_emails.unwrap_or(existing.can_create_emails);
        let role = update.role.unwrap_or(existing.role);

        sqlx::query(
            r#"
            UPDATE users
            SET display_name = ?, is_active = ?, can_create_emails = ?, role = ?
            WHERE id = ?
            "#,
        )
        .bind(&display_name)
        .bind(is_active)
        .bind(can_create_emails)
        .bind(role.as_str())
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(Account {
            display_name,
            is_active,
            can_create_emails,
            role,
            ..existing
        })
    }

    /// Delete an account. Blocked while any mailbox row references it,
    /// soft-deleted audit rows included; their foreign key would make
    /// the delete fail anyway, so report a conflict instead.
    pub async fn delete_account(&self, id: &str) -> Result<()> {
        let owned = self.count_mailboxes_by_owner(id).await?;
        if owned > 0 {
            return Err(PortalError::DependentsExist(format!(
                "account has {} mailbox records",
                owned
            )));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound(format!("account {}", id)));
        }

        info!("Account {} deleted", id);
        Ok(())
    }

    /// Change the account password after verifying the current one.
    pub async fn change_password(&self, id: &str, current: &str, new: &str) -> Result<()> {
        let row = sqlx::query_as::<_, (String,)>("SELECT password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        let Some((stored_hash,)) = row else {
            return Err(PortalError::NotFound(format!("account {}", id)));
        };

        let parsed_hash =
            PasswordHash::new(&stored_hash).map_err(|_| PortalError::AuthenticationFailed)?;

        if Argon2::default()
            .verify_password(current.as_bytes(), &parsed_hash)
            .is_err()
        {
            warn!("Password change rejected: current password mismatch for {}", id);
            return Err(PortalError::AuthenticationFailed);
        }

        let password_hash = hash_password(new)?;

        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(id)
            .execute(&self.db)
            .await?;

        info!("Password changed for account {}", id);
        Ok(())
    }
}

/// Hash a password with Argon2 and a fresh salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PortalError::Internal(format!("failed to hash password: {}", e)))?;

    Ok(password_hash.to_string())
}
