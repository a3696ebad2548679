//! Mailbox provisioning workflow
//!
//! The ordered sequence of checks and side effects that turns a
//! creation request into a live mailbox:
//!
//! permission -> domain active -> local uniqueness -> remote
//! uniqueness -> password -> remote create -> local insert
//!
//! The two stores must never disagree in the direction of "local
//! record exists but remote mailbox does not": no local write happens
//! before the remote creation succeeds, and a failed insert after a
//! successful remote creation triggers exactly one compensating
//! remote delete.

use std::sync::Arc;

use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::access;
use crate::error::{PortalError, Result};
use crate::mailhost::{MailHost, RemoteExistence};
use crate::password::{self, PasswordPolicy};
use crate::store::types::{Account, Mailbox, MailboxStatus};
use crate::store::Store;

/// Result of a successful provisioning run. `password` is the only
/// copy of the plaintext password that will ever exist; it is neither
/// stored nor logged.
#[derive(Debug)]
pub struct ProvisionedMailbox {
    pub mailbox: Mailbox,
    pub password: String,
}

#[derive(Clone)]
pub struct Provisioner {
    store: Store,
    host: Arc<dyn MailHost>,
    default_quota_mb: u32,
    password_length: usize,
}

fn is_valid_local_part(local_part: &str) -> bool {
    let re = Regex::new(r"^[a-z0-9]+([._-][a-z0-9]+)*$").expect("local part pattern is valid");
    re.is_match(local_part)
}

impl Provisioner {
    pub fn new(
        store: Store,
        host: Arc<dyn MailHost>,
        default_quota_mb: u32,
        password_length: usize,
    ) -> Self {
        Self {
            store,
            host,
            default_quota_mb,
            password_length,
        }
    }

    /// Provision `local_part@<domain>` for `caller`.
    pub async fn provision(
        &self,
        caller: &Account,
        local_part: &str,
        domain_id: &str,
        quota_mb: Option<u32>,
    ) -> Result<ProvisionedMailbox> {
        // Permission check happens exactly once, before any remote
        // side effect.
        if !access::can_create_mailbox(caller) {
            return Err(PortalError::Forbidden(
                "no permission to create email accounts".to_string(),
            ));
        }

        let local_part = local_part.trim().to_lowercase();
        if !is_valid_local_part(&local_part) {
            return Err(PortalError::InvalidRequest(format!(
                "invalid mailbox name: {}",
                local_part
            )));
        }

        let domain = self
            .store
            .find_domain(domain_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("domain {}", domain_id)))?;

        if !domain.is_active {
            return Err(PortalError::DomainInactive(domain.name));
        }

        let address = format!("{}@{}", local_part, domain.name);

        // Advisory only; the UNIQUE index catches the insert race.
        if self.store.mailbox_address_exists(&address).await? {
            return Err(PortalError::AlreadyExists(address));
        }

        // The mail host is the source of truth for delivery; a mailbox
        // unknown to us may still exist there.
        match self.host.mailbox_exists(&local_part, &domain.name).await {
            RemoteExistence::Exists => return Err(PortalError::AlreadyExists(address)),
            RemoteExistence::Unknown => {
                return Err(PortalError::RemoteTransport(format!(
                    "cannot verify whether {} exists on the mail host",
                    address
                )))
            }
            RemoteExistence::Absent => {}
        }

        let plaintext = password::generate(self.password_length, &PasswordPolicy::default())?;
        let quota_mb = quota_mb.unwrap_or(self.default_quota_mb);

        self.host
            .create_mailbox(&local_part, &domain.name, &plaintext, quota_mb)
            .await?;

        let mailbox = Mailbox {
            id: Uuid::new_v4().to_string(),
            address: address.clone(),
            local_part: local_part.clone(),
            domain_id: domain.id.clone(),
            owner_id: caller.id.clone(),
            quota_mb: quota_mb as i64,
            status: MailboxStatus::Active,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        match self.store.insert_mailbox(&mailbox).await {
            Ok(()) => {
                info!("Provisioned mailbox {} for account {}", address, caller.id);
                Ok(ProvisionedMailbox {
                    mailbox,
                    password: plaintext,
                })
            }
            Err(PortalError::AlreadyExists(existing)) => {
                // Lost the insert race: the address now belongs to the
                // winner's mailbox, so a compensating remote delete
                // would destroy their mailbox. Leave the remote side
                // alone and report the conflict.
                warn!("Lost provisioning race for {}", existing);
                Err(PortalError::AlreadyExists(existing))
            }
            Err(persist_err) => {
                error!(
                    "Mailbox {} created remotely but local persistence failed: {}",
                    address, persist_err
                );

                if let Err(comp_err) = self.host.delete_mailbox(&local_part, &domain.name).await {
                    error!(
                        "Compensating delete for {} failed, operator follow-up required: {}",
                        address, comp_err
                    );
                }

                Err(PortalError::PartialFailure(Box::new(persist_err)))
            }
        }
    }

    /// Delete a mailbox: remote first, then soft-delete locally. A
    /// remote failure is logged but does not block the local delete;
    /// local consistency wins over remote-local agreement here.
    pub async fn deprovision(&self, mailbox_id: &str) -> Result<Mailbox> {
        let mailbox = self
            .store
            .find_mailbox(mailbox_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("mailbox {}", mailbox_id)))?;

        if mailbox.status == MailboxStatus::Deleted {
            return Err(PortalError::NotFound(format!(
                "mailbox {} is already deleted",
                mailbox.address
            )));
        }

        let domain = self.store.find_domain(&mailbox.domain_id).await?;
        match domain {
            Some(domain) => {
                if let Err(e) = self
                    .host
                    .delete_mailbox(&mailbox.local_part, &domain.name)
                    .await
                {
                    warn!(
                        "Remote delete of {} failed, removing local record anyway: {}",
                        mailbox.address, e
                    );
                }
            }
            None => warn!(
                "Mailbox {} references missing domain {}, skipping remote delete",
                mailbox.address, mailbox.domain_id
            ),
        }

        self.store
            .set_mailbox_status(&mailbox.id, MailboxStatus::Deleted)
            .await?;

        info!("Mailbox {} marked deleted", mailbox.address);

        Ok(Mailbox {
            status: MailboxStatus::Deleted,
            ..mailbox
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::Role;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mail host double that wrecks the mailboxes table during the
    /// remote create, so the following local insert fails with a
    /// non-conflict database error.
    struct TableDroppingHost {
        store: Store,
        deletes: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl MailHost for TableDroppingHost {
        async fn create_mailbox(
            &self,
            _local_part: &str,
            _domain: &str,
            _password: &str,
            _quota_mb: u32,
        ) -> Result<()> {
            sqlx::query("DROP TABLE mailboxes")
                .execute(&self.store.db)
                .await
                .map_err(PortalError::from)?;
            Ok(())
        }

        async fn delete_mailbox(&self, _local_part: &str, _domain: &str) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn mailbox_exists(&self, _local_part: &str, _domain: &str) -> RemoteExistence {
            RemoteExistence::Absent
        }

        async fn test_connection(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_persist_failure_triggers_one_compensating_delete() {
        let store = Store::connect_in_memory().await.unwrap();
        let host = Arc::new(TableDroppingHost {
            store: store.clone(),
            deletes: AtomicUsize::new(0),
        });
        let provisioner = Provisioner::new(store.clone(), host.clone(), 1024, 16);

        let caller = store
            .create_account("admin@example.com", "pw123456", "Admin", Role::Admin)
            .await
            .unwrap();
        let domain = store.create_domain("example.com").await.unwrap();

        let result = provisioner.provision(&caller, "info", &domain.id, None).await;

        assert!(matches!(result, Err(PortalError::PartialFailure(_))));
        assert_eq!(host.deletes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_local_part_validation() {
        assert!(is_valid_local_part("info"));
        assert!(is_valid_local_part("john.doe"));
        assert!(is_valid_local_part("a1_b2-c3"));

        assert!(!is_valid_local_part(""));
        assert!(!is_valid_local_part(".info"));
        assert!(!is_valid_local_part("info."));
        assert!(!is_valid_local_part("in fo"));
        assert!(!is_valid_local_part("info@example.com"));
    }
}
