//! Integration tests for the mailbox provisioning workflow
//!
//! The mail host is replaced with a scripted stub that records every
//! call, so the tests can assert not just the outcome but which remote
//! side effects happened.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use portal_rs::error::{PortalError, Result};
use portal_rs::mailhost::{MailHost, RemoteExistence};
use portal_rs::provisioning::Provisioner;
use portal_rs::store::types::{Account, AccountUpdate, MailboxStatus, Role};
use portal_rs::store::Store;

/// Scripted mail host. Counts calls and fails on demand.
struct StubHost {
    creates: AtomicUsize,
    deletes: AtomicUsize,
    existence_checks: AtomicUsize,
    /// Error message to return from create_mailbox, if any
    fail_create: Mutex<Option<String>>,
    /// Error message to return from delete_mailbox, if any
    fail_delete: Mutex<Option<String>>,
    /// What the existence check reports
    existence: Mutex<RemoteExistence>,
    /// Delay inside create_mailbox, to widen race windows
    create_delay_ms: u64,
}

impl StubHost {
    fn new() -> Self {
        Self::with_create_delay(0)
    }

    fn with_create_delay(ms: u64) -> Self {
        Self {
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            existence_checks: AtomicUsize::new(0),
            fail_create: Mutex::new(None),
            fail_delete: Mutex::new(None),
            existence: Mutex::new(RemoteExistence::Absent),
            create_delay_ms: ms,
        }
    }
}

#[async_trait::async_trait]
impl MailHost for StubHost {
    async fn create_mailbox(
        &self,
        _local_part: &str,
        _domain: &str,
        _password: &str,
        _quota_mb: u32,
    ) -> Result<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.create_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.create_delay_ms)).await;
        }
        if let Some(msg) = self.fail_create.lock().unwrap().clone() {
            return Err(PortalError::RemoteCreateFailed(msg));
        }
        Ok(())
    }

    async fn delete_mailbox(&self, _local_part: &str, _domain: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.fail_delete.lock().unwrap().clone() {
            return Err(PortalError::RemoteDeleteFailed(msg));
        }
        Ok(())
    }

    async fn mailbox_exists(&self, _local_part: &str, _domain: &str) -> RemoteExistence {
        self.existence_checks.fetch_add(1, Ordering::SeqCst);
        *self.existence.lock().unwrap()
    }

    async fn test_connection(&self) -> bool {
        true
    }
}

struct Fixture {
    store: Store,
    host: Arc<StubHost>,
    provisioner: Provisioner,
    caller: Account,
    domain_id: String,
}

async fn setup() -> Fixture {
    let store = Store::connect_in_memory().await.unwrap();
    let host = Arc::new(StubHost::new());
    let provisioner = Provisioner::new(store.clone(), host.clone(), 1024, 16);

    let caller = store
        .create_account("owner@example.com", "password123", "Owner", Role::User)
        .await
        .unwrap();
    let caller = store
        .update_account(
            &caller.id,
            &AccountUpdate {
                can_create_emails: Some(true),
                ..AccountUpdate::default()
            },
        )
        .await
        .unwrap();

    let domain = store.create_domain("example.com").await.unwrap();

    Fixture {
        store,
        host,
        provisioner,
        caller,
        domain_id: domain.id,
    }
}

#[tokio::test]
async fn test_successful_provision() {
    let fx = setup().await;

    let provisioned = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await
        .unwrap();

    assert_eq!(provisioned.mailbox.address, "info@example.com");
    assert_eq!(provisioned.mailbox.owner_id, fx.caller.id);
    assert_eq!(provisioned.mailbox.quota_mb, 1024);
    assert_eq!(provisioned.mailbox.status, MailboxStatus::Active);
    assert_eq!(provisioned.password.len(), 16);

    assert_eq!(fx.host.creates.load(Ordering::SeqCst), 1);
    assert_eq!(fx.host.deletes.load(Ordering::SeqCst), 0);

    let stored = fx
        .store
        .find_mailbox(&provisioned.mailbox.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.address, "info@example.com");
}

#[tokio::test]
async fn test_local_part_is_normalized() {
    let fx = setup().await;

    let provisioned = fx
        .provisioner
        .provision(&fx.caller, "  Sales  ", &fx.domain_id, Some(512))
        .await
        .unwrap();

    assert_eq!(provisioned.mailbox.address, "sales@example.com");
    assert_eq!(provisioned.mailbox.quota_mb, 512);
}

#[tokio::test]
async fn test_forbidden_without_permission_makes_no_remote_calls() {
    let fx = setup().await;

    let plain = fx
        .store
        .create_account("plain@example.com", "password123", "Plain", Role::User)
        .await
        .unwrap();

    let result = fx
        .provisioner
        .provision(&plain, "info", &fx.domain_id, None)
        .await;

    assert!(matches!(result, Err(PortalError::Forbidden(_))));
    assert_eq!(fx.host.existence_checks.load(Ordering::SeqCst), 0);
    assert_eq!(fx.host.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_inactive_domain_rejected_before_any_remote_call() {
    let fx = setup().await;

    fx.store
        .set_domain_active(&fx.domain_id, false)
        .await
        .unwrap();

    let result = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await;

    assert!(matches!(result, Err(PortalError::DomainInactive(_))));
    assert_eq!(fx.host.existence_checks.load(Ordering::SeqCst), 0);
    assert_eq!(fx.host.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_domain_is_not_found() {
    let fx = setup().await;

    let result = fx
        .provisioner
        .provision(&fx.caller, "info", "no-such-domain", None)
        .await;

    assert!(matches!(result, Err(PortalError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_local_part_rejected() {
    let fx = setup().await;

    for bad in ["", "in fo", "info@x", ".info", "info..x"] {
        let result = fx.provisioner.provision(&fx.caller, bad, &fx.domain_id, None).await;
        assert!(
            matches!(result, Err(PortalError::InvalidRequest(_))),
            "{:?} should be rejected",
            bad
        );
    }

    assert_eq!(fx.host.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remote_existing_mailbox_is_conflict() {
    let fx = setup().await;

    *fx.host.existence.lock().unwrap() = RemoteExistence::Exists;

    let result = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await;

    assert!(matches!(result, Err(PortalError::AlreadyExists(_))));
    assert_eq!(fx.host.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unverifiable_remote_state_blocks_provisioning() {
    let fx = setup().await;

    *fx.host.existence.lock().unwrap() = RemoteExistence::Unknown;

    let result = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await;

    assert!(matches!(result, Err(PortalError::RemoteTransport(_))));
    assert_eq!(fx.host.creates.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_remote_create_failure_leaves_no_local_record() {
    let fx = setup().await;

    *fx.host.fail_create.lock().unwrap() = Some("quota exceeded".to_string());

    let result = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await;

    assert!(matches!(result, Err(PortalError::RemoteCreateFailed(_))));
    assert_eq!(fx.store.count_mailboxes().await.unwrap(), 0);
    assert_eq!(fx.host.deletes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_provisions_one_wins_no_compensation() {
    let store = Store::connect_in_memory().await.unwrap();
    // Slow down the remote create so both tasks pass the advisory
    // existence check before either inserts.
    let host = Arc::new(StubHost::with_create_delay(50));
    let provisioner = Provisioner::new(store.clone(), host.clone(), 1024, 16);

    let caller = store
        .create_account("owner@example.com", "password123", "Owner", Role::Admin)
        .await
        .unwrap();
    let domain = store.create_domain("example.com").await.unwrap();

    let (a, b) = tokio::join!(
        provisioner.provision(&caller, "info", &domain.id, None),
        provisioner.provision(&caller, "info", &domain.id, None),
    );

    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1, "exactly one winner");

    let loser = if outcomes[0] { b } else { a };
    assert!(matches!(loser, Err(PortalError::AlreadyExists(_))));

    // The loser must not tear down the winner's remote mailbox.
    assert_eq!(host.deletes.load(Ordering::SeqCst), 0);
    assert_eq!(store.count_mailboxes().await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_address_rejected_by_advisory_check() {
    let fx = setup().await;

    fx.provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await
        .unwrap();

    let result = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await;

    assert!(matches!(result, Err(PortalError::AlreadyExists(_))));
    // The second attempt stops before touching the remote host again.
    assert_eq!(fx.host.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_deprovision_soft_deletes_and_calls_remote_once() {
    let fx = setup().await;

    let provisioned = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await
        .unwrap();

    let deleted = fx
        .provisioner
        .deprovision(&provisioned.mailbox.id)
        .await
        .unwrap();

    assert_eq!(deleted.status, MailboxStatus::Deleted);
    assert_eq!(fx.host.deletes.load(Ordering::SeqCst), 1);

    // Soft-deleted, so the row survives and the address stays taken.
    assert!(fx
        .store
        .mailbox_address_exists("info@example.com")
        .await
        .unwrap());

    // Deleting twice is a not-found, not a second remote call.
    let again = fx.provisioner.deprovision(&provisioned.mailbox.id).await;
    assert!(matches!(again, Err(PortalError::NotFound(_))));
    assert_eq!(fx.host.deletes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_deprovision_proceeds_when_remote_delete_fails() {
    let fx = setup().await;

    let provisioned = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await
        .unwrap();

    *fx.host.fail_delete.lock().unwrap() = Some("panel down".to_string());

    let deleted = fx
        .provisioner
        .deprovision(&provisioned.mailbox.id)
        .await
        .unwrap();

    assert_eq!(deleted.status, MailboxStatus::Deleted);

    let stored = fx
        .store
        .find_mailbox(&provisioned.mailbox.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, MailboxStatus::Deleted);
}

#[tokio::test]
async fn test_deleted_address_is_not_recyclable() {
    let fx = setup().await;

    let provisioned = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await
        .unwrap();
    fx.provisioner
        .deprovision(&provisioned.mailbox.id)
        .await
        .unwrap();

    let result = fx
        .provisioner
        .provision(&fx.caller, "info", &fx.domain_id, None)
        .await;

    assert!(matches!(result, Err(PortalError::AlreadyExists(_))));
}
