//! Integration tests for account self-service and admin user deletion

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use portal_rs::api::admin;
use portal_rs::api::auth::JwtConfig;
use portal_rs::api::handlers::{self, AppState, ChangePasswordRequest, UpdateProfileRequest};
use portal_rs::api::server::CurrentUser;
use portal_rs::error::Result;
use portal_rs::mailhost::{MailHost, RemoteExistence};
use portal_rs::provisioning::Provisioner;
use portal_rs::store::types::Role;
use portal_rs::store::Store;

/// Mail host double for tests that never touch the remote side.
struct IdleHost;

#[async_trait::async_trait]
impl MailHost for IdleHost {
    async fn create_mailbox(
        &self,
        _local_part: &str,
        _domain: &str,
        _password: &str,
        _quota_mb: u32,
    ) -> Result<()> {
        Ok(())
    }

    async fn delete_mailbox(&self, _local_part: &str, _domain: &str) -> Result<()> {
        Ok(())
    }

    async fn mailbox_exists(&self, _local_part: &str, _domain: &str) -> RemoteExistence {
        RemoteExistence::Absent
    }

    async fn test_connection(&self) -> bool {
        true
    }
}

async fn app_state() -> Arc<AppState> {
    let store = Store::connect_in_memory().await.unwrap();
    let host: Arc<dyn MailHost> = Arc::new(IdleHost);
    let provisioner = Provisioner::new(store.clone(), host.clone(), 1024, 16);

    Arc::new(AppState {
        store,
        jwt_config: JwtConfig::new("test-secret".to_string(), 1),
        provisioner,
        host,
    })
}

#[tokio::test]
async fn test_admin_cannot_delete_own_account() {
    let state = app_state().await;
    let admin_account = state
        .store
        .create_account("admin@example.com", "password123", "Admin", Role::Admin)
        .await
        .unwrap();

    let result = admin::delete_user(
        State(state.clone()),
        CurrentUser(admin_account.clone()),
        Path(admin_account.id.clone()),
    )
    .await;

    let (status, _) = result.unwrap_err();
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The account is still there.
    assert!(state
        .store
        .find_account(&admin_account.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_admin_deletes_another_account() {
    let state = app_state().await;
    let admin_account = state
        .store
        .create_account("admin@example.com", "password123", "Admin", Role::Admin)
        .await
        .unwrap();
    let other = state
        .store
        .create_account("other@example.com", "password123", "Other", Role::User)
        .await
        .unwrap();

    let status = admin::delete_user(
        State(state.clone()),
        CurrentUser(admin_account),
        Path(other.id.clone()),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.store.find_account(&other.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_own_display_name() {
    let state = app_state().await;
    let account = state
        .store
        .create_account("user@example.com", "password123", "Old Name", Role::User)
        .await
        .unwrap();

    let updated = handlers::update_me(
        State(state.clone()),
        CurrentUser(account.clone()),
        Json(UpdateProfileRequest {
            display_name: "  New Name  ".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(updated.0.display_name, "New Name");
    assert_eq!(updated.0.role, Role::User);
    assert!(!updated.0.can_create_emails);

    let blank = handlers::update_me(
        State(state),
        CurrentUser(account),
        Json(UpdateProfileRequest {
            display_name: "   ".to_string(),
        }),
    )
    .await;
    assert_eq!(blank.unwrap_err().0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_change_own_password() {
    let state = app_state().await;
    let account = state
        .store
        .create_account("user@example.com", "old-password", "User", Role::User)
        .await
        .unwrap();

    let wrong_current = handlers::change_password(
        State(state.clone()),
        CurrentUser(account.clone()),
        Json(ChangePasswordRequest {
            current_password: "not-it".to_string(),
            new_password: "new-password".to_string(),
        }),
    )
    .await;
    assert_eq!(wrong_current.unwrap_err().0, StatusCode::UNAUTHORIZED);

    let too_short = handlers::change_password(
        State(state.clone()),
        CurrentUser(account.clone()),
        Json(ChangePasswordRequest {
            current_password: "old-password".to_string(),
            new_password: "short".to_string(),
        }),
    )
    .await;
    assert_eq!(too_short.unwrap_err().0, StatusCode::BAD_REQUEST);

    let status = handlers::change_password(
        State(state.clone()),
        CurrentUser(account),
        Json(ChangePasswordRequest {
            current_password: "old-password".to_string(),
            new_password: "new-password".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let old = state
        .store
        .verify_login("user@example.com", "old-password")
        .await
        .unwrap();
    assert!(old.is_none());

    let new = state
        .store
        .verify_login("user@example.com", "new-password")
        .await
        .unwrap();
    assert!(new.is_some());
}
