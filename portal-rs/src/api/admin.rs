//! Admin API Handlers
//!
//! User and domain management. Every handler here requires the admin
//! role; the check sits in the handler so a misrouted request can
//! never skip it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::handlers::{error_response, ApiError, AppState};
use super::server::CurrentUser;
use crate::access;
use crate::store::types::{Account, AccountUpdate, Domain, Mailbox, Role};

fn ensure_admin(caller: &Account) -> Result<(), (StatusCode, Json<ApiError>)> {
    if caller.role == Role::Admin {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new("Admin role required")),
        ))
    }
}

/// GET /api/admin/users - List all accounts
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<Account>>, (StatusCode, Json<ApiError>)> {
    ensure_admin(&caller)?;

    let accounts = state.store.list_accounts().await.map_err(error_response)?;
    Ok(Json(accounts))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<Account>, (StatusCode, Json<ApiError>)> {
    ensure_admin(&caller)?;

    let account = state
        .store
        .find_account(&user_id)
        .await
        .map_err(error_response)?;

    match account {
        Some(account) => Ok(Json(account)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Account not found")),
        )),
    }
}

/// PATCH /api/admin/users/:id - Toggle flags, role or display name
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<String>,
    Json(update): Json<AccountUpdate>,
) -> Result<Json<Account>, (StatusCode, Json<ApiError>)> {
    ensure_admin(&caller)?;

    if access::is_self_lockout(&caller, &user_id, &update) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new(
                "Admins may not change their own role or active flag",
            )),
        ));
    }

    let account = state
        .store
        .update_account(&user_id, &update)
        .await
        .map_err(error_response)?;

    info!("Admin {} updated account {}", caller.id, user_id);

    Ok(Json(account))
}

/// DELETE /api/admin/users/:id - Blocked while the account owns mailboxes
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    ensure_admin(&caller)?;

    // Same lockout class the update guard covers.
    if caller.id == user_id {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new("You cannot delete your own account")),
        ));
    }

    state
        .store
        .delete_account(&user_id)
        .await
        .map_err(error_response)?;

    info!("Admin {} deleted account {}", caller.id, user_id);

    Ok(StatusCode::NO_CONTENT)
}

/// Domain creation request
#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    pub name: String,
}

/// Domain update request
#[derive(Debug, Deserialize)]
pub struct UpdateDomainRequest {
    pub is_active: bool,
}

/// POST /api/admin/domains
pub async fn create_domain(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Json(req): Json<CreateDomainRequest>,
) -> Result<(StatusCode, Json<Domain>), (StatusCode, Json<ApiError>)> {
    if !access::can_manage_domains(&caller) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new("Admin role required")),
        ));
    }

    let domain = state
        .store
        .create_domain(&req.name)
        .await
        .map_err(error_response)?;

    info!("Admin {} created domain {}", caller.id, domain.name);

    Ok((StatusCode::CREATED, Json(domain)))
}

/// GET /api/admin/domains - All domains, inactive included
pub async fn list_domains(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<Domain>>, (StatusCode, Json<ApiError>)> {
    ensure_admin(&caller)?;

    let domains = state
        .store
        .list_domains(true)
        .await
        .map_err(error_response)?;
    Ok(Json(domains))
}

/// PATCH /api/admin/domains/:id - Gate provisioning under the domain
pub async fn update_domain(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(domain_id): Path<String>,
    Json(req): Json<UpdateDomainRequest>,
) -> Result<Json<Domain>, (StatusCode, Json<ApiError>)> {
    if !access::can_manage_domains(&caller) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new("Admin role required")),
        ));
    }

    let domain = state
        .store
        .set_domain_active(&domain_id, req.is_active)
        .await
        .map_err(error_response)?;

    info!(
        "Admin {} set domain {} active={}",
        caller.id, domain.name, domain.is_active
    );

    Ok(Json(domain))
}

/// DELETE /api/admin/domains/:id - Blocked while mailboxes reference it
pub async fn delete_domain(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(domain_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    if !access::can_manage_domains(&caller) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new("Admin role required")),
        ));
    }

    state
        .store
        .delete_domain(&domain_id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/emails - Every mailbox in the system
pub async fn list_all_emails(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<Mailbox>>, (StatusCode, Json<ApiError>)> {
    ensure_admin(&caller)?;

    let mailboxes = state
        .store
        .list_all_mailboxes()
        .await
        .map_err(error_response)?;
    Ok(Json(mailboxes))
}
