//! Email account endpoints
//!
//! Thin HTTP layer over the provisioning workflow. The generated
//! password appears only in the creation response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::handlers::{error_response, ApiError, AppState};
use super::server::CurrentUser;
use crate::access;
use crate::error::PortalError;
use crate::store::types::{Domain, Mailbox, Role};

/// Email account creation request
#[derive(Debug, Deserialize)]
pub struct CreateEmailRequest {
    pub username: String,
    pub domain_id: String,
    pub quota_mb: Option<u32>,
}

/// Creation response. The password is shown here once and cannot be
/// retrieved again.
#[derive(Debug, Serialize)]
pub struct CreateEmailResponse {
    #[serde(flatten)]
    pub mailbox: Mailbox,
    pub password: String,
}

/// POST /api/emails - Provision a new email account
pub async fn create_email(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Json(req): Json<CreateEmailRequest>,
) -> Result<(StatusCode, Json<CreateEmailResponse>), (StatusCode, Json<ApiError>)> {
    let provisioned = state
        .provisioner
        .provision(&caller, &req.username, &req.domain_id, req.quota_mb)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEmailResponse {
            mailbox: provisioned.mailbox,
            password: provisioned.password,
        }),
    ))
}

/// GET /api/emails - The caller's own mailboxes
pub async fn list_emails(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
) -> Result<Json<Vec<Mailbox>>, (StatusCode, Json<ApiError>)> {
    let mailboxes = state
        .store
        .list_mailboxes_by_owner(&caller.id)
        .await
        .map_err(error_response)?;

    Ok(Json(mailboxes))
}

/// GET /api/emails/:id - Owner or admin only
pub async fn get_email(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(mailbox_id): Path<String>,
) -> Result<Json<Mailbox>, (StatusCode, Json<ApiError>)> {
    let mailbox = state
        .store
        .find_mailbox(&mailbox_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(PortalError::NotFound(format!("mailbox {}", mailbox_id))))?;

    if !access::can_view_mailbox(&caller, &mailbox) {
        // A 404 here would leak which ids exist, a plain 403 does not.
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new("Not your mailbox")),
        ));
    }

    Ok(Json(mailbox))
}

/// DELETE /api/emails/:id - Admin only, removes remote then local
pub async fn delete_email(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    Path(mailbox_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    if caller.role != Role::Admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiError::new("Admin role required")),
        ));
    }

    state
        .provisioner
        .deprovision(&mailbox_id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/domains - Active domains available for provisioning
pub async fn list_active_domains(
    State(state): State<Arc<AppState>>,
    CurrentUser(_caller): CurrentUser,
) -> Result<Json<Vec<Domain>>, (StatusCode, Json<ApiError>)> {
    let domains = state
        .store
        .list_domains(false)
        .await
        .map_err(error_response)?;

    Ok(Json(domains))
}
