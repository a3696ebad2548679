//! API request handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::api::auth::JwtConfig;
use crate::error::PortalError;
use crate::mailhost::MailHost;
use crate::provisioning::Provisioner;
use crate::store::types::{Account, AccountUpdate, Role};
use crate::store::Store;

/// Shared application state
pub struct AppState {
    pub store: Store,
    pub jwt_config: JwtConfig,
    pub provisioner: Provisioner,
    pub host: Arc<dyn MailHost>,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
        }
    }
}

/// Map a workflow error to a status code and response body. Internal
/// details (SQL, config) are logged but never sent to the client.
pub fn error_response(err: PortalError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
        PortalError::NotFound(_) => StatusCode::NOT_FOUND,
        PortalError::DomainInactive(_) => StatusCode::BAD_REQUEST,
        PortalError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        PortalError::AlreadyExists(_) => StatusCode::CONFLICT,
        PortalError::DependentsExist(_) => StatusCode::CONFLICT,
        PortalError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
        PortalError::RemoteTransport(_)
        | PortalError::RemoteCreateFailed(_)
        | PortalError::RemoteDeleteFailed(_) => StatusCode::BAD_GATEWAY,
        PortalError::PartialFailure(_)
        | PortalError::InvalidPolicy(_)
        | PortalError::Database(_)
        | PortalError::Config(_)
        | PortalError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("Request failed: {}", err);
        (status, Json(ApiError::new("Internal server error")))
    } else {
        (status, Json(ApiError::new(&err.to_string())))
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub account: Account,
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// POST /api/auth/login - Authenticate and get JWT token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ApiError>)> {
    let account = state
        .store
        .verify_login(&req.email, &req.password)
        .await
        .map_err(error_response)?;

    let Some(account) = account else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new("Invalid credentials")),
        ));
    };

    let token = state.jwt_config.create_token(&account).map_err(|e| {
        error!("Failed to create token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new("Failed to create token")),
        )
    })?;

    Ok(Json(LoginResponse { token, account }))
}

/// POST /api/auth/register - Create a new portal account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Account>), (StatusCode, Json<ApiError>)> {
    if !req.email.contains('@') {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Invalid email format")),
        ));
    }

    if req.password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Password must be at least 8 characters")),
        ));
    }

    if req.display_name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Display name is required")),
        ));
    }

    let account = state
        .store
        .create_account(&req.email, &req.password, req.display_name.trim(), Role::User)
        .await
        .map_err(error_response)?;

    info!("Account {} registered", account.email);

    Ok((StatusCode::CREATED, Json(account)))
}

/// GET /api/me - The authenticated account
pub async fn me(caller: super::server::CurrentUser) -> Json<Account> {
    Json(caller.0)
}

/// Profile update request body
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: String,
}

/// Password change request body
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// PATCH /api/me - Update own display name. Role and flags go through
/// the admin path only.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    caller: super::server::CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Account>, (StatusCode, Json<ApiError>)> {
    let display_name = req.display_name.trim();
    if display_name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Display name is required")),
        ));
    }

    let update = AccountUpdate {
        display_name: Some(display_name.to_string()),
        ..AccountUpdate::default()
    };

    let account = state
        .store
        .update_account(&caller.0.id, &update)
        .await
        .map_err(error_response)?;

    Ok(Json(account))
}

/// POST /api/me/password - Change own password after verifying the
/// current one
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    caller: super::server::CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    if req.new_password.len() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new("Password must be at least 8 characters")),
        ));
    }

    state
        .store
        .change_password(&caller.0.id, &req.current_password, &req.new_password)
        .await
        .map_err(|err| match err {
            PortalError::AuthenticationFailed => (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Current password is incorrect")),
            ),
            other => error_response(other),
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Health check endpoint with detailed status
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    use std::time::SystemTime;

    let db_healthy = state.store.health_check().await.is_ok();
    let mailhost_healthy = state.host.test_connection().await;

    // The portal still serves reads when the panel is down, so only
    // the database gates overall health.
    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if db_healthy { "healthy" } else { "unhealthy" },
            "service": "portal-rs",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            "checks": {
                "database": if db_healthy { "ok" } else { "failed" },
                "mailhost": if mailhost_healthy { "ok" } else { "failed" }
            }
        })),
    )
}
