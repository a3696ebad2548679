//! API Server - HTTP server for the portal REST API

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::handlers::{self, ApiError, AppState};
use crate::api::{admin, emails};
use crate::store::types::Account;

/// API Server configuration
pub struct ApiServer {
    state: Arc<AppState>,
    addr: String,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: Arc<AppState>, addr: String) -> Self {
        Self { state, addr }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        // CORS configuration
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        // Public routes (no auth required)
        let public_routes = Router::new()
            .route("/health", get(handlers::health))
            .route("/auth/login", post(handlers::login))
            .route("/auth/register", post(handlers::register));

        // Protected routes (auth required)
        let protected_routes = Router::new()
            .route("/me", get(handlers::me))
            .route("/me", patch(handlers::update_me))
            .route("/me/password", post(handlers::change_password))
            .route("/domains", get(emails::list_active_domains))
            .route("/emails", get(emails::list_emails))
            .route("/emails", post(emails::create_email))
            .route("/emails/:id", get(emails::get_email))
            .route("/emails/:id", delete(emails::delete_email))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware,
            ));

        // Admin API routes (auth required + admin role check in handlers)
        let admin_api_routes = Router::new()
            .route("/users", get(admin::list_users))
            .route("/users/:id", get(admin::get_user))
            .route("/users/:id", patch(admin::update_user))
            .route("/users/:id", delete(admin::delete_user))
            .route("/domains", get(admin::list_domains))
            .route("/domains", post(admin::create_domain))
            .route("/domains/:id", patch(admin::update_domain))
            .route("/domains/:id", delete(admin::delete_domain))
            .route("/emails", get(admin::list_all_emails))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware,
            ));

        Router::new()
            .nest("/api", public_routes.merge(protected_routes))
            .nest("/api/admin", admin_api_routes)
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Start the API server
    pub async fn run(&self) -> std::io::Result<()> {
        let router = self.router();

        info!("Starting API server on {}", self.addr);

        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

/// Authentication middleware. Validates the bearer token, then loads
/// the account so that a deactivated account is locked out immediately
/// instead of at token expiry.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Missing or invalid Authorization header")),
            )
                .into_response();
        }
    };

    let claims = match state.jwt_config.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Invalid JWT token: {}", e);
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Invalid or expired token")),
            )
                .into_response();
        }
    };

    let account = match state.store.find_account(&claims.sub).await {
        Ok(Some(account)) if account.is_active => account,
        Ok(_) => {
            warn!("Token for unknown or deactivated account {}", claims.sub);
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Account not found or deactivated")),
            )
                .into_response();
        }
        Err(e) => {
            warn!("Account lookup failed during auth: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError::new("Internal server error")),
            )
                .into_response();
        }
    };

    req.extensions_mut().insert(account);
    next.run(req).await
}

/// The authenticated account, extracted from request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Account);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Account>()
            .cloned()
            .map(CurrentUser)
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(ApiError::new("Not authenticated")),
            ))
    }
}
