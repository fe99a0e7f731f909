use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

mod approvals;
pub mod auth;
mod error;
mod memberships;
mod recovery;
mod system;
mod types;

pub use error::ApiError;
pub use types::*;

use crate::db::Store;
use crate::services::{AdminService, ApprovalService, AuthService, RecoveryService};

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn approvals(&self) -> &Arc<dyn ApprovalService> {
        &self.shared.approval_service
    }

    #[must_use]
    pub fn recovery(&self) -> &Arc<dyn RecoveryService> {
        &self.shared.recovery_service
    }

    #[must_use]
    pub fn admin(&self) -> &Arc<dyn AdminService> {
        &self.shared.admin_service
    }
}

#[must_use]
pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
    })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies) = {
        let config = state.shared.config.read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
        )
    };

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(60)));

    // Routes a pending or revoked account may still reach: logout, its
    // own identity, and the approvals gating it.
    let session_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::get_current_user))
        .route("/approvals/mine", get(approvals::my_pending))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Everything else demands an active account.
    let active_routes = Router::new()
        .route("/auth/password", put(auth::change_password))
        .route("/approvals/actionable", get(approvals::actionable))
        .route("/approvals/{id}/votes", post(approvals::cast_vote))
        .route("/approvals/{id}/votes", get(approvals::list_votes))
        .route("/members/pending", get(approvals::pending_members))
        .route("/projects", post(memberships::create_project))
        .route("/projects/{id}/members", post(memberships::add_member))
        .route("/recovery/{token}/votes", post(recovery::vote))
        .route("/system/status", get(system::get_status))
        .route_layer(middleware::from_fn(auth::require_active_middleware))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api_router = Router::new()
        .merge(session_routes)
        .merge(active_routes)
        .route("/auth/login", post(auth::login))
        .route("/recovery", post(recovery::initiate))
        .route("/recovery/{token}", get(recovery::status))
        .route("/recovery/{token}/password", post(recovery::reset_password))
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
