//! HTTP surface of the portal.
//!
//! Public pages and JSON endpoints for registration, plus the guarded admin
//! dashboard. API errors are JSON bodies built from [`AppError`]; guarded
//! pages redirect to the login page instead.
//!
//! [`AppError`]: crate::error::AppError

pub mod extract;
pub mod handlers;
pub mod pages;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::admin::AdminService;
use crate::config::Config;
use crate::registration::RegistrationService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registration: Arc<RegistrationService>,
    pub admin: Arc<AdminService>,
}

impl AppState {
    pub fn new(config: Config, registration: RegistrationService, admin: AdminService) -> Self {
        Self {
            config: Arc::new(config),
            registration: Arc::new(registration),
            admin: Arc::new(admin),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(handlers::health))
        .route("/api/check-email", post(handlers::check_email))
        .route("/api/register", post(handlers::register))
        .route("/admin/login", get(pages::admin_login))
        .route("/admin", get(pages::dashboard))
        .route("/admin/registrations", get(pages::dashboard))
        .route("/admin/export", get(pages::dashboard))
        .route("/admin/settings", get(pages::dashboard))
        .route("/api/admin/login", post(handlers::admin_login))
        .route("/api/admin/logout", post(handlers::admin_logout))
        .route("/api/admin/stats", get(handlers::stats))
        .route("/api/admin/registrations", get(handlers::list_registrations))
        .route("/api/admin/registrations/{id}", get(handlers::get_registration))
        .route("/api/admin/export", get(handlers::export))
        .route("/api/admin/grant", post(handlers::grant_admin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
