//! Admin dashboard operations.
//!
//! Admins sign in with their hosted backend account; the returned access token
//! is kept server-side in the [`SessionStore`] and every dashboard query runs
//! with it, so the backend's own row-level security still decides what an
//! admin may read or change.

pub mod export;
pub mod stats;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{BackendError, HostedBackend, ProfileQuery};
use crate::error::AppError;
use crate::profile::Profile;
use crate::rate_limit::RateLimiter;
use crate::session::{AdminSession, SessionStore};
use crate::validation::{is_valid_email, validate_admin_login};

pub use export::{export_filename, profiles_to_csv};
pub use stats::DashboardStats;

pub const NOT_ADMIN: &str = "You do not have admin privileges";
pub const LOGIN_REQUIRED: &str = "Please log in to access the admin panel";

/// Message shown on the login page for the `error` / `redirected` query parameters
pub fn login_notice(error: Option<&str>, redirected: bool) -> Option<&'static str> {
    match error {
        Some("not-admin") => Some(NOT_ADMIN),
        Some("auth-failed") => Some("Authentication service unavailable. Please try again later."),
        Some("config") => Some("Server configuration error. Please contact support."),
        Some("too-many-redirects") => {
            Some("Too many redirects. Please clear your browser cache and try again.")
        }
        _ if redirected => Some(LOGIN_REQUIRED),
        _ => None,
    }
}

/// A generated CSV file
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

pub struct AdminService {
    backend: Arc<dyn HostedBackend>,
    sessions: SessionStore,
    limiter: RateLimiter,
    session_ttl: Duration,
    min_password_length: usize,
    export_prefix: String,
}

impl AdminService {
    pub fn new(
        backend: Arc<dyn HostedBackend>,
        sessions: SessionStore,
        limiter: RateLimiter,
        session_ttl: Duration,
        min_password_length: usize,
        export_prefix: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            sessions,
            limiter,
            session_ttl,
            min_password_length,
            export_prefix: export_prefix.into(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Signs an admin in and opens a dashboard session.
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminSession, AppError> {
        let email = email.trim();
        validate_admin_login(email, password, self.min_password_length)
            .map_err(AppError::Validation)?;

        if !self.limiter.check_rate_limit(&email.to_lowercase()).await {
            return Err(AppError::RateLimited(
                "Too many login attempts. Please try again later.".to_string(),
            ));
        }

        let auth = self.backend.sign_in(email, password).await.map_err(|e| match e.status() {
            Some(400) => AppError::Unauthorized("Invalid email or password".to_string()),
            _ => AppError::Upstream("Authentication failed. Please try again later.".to_string()),
        })?;

        let is_admin = self
            .backend
            .is_admin(&auth.access_token, auth.user_id)
            .await
            .map_err(|e| {
                warn!(user_id = %auth.user_id, error = %e, "Admin flag lookup failed");
                AppError::Upstream("Authentication failed. Please try again later.".to_string())
            })?;
        if !is_admin {
            warn!(user_id = %auth.user_id, "Non-admin attempted dashboard login");
            if let Err(e) = self.backend.sign_out(&auth.access_token).await {
                warn!(error = %e, "Failed to sign out non-admin session");
            }
            return Err(AppError::Forbidden(NOT_ADMIN.to_string()));
        }

        self.limiter.reset_rate_limit(&email.to_lowercase()).await;
        let session = self.sessions.create_session(&auth, self.session_ttl).await;
        info!(user_id = %session.user_id, "Admin signed in");
        Ok(session)
    }

    /// Ends a dashboard session. Backend sign-out failures are only logged.
    pub async fn logout(&self, session_id: &str) {
        if let Some(session) = self.sessions.remove_session(session_id).await {
            if let Err(e) = self.backend.sign_out(&session.access_token).await {
                warn!(user_id = %session.user_id, error = %e, "Backend sign-out failed");
            }
            info!(user_id = %session.user_id, "Admin signed out");
        }
    }

    /// Resolves a session cookie to a live admin session. The admin flag is
    /// re-checked on every request so a revoked admin loses access at once.
    pub async fn authorize(&self, session_id: Option<&str>) -> Result<AdminSession, AppError> {
        let session_id =
            session_id.ok_or_else(|| AppError::Unauthorized(LOGIN_REQUIRED.to_string()))?;
        let session = self
            .sessions
            .get_session(session_id)
            .await
            .ok_or_else(|| AppError::Unauthorized(LOGIN_REQUIRED.to_string()))?;

        match self.backend.is_admin(&session.access_token, session.user_id).await {
            Ok(true) => Ok(session),
            Ok(false) => {
                self.sessions.remove_session(&session.id).await;
                Err(AppError::Forbidden(NOT_ADMIN.to_string()))
            }
            Err(e) if is_auth_rejection(&e) => {
                self.sessions.remove_session(&session.id).await;
                Err(AppError::Unauthorized(LOGIN_REQUIRED.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn registrations(
        &self,
        session: &AdminSession,
        query: &ProfileQuery,
    ) -> Result<Vec<Profile>, AppError> {
        Ok(self.backend.list_profiles(&session.access_token, query).await?)
    }

    pub async fn registration(&self, session: &AdminSession, id: Uuid) -> Result<Profile, AppError> {
        self.backend
            .get_profile(&session.access_token, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))
    }

    pub async fn stats(&self, session: &AdminSession) -> Result<DashboardStats, AppError> {
        let profiles = self
            .backend
            .list_profiles(&session.access_token, &ProfileQuery::default())
            .await?;
        Ok(DashboardStats::from_profiles(&profiles))
    }

    pub async fn export_csv(&self, session: &AdminSession) -> Result<CsvExport, AppError> {
        let profiles = self
            .backend
            .list_profiles(&session.access_token, &ProfileQuery::default())
            .await?;
        let content = profiles_to_csv(&profiles)?;
        info!(user_id = %session.user_id, rows = profiles.len(), "Exported registrations");
        Ok(CsvExport {
            filename: export_filename(&self.export_prefix, Utc::now()),
            content,
        })
    }

    /// Grants admin privileges to the registrant with `email`.
    pub async fn grant_admin(&self, session: &AdminSession, email: &str) -> Result<String, AppError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::Validation("Please enter a valid email address".to_string()));
        }

        let flag = self
            .backend
            .find_admin_flag(&session.access_token, email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found with this email address".to_string()))?;
        if flag.is_admin {
            return Err(AppError::Conflict("This user is already an admin".to_string()));
        }

        self.backend
            .grant_admin(&session.access_token, email)
            .await
            .map_err(|e| AppError::Upstream(format!("Error updating user: {}", e)))?;

        info!(granted_by = %session.user_id, user_id = %flag.id, "Granted admin privileges");
        Ok("User has been granted admin privileges".to_string())
    }
}

/// Expired or revoked backend tokens come back as 401 from the table API.
fn is_auth_rejection(e: &BackendError) -> bool {
    matches!(e.status(), Some(401))
}
