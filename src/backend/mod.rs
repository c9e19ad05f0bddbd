//! Hosted backend integration.
//!
//! Every persistence and authentication operation of the portal is a call into
//! a hosted backend-as-a-service: an auth API (`/auth/v1`) and a REST table API
//! (`/rest/v1`). The [`HostedBackend`] trait is the seam the rest of the crate
//! depends on; [`SupabaseClient`] is the HTTP implementation.

pub mod query;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::profile::{NewProfile, Profile, ProfileSummary};

pub use query::{ProfileQuery, SortColumn, SortOrder};
pub use supabase::SupabaseClient;

/// Result of a successful sign-up
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    /// Id of the created auth user
    pub user_id: Uuid,
    /// Present when the backend signs the user in immediately
    /// (email confirmation disabled)
    pub access_token: Option<String>,
}

/// Result of a password sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub expires_in: Option<u64>,
}

/// Id and admin flag of a profile looked up by email
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminFlag {
    pub id: Uuid,
    pub is_admin: bool,
}

/// Error types for hosted backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Auth API rejected the request
    #[error("{message}")]
    Auth { status: u16, message: String },
    /// Table API rejected the request
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// Response body did not have the expected shape
    #[error("Unexpected backend response: {0}")]
    Decode(String),
    /// Operation needs the service-role key, which is not configured
    #[error("Service role key is not configured")]
    MissingServiceKey,
}

impl BackendError {
    /// HTTP status returned by the backend, if it answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Auth { status, .. } | BackendError::Api { status, .. } => Some(*status),
            BackendError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Operations the portal needs from the hosted backend.
///
/// Methods that take an `access_token` run with the signed-in admin's
/// privileges, so row-level security on the backend still applies.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostedBackend: Send + Sync {
    /// Looks up a registrant by exact email. Zero rows is `Ok(None)`.
    async fn find_profile_by_email(&self, email: &str)
        -> Result<Option<ProfileSummary>, BackendError>;

    /// Creates an auth user with `full_name` in its metadata.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUp, BackendError>;

    /// Inserts the profile row for a user created by [`HostedBackend::sign_up`].
    async fn insert_profile(&self, signup: &SignUp, profile: &NewProfile)
        -> Result<(), BackendError>;

    /// Deletes an auth user. Requires the service-role key.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), BackendError>;

    /// Password sign-in.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Admin flag of the profile with `user_id`; a missing row is `false`.
    async fn is_admin(&self, access_token: &str, user_id: Uuid) -> Result<bool, BackendError>;

    /// Lists profiles with optional search and ordering.
    async fn list_profiles(
        &self,
        access_token: &str,
        query: &ProfileQuery,
    ) -> Result<Vec<Profile>, BackendError>;

    /// Fetches a single profile.
    async fn get_profile(&self, access_token: &str, id: Uuid)
        -> Result<Option<Profile>, BackendError>;

    /// Id and admin flag of the profile with `email`.
    async fn find_admin_flag(
        &self,
        access_token: &str,
        email: &str,
    ) -> Result<Option<AdminFlag>, BackendError>;

    /// Sets `is_admin = true` on the profile with `email`.
    async fn grant_admin(&self, access_token: &str, email: &str) -> Result<(), BackendError>;
}
