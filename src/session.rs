use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::backend::AuthSession;

/// A signed-in admin, bound to the hosted backend session that authorizes
/// dashboard queries.
#[derive(Clone, Debug)]
pub struct AdminSession {
    pub id: String,
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl AdminSession {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Session store for admin dashboard sessions
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, AdminSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session. The lifetime is the shorter of `ttl` and the
    /// backend token lifetime.
    pub async fn create_session(&self, auth: &AuthSession, ttl: Duration) -> AdminSession {
        let ttl = auth
            .expires_in
            .map(Duration::from_secs)
            .map_or(ttl, |token_ttl| token_ttl.min(ttl));
        let now = Instant::now();
        let session = AdminSession {
            id: Uuid::new_v4().to_string(),
            user_id: auth.user_id,
            email: auth.email.clone(),
            access_token: auth.access_token.clone(),
            created_at: now,
            expires_at: now + ttl,
        };

        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        debug!(user_id = %session.user_id, "Created admin session");

        session
    }

    /// Get a live session. Expired sessions are removed and reported as absent.
    pub async fn get_session(&self, session_id: &str) -> Option<AdminSession> {
        let session = self.sessions.read().await.get(session_id).cloned()?;
        if session.is_expired() {
            self.remove_session(session_id).await;
            return None;
        }
        Some(session)
    }

    /// Remove a session, returning it if it existed
    pub async fn remove_session(&self, session_id: &str) -> Option<AdminSession> {
        self.sessions.write().await.remove(session_id)
    }

    /// Remove expired sessions
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
