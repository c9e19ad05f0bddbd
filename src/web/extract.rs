use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::error::AppError;
use crate::session::AdminSession;
use crate::web::AppState;

/// A request made by a signed-in admin.
///
/// Resolved from the session cookie; rejects with 401 when there is no live
/// session and 403 when the user has lost admin privileges. Page handlers take
/// `Result<AdminAuth, AppError>` and turn the rejection into a redirect.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub AdminSession);

impl<S> FromRequestParts<S> for AdminAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let session_id = session_cookie(&parts.headers, &state);
        let session = state.admin.authorize(session_id.as_deref()).await?;
        Ok(AdminAuth(session))
    }
}

/// Value of the admin session cookie, if the browser sent one
pub fn session_cookie(headers: &axum::http::HeaderMap, state: &AppState) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(&state.config.admin.session_cookie)
        .map(|cookie| cookie.value().to_string())
}
