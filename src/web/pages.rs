//! Server-rendered HTML pages.
//!
//! Pages are static templates compiled into the binary; the few dynamic
//! values are substituted as escaped text. The dashboard shell loads its data
//! from the JSON endpoints.

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use tracing::warn;

use crate::admin::login_notice;
use crate::error::AppError;
use crate::web::extract::AdminAuth;
use crate::web::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const CLOSED_HTML: &str = include_str!("../../static/closed.html");
const LOGIN_HTML: &str = include_str!("../../static/admin_login.html");
const DASHBOARD_HTML: &str = include_str!("../../static/admin.html");

const LOGIN_REDIRECT: &str = "/admin/login?redirected=true";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginParams {
    pub error: Option<String>,
    pub redirected: bool,
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |page, (key, value)| {
        page.replace(&format!("{{{{{}}}}}", key), &escape_html(value))
    })
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let event_name = state.config.application.event_name.as_str();
    if !state.registration.is_open() {
        return Html(render(CLOSED_HTML, &[("event_name", event_name)]));
    }

    let closes_at = state
        .registration
        .closes_at()
        .map(|at| at.to_rfc3339())
        .unwrap_or_default();
    Html(render(
        INDEX_HTML,
        &[("event_name", event_name), ("closes_at", &closes_at)],
    ))
}

pub async fn admin_login(
    State(state): State<AppState>,
    Query(params): Query<LoginParams>,
    auth: Result<AdminAuth, AppError>,
) -> Response {
    if auth.is_ok() {
        return Redirect::to("/admin").into_response();
    }

    let notice = login_notice(params.error.as_deref(), params.redirected).unwrap_or_default();
    let hidden = if notice.is_empty() { "hidden" } else { "" };
    Html(render(
        LOGIN_HTML,
        &[
            ("event_name", state.config.application.event_name.as_str()),
            ("notice", notice),
            ("notice_hidden", hidden),
        ],
    ))
    .into_response()
}

/// Dashboard shell for `/admin` and its sub-pages.
pub async fn dashboard(
    State(state): State<AppState>,
    auth: Result<AdminAuth, AppError>,
) -> Response {
    match auth {
        Ok(AdminAuth(session)) => Html(render(
            DASHBOARD_HTML,
            &[
                ("event_name", state.config.application.event_name.as_str()),
                ("admin_email", session.email.as_str()),
            ],
        ))
        .into_response(),
        Err(AppError::Forbidden(_)) => Redirect::to("/admin/login?error=not-admin").into_response(),
        Err(e @ (AppError::Backend(_) | AppError::Upstream(_))) => {
            warn!(error = %e, "Admin authorization failed");
            Redirect::to("/admin/login?error=auth-failed").into_response()
        }
        Err(_) => Redirect::to(LOGIN_REDIRECT).into_response(),
    }
}
