//! JSON endpoints.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::admin::DashboardStats;
use crate::backend::ProfileQuery;
use crate::config::AdminConfig;
use crate::error::AppError;
use crate::registration::{EmailCheck, RegistrationOutcome, ALREADY_REGISTERED};
use crate::validation::RegistrationForm;
use crate::web::extract::{session_cookie, AdminAuth};
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckEmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantAdminRequest {
    #[serde(default)]
    pub email: String,
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.config.application.name,
        "registrationOpen": state.registration.is_open(),
    }))
}

pub async fn check_email(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<CheckEmailRequest>, AppError>,
) -> Json<EmailCheck> {
    Json(state.registration.check_email(request.email.trim()).await)
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(form), _): WithRejection<Json<RegistrationForm>, AppError>,
) -> Result<Response, AppError> {
    let response = match state.registration.register(form).await? {
        RegistrationOutcome::Registered { message } => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "message": message })),
        ),
        RegistrationOutcome::AlreadyRegistered { profile } => (
            StatusCode::CONFLICT,
            Json(json!({
                "success": false,
                "error": ALREADY_REGISTERED,
                "alreadyRegistered": true,
                "profile": profile,
            })),
        ),
    };
    Ok(response.into_response())
}

fn build_session_cookie(config: &AdminConfig, value: String) -> Cookie<'static> {
    Cookie::build((config.session_cookie.clone(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .build()
}

pub async fn admin_login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, Json<Value>), AppError> {
    let session = state.admin.login(&request.email, &request.password).await?;
    let cookie = build_session_cookie(&state.config.admin, session.id);
    Ok((
        jar.add(cookie),
        Json(json!({ "success": true, "redirect": "/admin" })),
    ))
}

pub async fn admin_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    if let Some(session_id) = session_cookie(&headers, &state) {
        state.admin.logout(&session_id).await;
    }
    let removal = build_session_cookie(&state.config.admin, String::new());
    (
        jar.remove(removal),
        Json(json!({ "success": true, "redirect": "/admin/login" })),
    )
}

pub async fn stats(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(state.admin.stats(&session).await?))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
    WithRejection(Query(query), _): WithRejection<Query<ProfileQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    let registrations = state.admin.registrations(&session, &query).await?;
    Ok(Json(json!({
        "success": true,
        "count": registrations.len(),
        "registrations": registrations,
    })))
}

pub async fn get_registration(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let registration = state.admin.registration(&session, id).await?;
    Ok(Json(json!({ "success": true, "registration": registration })))
}

pub async fn export(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
) -> Result<Response, AppError> {
    let export = state.admin.export_csv(&session).await?;
    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.content,
    )
        .into_response())
}

pub async fn grant_admin(
    State(state): State<AppState>,
    AdminAuth(session): AdminAuth,
    WithRejection(Json(request), _): WithRejection<Json<GrantAdminRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    let message = state.admin.grant_admin(&session, &request.email).await?;
    info!(email = %request.email.trim(), "Admin grant completed");
    Ok(Json(json!({ "success": true, "message": message })))
}
