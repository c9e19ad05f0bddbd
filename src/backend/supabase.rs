//! HTTP client for a Supabase-style hosted backend.
//!
//! Talks to the auth API (`/auth/v1`) for sign-up, sign-in, sign-out and user
//! deletion, and to the REST table API (`/rest/v1/profiles`) for profile rows.
//! Every request carries the `apikey` header plus a bearer token: the anon key
//! for public calls, the admin's access token for dashboard calls and the
//! service-role key for user deletion.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::query::{eq, ProfileQuery};
use super::{AdminFlag, AuthSession, BackendError, HostedBackend, SignUp};
use crate::config::BackendConfig;
use crate::profile::{NewProfile, Profile, ProfileSummary};

const PROFILES_TABLE: &str = "profiles";

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

/// Sign-up answers with the bare user when email confirmation is on, and with
/// a session wrapping the user when it is off.
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    id: Option<Uuid>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct AdminRow {
    id: Uuid,
    #[serde(default)]
    is_admin: bool,
}

#[derive(Debug, Clone, Copy)]
enum Api {
    Auth,
    Rest,
}

/// Hosted backend client
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
}

impl SupabaseClient {
    /// Creates a new client from the backend configuration
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config.url.trim_end_matches('/').to_string();
        info!(url = %base_url, "Creating hosted backend client");
        if config.service_role_key.is_none() {
            warn!("No service role key configured; failed sign-ups cannot be rolled back");
        }

        Ok(Self {
            client,
            base_url,
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, PROFILES_TABLE)
    }

    fn request(&self, method: Method, url: &str, apikey: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", apikey)
            .bearer_auth(bearer)
    }

    /// Request authenticated with the anon key and the caller's bearer token
    fn as_user(&self, method: Method, url: &str, bearer: &str) -> RequestBuilder {
        self.request(method, url, &self.anon_key, bearer)
    }

    /// Passes successful responses through and turns failures into typed errors.
    async fn check(response: Response, api: Api) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        let parsed: Option<Value> = serde_json::from_str(&body).ok();
        let message = parsed
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Request failed")
                        .to_string()
                } else {
                    body.clone()
                }
            });

        error!(status = %status, error = %message, "Hosted backend request failed");

        Err(match api {
            Api::Auth => BackendError::Auth {
                status: status.as_u16(),
                message,
            },
            Api::Rest => BackendError::Api {
                status: status.as_u16(),
                code: parsed
                    .as_ref()
                    .and_then(|v| v.get("code"))
                    .and_then(|c| c.as_str())
                    .map(str::to_string),
                message,
            },
        })
    }

    async fn select_rows<T>(&self, bearer: &str, params: &[(&str, String)]) -> Result<Vec<T>, BackendError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .as_user(Method::GET, &self.table_url(), bearer)
            .query(params)
            .send()
            .await?;
        let response = Self::check(response, Api::Rest).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Picks the human-readable message out of an auth or table API error body.
fn error_message(body: &Value) -> Option<String> {
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl HostedBackend for SupabaseClient {
    async fn find_profile_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileSummary>, BackendError> {
        let rows: Vec<ProfileSummary> = self
            .select_rows(
                &self.anon_key,
                &[
                    ("select", "id,email,full_name".to_string()),
                    ("email", eq(email)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<SignUp, BackendError> {
        let response = self
            .as_user(Method::POST, &self.auth_url("signup"), &self.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await?;
        let response = Self::check(response, Api::Auth).await?;

        let body: SignUpResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        let user_id = body
            .user
            .map(|u| u.id)
            .or(body.id)
            .ok_or_else(|| BackendError::Decode("sign-up response has no user id".to_string()))?;

        info!(user_id = %user_id, "Created auth user");
        Ok(SignUp {
            user_id,
            access_token: body.access_token,
        })
    }

    async fn insert_profile(&self, signup: &SignUp, profile: &NewProfile) -> Result<(), BackendError> {
        let bearer = signup.access_token.as_deref().unwrap_or(&self.anon_key);
        let response = self
            .as_user(Method::POST, &self.table_url(), bearer)
            .header("Prefer", "return=minimal")
            .json(&[profile])
            .send()
            .await?;
        Self::check(response, Api::Rest).await?;

        info!(user_id = %profile.id, "Inserted profile");
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), BackendError> {
        let service_key = self
            .service_role_key
            .as_deref()
            .ok_or(BackendError::MissingServiceKey)?;
        let url = self.auth_url(&format!("admin/users/{}", user_id));
        let response = self
            .request(Method::DELETE, &url, service_key, service_key)
            .send()
            .await?;
        Self::check(response, Api::Auth).await?;

        info!(user_id = %user_id, "Deleted auth user");
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        debug!(email = %email, "Requesting password sign-in");
        let response = self
            .as_user(Method::POST, &self.auth_url("token"), &self.anon_key)
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let response = Self::check(response, Api::Auth).await?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        info!(user_id = %token.user.id, "Signed in");
        Ok(AuthSession {
            user_id: token.user.id,
            email: token.user.email.unwrap_or_else(|| email.to_string()),
            access_token: token.access_token,
            expires_in: token.expires_in,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let response = self
            .as_user(Method::POST, &self.auth_url("logout"), access_token)
            .send()
            .await?;
        Self::check(response, Api::Auth).await?;
        Ok(())
    }

    async fn is_admin(&self, access_token: &str, user_id: Uuid) -> Result<bool, BackendError> {
        let rows: Vec<AdminRow> = self
            .select_rows(
                access_token,
                &[
                    ("select", "id,is_admin".to_string()),
                    ("id", eq(&user_id.to_string())),
                ],
            )
            .await?;
        Ok(rows.first().map_or(false, |row| row.is_admin))
    }

    async fn list_profiles(
        &self,
        access_token: &str,
        query: &ProfileQuery,
    ) -> Result<Vec<Profile>, BackendError> {
        let rows: Vec<Profile> = self.select_rows(access_token, &query.to_params()).await?;
        debug!(count = rows.len(), "Fetched profiles");
        Ok(rows)
    }

    async fn get_profile(
        &self,
        access_token: &str,
        id: Uuid,
    ) -> Result<Option<Profile>, BackendError> {
        let rows: Vec<Profile> = self
            .select_rows(
                access_token,
                &[("select", "*".to_string()), ("id", eq(&id.to_string()))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn find_admin_flag(
        &self,
        access_token: &str,
        email: &str,
    ) -> Result<Option<AdminFlag>, BackendError> {
        let rows: Vec<AdminRow> = self
            .select_rows(
                access_token,
                &[
                    ("select", "id,is_admin".to_string()),
                    ("email", eq(email)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| AdminFlag {
            id: row.id,
            is_admin: row.is_admin,
        }))
    }

    async fn grant_admin(&self, access_token: &str, email: &str) -> Result<(), BackendError> {
        let response = self
            .as_user(Method::PATCH, &self.table_url(), access_token)
            .query(&[("email", eq(email))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "is_admin": true }))
            .send()
            .await?;
        Self::check(response, Api::Rest).await?;

        info!(email = %email, "Granted admin privileges");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::TeamPreference;
    use mockito::Matcher;

    const USER_ID: &str = "6f1c2a52-8f2e-4d7e-9a55-0d7c1f0e9b11";

    fn client(url: String, service_role_key: Option<&str>) -> SupabaseClient {
        SupabaseClient::new(&BackendConfig {
            url,
            anon_key: "anon".to_string(),
            service_role_key: service_role_key.map(str::to_string),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn user_id() -> Uuid {
        Uuid::parse_str(USER_ID).unwrap()
    }

    #[tokio::test]
    async fn test_find_profile_by_email() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/profiles")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "id,email,full_name".into()),
                Matcher::UrlEncoded("email".into(), "eq.alice@enit.tn".into()),
            ]))
            .match_header("apikey", "anon")
            .match_header("authorization", "Bearer anon")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"[{{"id":"{}","email":"alice@enit.tn","full_name":"Alice"}}]"#,
                USER_ID
            ))
            .create_async()
            .await;

        let found = client(server.url(), None)
            .find_profile_by_email("alice@enit.tn")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.id, user_id());
        assert_eq!(found.full_name.as_deref(), Some("Alice"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_profile_by_email_empty_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/profiles")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let found = client(server.url(), None)
            .find_profile_by_email("nobody@enit.tn")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_with_confirmation_returns_bare_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/v1/signup")
            .match_body(Matcher::PartialJson(json!({
                "email": "alice@enit.tn",
                "data": { "full_name": "Alice" }
            })))
            .with_status(200)
            .with_body(format!(r#"{{"id":"{}","email":"alice@enit.tn"}}"#, USER_ID))
            .create_async()
            .await;

        let signup = client(server.url(), None)
            .sign_up("alice@enit.tn", "hunter22", "Alice")
            .await
            .unwrap();

        assert_eq!(signup, SignUp { user_id: user_id(), access_token: None });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sign_up_without_confirmation_returns_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/signup")
            .with_status(200)
            .with_body(format!(
                r#"{{"access_token":"tok","token_type":"bearer","user":{{"id":"{}"}}}}"#,
                USER_ID
            ))
            .create_async()
            .await;

        let signup = client(server.url(), None)
            .sign_up("alice@enit.tn", "hunter22", "Alice")
            .await
            .unwrap();
        assert_eq!(signup.access_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_sign_up_error_carries_backend_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/signup")
            .with_status(422)
            .with_body(r#"{"code":422,"msg":"User already registered"}"#)
            .create_async()
            .await;

        let err = client(server.url(), None)
            .sign_up("alice@enit.tn", "hunter22", "Alice")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "User already registered");
        assert_eq!(err.status(), Some(422));
    }

    #[tokio::test]
    async fn test_insert_profile_uses_signup_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/profiles")
            .match_header("authorization", "Bearer user-token")
            .match_header("prefer", "return=minimal")
            .match_body(Matcher::PartialJson(json!([{
                "email": "alice@enit.tn",
                "team_preference": "team",
                "is_admin": false
            }])))
            .with_status(201)
            .create_async()
            .await;

        let profile = NewProfile {
            id: user_id(),
            full_name: "Alice".to_string(),
            email: "alice@enit.tn".to_string(),
            phone_number: None,
            facebook_url: None,
            university: None,
            ctf_experience: true,
            team_preference: TeamPreference::Team,
            participation_mode: None,
            is_admin: false,
        };
        let signup = SignUp {
            user_id: user_id(),
            access_token: Some("user-token".to_string()),
        };

        client(server.url(), None)
            .insert_profile(&signup, &profile)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_table_error_keeps_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/profiles")
            .with_status(409)
            .with_body(r#"{"code":"23505","message":"duplicate key value violates unique constraint","details":null,"hint":null}"#)
            .create_async()
            .await;

        let signup = SignUp { user_id: user_id(), access_token: None };
        let profile = NewProfile {
            id: user_id(),
            full_name: "Alice".to_string(),
            email: "alice@enit.tn".to_string(),
            phone_number: None,
            facebook_url: None,
            university: None,
            ctf_experience: false,
            team_preference: TeamPreference::Solo,
            participation_mode: None,
            is_admin: false,
        };

        let err = client(server.url(), None)
            .insert_profile(&signup, &profile)
            .await
            .unwrap_err();
        match err {
            BackendError::Api { status, code, message } => {
                assert_eq!(status, 409);
                assert_eq!(code.as_deref(), Some("23505"));
                assert!(message.starts_with("duplicate key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_user_requires_service_key() {
        let err = client("http://127.0.0.1:9".to_string(), None)
            .delete_user(user_id())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingServiceKey));
    }

    #[tokio::test]
    async fn test_delete_user_uses_service_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", format!("/auth/v1/admin/users/{}", USER_ID).as_str())
            .match_header("apikey", "service")
            .match_header("authorization", "Bearer service")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        client(server.url(), Some("service"))
            .delete_user(user_id())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sign_in() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "password".into()))
            .with_status(200)
            .with_body(format!(
                r#"{{"access_token":"at","refresh_token":"rt","expires_in":3600,"token_type":"bearer","user":{{"id":"{}","email":"admin@securinets.org"}}}}"#,
                USER_ID
            ))
            .create_async()
            .await;

        let session = client(server.url(), None)
            .sign_in("admin@securinets.org", "longenough")
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id());
        assert_eq!(session.access_token, "at");
        assert_eq!(session.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn test_sign_in_bad_credentials_is_400() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/v1/token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
            .create_async()
            .await;

        let err = client(server.url(), None)
            .sign_in("admin@securinets.org", "wrongpass")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_is_admin_missing_row_is_false() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/profiles")
            .match_query(Matcher::UrlEncoded("id".into(), format!("eq.{}", USER_ID)))
            .match_header("authorization", "Bearer at")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        assert!(!client(server.url(), None).is_admin("at", user_id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_profiles_sends_search_and_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/profiles")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "or".into(),
                    r#"(full_name.ilike."*enit*",email.ilike."*enit*",university.ilike."*enit*")"#.into(),
                ),
                Matcher::UrlEncoded("order".into(), "full_name.asc".into()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"[{{"id":"{}","full_name":"Alice","email":"alice@enit.tn","phone_number":null,"facebook_url":null,"university":"ENIT","ctf_experience":true,"team_preference":"team","is_admin":false,"created_at":"2025-03-01T09:30:00+00:00"}}]"#,
                USER_ID
            ))
            .create_async()
            .await;

        let query = ProfileQuery {
            search: Some("enit".to_string()),
            sort_by: crate::backend::SortColumn::FullName,
            order: crate::backend::SortOrder::Asc,
        };
        let rows = client(server.url(), None).list_profiles("at", &query).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].university.as_deref(), Some("ENIT"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_grant_admin_patches_by_email() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/rest/v1/profiles")
            .match_query(Matcher::UrlEncoded("email".into(), "eq.bob@enit.tn".into()))
            .match_body(Matcher::Json(json!({ "is_admin": true })))
            .with_status(204)
            .create_async()
            .await;

        client(server.url(), None)
            .grant_admin("at", "bob@enit.tn")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_admin_flag() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/profiles")
            .match_query(Matcher::UrlEncoded("email".into(), "eq.bob@enit.tn".into()))
            .with_status(200)
            .with_body(format!(r#"[{{"id":"{}","is_admin":true}}]"#, USER_ID))
            .create_async()
            .await;

        let flag = client(server.url(), None)
            .find_admin_flag("at", "bob@enit.tn")
            .await
            .unwrap();
        assert_eq!(flag, Some(AdminFlag { id: user_id(), is_admin: true }));
    }
}
