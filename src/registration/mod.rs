//! Public registration flow.
//!
//! 1. Reject submissions once the registration window has closed
//! 2. Validate the form fields
//! 3. Throttle repeated attempts for the same email
//! 4. Look up the email once; an existing profile ends the flow
//! 5. Create the auth user at the hosted backend
//! 6. Insert the profile row, deleting the auth user again if that fails

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::backend::{BackendError, HostedBackend};
use crate::error::AppError;
use crate::profile::{NewProfile, ProfileSummary};
use crate::rate_limit::RateLimiter;
use crate::validation::{is_valid_email, validate_registration, RegistrationForm};

pub const SUCCESS_MESSAGE: &str = "Registration successful! Check your email for confirmation.";
pub const ALREADY_REGISTERED: &str = "You are already registered";

/// Answer to the email uniqueness check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailCheck {
    pub exists: bool,
    pub profile: Option<ProfileSummary>,
}

impl EmailCheck {
    fn absent() -> Self {
        Self {
            exists: false,
            profile: None,
        }
    }
}

/// Result of a registration attempt that reached the backend
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    Registered { message: String },
    AlreadyRegistered { profile: ProfileSummary },
}

pub struct RegistrationService {
    backend: Arc<dyn HostedBackend>,
    limiter: RateLimiter,
    closes_at: Option<DateTime<Utc>>,
}

impl RegistrationService {
    pub fn new(
        backend: Arc<dyn HostedBackend>,
        limiter: RateLimiter,
        closes_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            backend,
            limiter,
            closes_at,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closes_at.map_or(true, |closes_at| Utc::now() < closes_at)
    }

    pub fn closes_at(&self) -> Option<DateTime<Utc>> {
        self.closes_at
    }

    /// Advisory lookup used while the registrant is still typing. Malformed
    /// emails and backend failures both report "not registered".
    pub async fn check_email(&self, email: &str) -> EmailCheck {
        if !is_valid_email(email) {
            return EmailCheck::absent();
        }
        match self.backend.find_profile_by_email(email).await {
            Ok(Some(profile)) => EmailCheck {
                exists: true,
                profile: Some(profile),
            },
            Ok(None) => EmailCheck::absent(),
            Err(e) => {
                warn!(error = %e, "Email lookup failed");
                EmailCheck::absent()
            }
        }
    }

    pub async fn register(&self, form: RegistrationForm) -> Result<RegistrationOutcome, AppError> {
        if !self.is_open() {
            return Err(AppError::RegistrationClosed);
        }

        let valid = validate_registration(&form).map_err(AppError::Validation)?;

        if !self
            .limiter
            .check_rate_limit(&valid.email.to_lowercase())
            .await
        {
            return Err(AppError::RateLimited(
                "Too many registration attempts. Please try again later.".to_string(),
            ));
        }

        if let Some(profile) = self.backend.find_profile_by_email(&valid.email).await? {
            info!(email = %valid.email, "Registration for an existing email");
            return Ok(RegistrationOutcome::AlreadyRegistered { profile });
        }

        let signup = self
            .backend
            .sign_up(&valid.email, &valid.password, &valid.fields.full_name)
            .await
            .map_err(sign_up_error)?;

        let profile = NewProfile::new(signup.user_id, valid.email.clone(), valid.fields);
        if let Err(e) = self.backend.insert_profile(&signup, &profile).await {
            error!(user_id = %signup.user_id, error = %e, "Profile insert failed, rolling back sign-up");
            if let Err(rollback) = self.backend.delete_user(signup.user_id).await {
                error!(user_id = %signup.user_id, error = %rollback, "Failed to delete orphaned auth user");
            }
            return Err(AppError::Upstream(format!("Failed to create profile: {}", e)));
        }

        info!(user_id = %signup.user_id, "Registration complete");
        Ok(RegistrationOutcome::Registered {
            message: SUCCESS_MESSAGE.to_string(),
        })
    }
}

/// Client errors from the auth API are shown to the registrant as-is.
fn sign_up_error(e: BackendError) -> AppError {
    match e {
        BackendError::Auth { status, message } if (400..500).contains(&status) => {
            if message.trim().is_empty() {
                AppError::Validation("Failed to register user".to_string())
            } else {
                AppError::Validation(message)
            }
        }
        other => {
            error!(error = %other, "Sign-up failed");
            AppError::Upstream("Failed to register user".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockHostedBackend, SignUp};
    use crate::profile::TeamPreference;
    use crate::rate_limit::RateLimitConfig;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;
    use uuid::Uuid;

    fn limiter(max_attempts: u32) -> RateLimiter {
        RateLimiter::new(
            "registration",
            RateLimitConfig {
                max_attempts,
                window: Duration::from_secs(60),
            },
        )
    }

    fn service(backend: MockHostedBackend) -> RegistrationService {
        RegistrationService::new(Arc::new(backend), limiter(5), None)
    }

    fn form() -> RegistrationForm {
        RegistrationForm {
            email: "alice@enit.tn".to_string(),
            password: "hunter22".to_string(),
            full_name: "Alice".to_string(),
            university: "ENIT".to_string(),
            ctf_experience: "yes".to_string(),
            team_preference: "team".to_string(),
            participation_mode: "onsite".to_string(),
            ..Default::default()
        }
    }

    fn summary() -> ProfileSummary {
        ProfileSummary {
            id: Uuid::new_v4(),
            email: "alice@enit.tn".to_string(),
            full_name: Some("Alice".to_string()),
        }
    }

    #[tokio::test]
    async fn test_successful_registration() {
        let user_id = Uuid::new_v4();
        let mut backend = MockHostedBackend::new();
        backend
            .expect_find_profile_by_email()
            .withf(|email| email == "alice@enit.tn")
            .times(1)
            .returning(|_| Ok(None));
        backend
            .expect_sign_up()
            .withf(|email, password, name| {
                email == "alice@enit.tn" && password == "hunter22" && name == "Alice"
            })
            .times(1)
            .returning(move |_, _, _| {
                Ok(SignUp {
                    user_id,
                    access_token: None,
                })
            });
        backend
            .expect_insert_profile()
            .withf(move |signup, profile| {
                signup.user_id == user_id
                    && profile.id == user_id
                    && !profile.is_admin
                    && profile.team_preference == TeamPreference::Team
                    && profile.university.as_deref() == Some("ENIT")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        backend.expect_delete_user().never();

        let outcome = service(backend).register(form()).await.unwrap();
        assert_eq!(
            outcome,
            RegistrationOutcome::Registered {
                message: SUCCESS_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_existing_email_short_circuits() {
        let existing = summary();
        let returned = existing.clone();
        let mut backend = MockHostedBackend::new();
        backend
            .expect_find_profile_by_email()
            .returning(move |_| Ok(Some(returned.clone())));
        backend.expect_sign_up().never();

        let outcome = service(backend).register(form()).await.unwrap();
        assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered { profile: existing });
    }

    #[tokio::test]
    async fn test_validation_failure_never_calls_backend() {
        let mut backend = MockHostedBackend::new();
        backend.expect_find_profile_by_email().never();

        let mut f = form();
        f.facebook_url = "https://twitter.com/alice".to_string();
        let err = service(backend).register(f).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m == "Invalid Facebook URL"));
    }

    #[tokio::test]
    async fn test_profile_failure_rolls_back_auth_user() {
        let user_id = Uuid::new_v4();
        let mut backend = MockHostedBackend::new();
        backend.expect_find_profile_by_email().returning(|_| Ok(None));
        backend.expect_sign_up().returning(move |_, _, _| {
            Ok(SignUp {
                user_id,
                access_token: Some("tok".to_string()),
            })
        });
        backend.expect_insert_profile().returning(|_, _| {
            Err(BackendError::Api {
                status: 403,
                code: Some("42501".to_string()),
                message: "new row violates row-level security policy".to_string(),
            })
        });
        backend
            .expect_delete_user()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| Ok(()));

        let err = service(backend).register(form()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to create profile: new row violates row-level security policy"
        );
    }

    #[tokio::test]
    async fn test_rollback_failure_still_reports_profile_error() {
        let mut backend = MockHostedBackend::new();
        backend.expect_find_profile_by_email().returning(|_| Ok(None));
        backend.expect_sign_up().returning(|_, _, _| {
            Ok(SignUp {
                user_id: Uuid::new_v4(),
                access_token: None,
            })
        });
        backend.expect_insert_profile().returning(|_, _| {
            Err(BackendError::Api {
                status: 500,
                code: None,
                message: "boom".to_string(),
            })
        });
        backend
            .expect_delete_user()
            .times(1)
            .returning(|_| Err(BackendError::MissingServiceKey));

        let err = service(backend).register(form()).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(ref m) if m == "Failed to create profile: boom"));
    }

    #[tokio::test]
    async fn test_sign_up_client_error_message_passes_through() {
        let mut backend = MockHostedBackend::new();
        backend.expect_find_profile_by_email().returning(|_| Ok(None));
        backend.expect_sign_up().returning(|_, _, _| {
            Err(BackendError::Auth {
                status: 422,
                message: "Password should be at least 6 characters".to_string(),
            })
        });
        backend.expect_insert_profile().never();

        let err = service(backend).register(form()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Password should be at least 6 characters"));
    }

    #[tokio::test]
    async fn test_sign_up_server_error_is_generic() {
        let mut backend = MockHostedBackend::new();
        backend.expect_find_profile_by_email().returning(|_| Ok(None));
        backend.expect_sign_up().returning(|_, _, _| {
            Err(BackendError::Auth {
                status: 503,
                message: "upstream unavailable".to_string(),
            })
        });

        let err = service(backend).register(form()).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(ref m) if m == "Failed to register user"));
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts_registration() {
        let mut backend = MockHostedBackend::new();
        backend.expect_find_profile_by_email().returning(|_| {
            Err(BackendError::Api {
                status: 500,
                code: None,
                message: "db down".to_string(),
            })
        });
        backend.expect_sign_up().never();

        let err = service(backend).register(form()).await.unwrap_err();
        assert!(matches!(err, AppError::Backend(_)));
    }

    #[tokio::test]
    async fn test_closed_registration() {
        let mut backend = MockHostedBackend::new();
        backend.expect_find_profile_by_email().never();
        let service = RegistrationService::new(
            Arc::new(backend),
            limiter(5),
            Some(Utc::now() - ChronoDuration::minutes(1)),
        );

        assert!(!service.is_open());
        let err = service.register(form()).await.unwrap_err();
        assert!(matches!(err, AppError::RegistrationClosed));
    }

    #[tokio::test]
    async fn test_rate_limit_is_case_insensitive() {
        let mut backend = MockHostedBackend::new();
        backend
            .expect_find_profile_by_email()
            .times(1)
            .returning(|_| Ok(Some(summary())));
        let service = RegistrationService::new(Arc::new(backend), limiter(1), None);

        service.register(form()).await.unwrap();
        let mut shouting = form();
        shouting.email = "ALICE@ENIT.TN".to_string();
        let err = service.register(shouting).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_check_email() {
        let mut backend = MockHostedBackend::new();
        backend
            .expect_find_profile_by_email()
            .withf(|email| email == "alice@enit.tn")
            .returning(|_| Ok(Some(summary())));
        backend
            .expect_find_profile_by_email()
            .withf(|email| email == "down@enit.tn")
            .returning(|_| Err(BackendError::Decode("bad".to_string())));
        let service = service(backend);

        assert!(service.check_email("alice@enit.tn").await.exists);
        assert_eq!(service.check_email("not-an-email").await, EmailCheck::absent());
        assert_eq!(service.check_email("down@enit.tn").await, EmailCheck::absent());
    }
}
