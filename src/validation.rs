//! Field format checks for the registration and admin forms.
//!
//! Every check returns the exact message shown to the user, so the web layer
//! can pass it through unchanged.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::profile::{NewProfileFields, ParticipationMode, TeamPreference};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{8,}$").expect("valid phone regex"));
static FACEBOOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(www\.)?facebook\.com/.+$").expect("valid facebook regex")
});

/// Minimum registrant password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Raw registration form as submitted by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone_number: String,
    pub facebook_url: String,
    pub university: String,
    /// `"yes"` or `"no"`
    pub ctf_experience: String,
    /// `"solo"` or `"team"`
    pub team_preference: String,
    /// `"online"` or `"onsite"`, optional
    pub participation_mode: String,
}

/// A form that passed every check, with optional fields normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRegistration {
    pub email: String,
    pub password: String,
    pub fields: NewProfileFields,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn is_valid_facebook_url(url: &str) -> bool {
    FACEBOOK_RE.is_match(url)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Validates a registration form. The first failing check wins.
pub fn validate_registration(form: &RegistrationForm) -> Result<ValidRegistration, String> {
    if form.email.is_empty() || !is_valid_email(&form.email) {
        return Err("Invalid email address".to_string());
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 6 characters".to_string());
    }
    if form.full_name.is_empty() {
        return Err("Full name is required".to_string());
    }
    let team_preference: TeamPreference = form
        .team_preference
        .parse()
        .map_err(|_| "Invalid team preference".to_string())?;
    if !form.phone_number.is_empty() && !is_valid_phone(&form.phone_number) {
        return Err("Invalid phone number".to_string());
    }
    if !form.facebook_url.is_empty() && !is_valid_facebook_url(&form.facebook_url) {
        return Err("Invalid Facebook URL".to_string());
    }
    let participation_mode = match form.participation_mode.as_str() {
        "" => None,
        mode => Some(
            mode.parse::<ParticipationMode>()
                .map_err(|_| "Invalid participation mode".to_string())?,
        ),
    };

    Ok(ValidRegistration {
        email: form.email.clone(),
        password: form.password.clone(),
        fields: NewProfileFields {
            full_name: form.full_name.clone(),
            phone_number: non_empty(&form.phone_number),
            facebook_url: non_empty(&form.facebook_url),
            university: non_empty(&form.university),
            ctf_experience: form.ctf_experience == "yes",
            team_preference,
            participation_mode,
        },
    })
}

/// Validates the admin login form.
pub fn validate_admin_login(
    email: &str,
    password: &str,
    min_password_length: usize,
) -> Result<(), String> {
    if !is_valid_email(email) {
        return Err("Please enter a valid email address".to_string());
    }
    if password.chars().count() < min_password_length {
        return Err(format!(
            "Password must be at least {} characters long",
            min_password_length
        ));
    }
    Ok(())
}
