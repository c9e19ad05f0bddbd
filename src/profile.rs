//! Registrant profile model.
//!
//! Mirrors the `profiles` table kept by the hosted backend. The row id is the
//! id of the auth user created at sign-up.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a registrant wants to compete alone or in a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamPreference {
    #[default]
    Solo,
    Team,
}

impl TeamPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamPreference::Solo => "solo",
            TeamPreference::Team => "team",
        }
    }

    /// Capitalized label used in exports and the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            TeamPreference::Solo => "Solo",
            TeamPreference::Team => "Team",
        }
    }
}

impl FromStr for TeamPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solo" => Ok(TeamPreference::Solo),
            "team" => Ok(TeamPreference::Team),
            other => Err(format!("unknown team preference: {}", other)),
        }
    }
}

impl fmt::Display for TeamPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a registrant attends the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationMode {
    Online,
    Onsite,
}

impl ParticipationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationMode::Online => "online",
            ParticipationMode::Onsite => "onsite",
        }
    }
}

impl FromStr for ParticipationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(ParticipationMode::Online),
            "onsite" => Ok(ParticipationMode::Onsite),
            other => Err(format!("unknown participation mode: {}", other)),
        }
    }
}

impl fmt::Display for ParticipationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored registrant record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: String,
    pub phone_number: Option<String>,
    pub facebook_url: Option<String>,
    pub university: Option<String>,
    #[serde(default)]
    pub ctf_experience: bool,
    #[serde(default)]
    pub team_preference: TeamPreference,
    /// Stored as written; older rows may hold values outside [`ParticipationMode`]
    #[serde(default)]
    pub participation_mode: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// The participation mode, when the stored value is a known one
    pub fn participation(&self) -> Option<ParticipationMode> {
        self.participation_mode.as_deref()?.parse().ok()
    }
}

/// The fields returned by the email uniqueness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

/// Registrant-supplied profile fields, already validated and normalized
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfileFields {
    pub full_name: String,
    pub phone_number: Option<String>,
    pub facebook_url: Option<String>,
    pub university: Option<String>,
    pub ctf_experience: bool,
    pub team_preference: TeamPreference,
    pub participation_mode: Option<ParticipationMode>,
}

/// Insert payload for the `profiles` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub facebook_url: Option<String>,
    pub university: Option<String>,
    pub ctf_experience: bool,
    pub team_preference: TeamPreference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participation_mode: Option<ParticipationMode>,
    pub is_admin: bool,
}

impl NewProfile {
    /// Builds the row for a freshly signed-up user. New registrants are never admins.
    pub fn new(id: Uuid, email: impl Into<String>, fields: NewProfileFields) -> Self {
        Self {
            id,
            full_name: fields.full_name,
            email: email.into(),
            phone_number: fields.phone_number,
            facebook_url: fields.facebook_url,
            university: fields.university,
            ctf_experience: fields.ctf_experience,
            team_preference: fields.team_preference,
            participation_mode: fields.participation_mode,
            is_admin: false,
        }
    }
}
