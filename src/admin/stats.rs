//! Dashboard statistics computed from fetched profile rows.

use serde::Serialize;
use uuid::Uuid;

use crate::profile::{ParticipationMode, Profile, TeamPreference};

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_registrations: usize,
    pub with_ctf_experience: usize,
    pub solo_preference: usize,
    pub team_preference: usize,
    pub online_participation: usize,
    pub onsite_participation: usize,
}

/// One line of the dashboard's profile table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub ctf_experience: &'static str,
    pub team_preference: &'static str,
    pub participation_mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub totals: Totals,
    pub profiles: Vec<ProfileRow>,
}

impl DashboardStats {
    pub fn from_profiles(profiles: &[Profile]) -> Self {
        let mut totals = Totals {
            total_registrations: profiles.len(),
            ..Default::default()
        };

        for profile in profiles {
            if profile.ctf_experience {
                totals.with_ctf_experience += 1;
            }
            match profile.team_preference {
                TeamPreference::Solo => totals.solo_preference += 1,
                TeamPreference::Team => totals.team_preference += 1,
            }
            match profile.participation() {
                Some(ParticipationMode::Online) => totals.online_participation += 1,
                Some(ParticipationMode::Onsite) => totals.onsite_participation += 1,
                None => {}
            }
        }

        let profiles = profiles
            .iter()
            .map(|p| ProfileRow {
                id: p.id,
                full_name: p.full_name.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                email: p.email.clone(),
                ctf_experience: if p.ctf_experience { "Yes" } else { "No" },
                team_preference: p.team_preference.as_str(),
                participation_mode: p
                    .participation_mode
                    .as_deref()
                    .filter(|mode| !mode.is_empty())
                    .unwrap_or(NOT_AVAILABLE)
                    .to_string(),
            })
            .collect();

        Self { totals, profiles }
    }
}
