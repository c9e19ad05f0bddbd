//! CSV export of registrations.

use chrono::{DateTime, Utc};
use csv::{QuoteStyle, WriterBuilder};
use thiserror::Error;

use crate::error::AppError;
use crate::profile::Profile;

pub const HEADERS: [&str; 8] = [
    "Full Name",
    "Email",
    "Phone Number",
    "Facebook URL",
    "University",
    "CTF Experience",
    "Team Preference",
    "Registration Date",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data to export")]
    Empty,
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV encoding failed: {0}")]
    Encoding(String),
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Empty => AppError::NotFound(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Download filename, e.g. `securinets-registrations-2025-03-01.csv`
pub fn export_filename(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}.csv", prefix, now.format("%Y-%m-%d"))
}

/// Serializes profiles to CSV. Text columns are always quoted; the flag and
/// date columns are quoted only when needed.
pub fn profiles_to_csv(profiles: &[Profile]) -> Result<String, ExportError> {
    if profiles.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut out = String::new();
    out.push_str(&HEADERS.join(","));

    for profile in profiles {
        let text = [
            profile.full_name.as_deref().unwrap_or(""),
            profile.email.as_str(),
            profile.phone_number.as_deref().unwrap_or(""),
            profile.facebook_url.as_deref().unwrap_or(""),
            profile.university.as_deref().unwrap_or(""),
        ];
        let date = profile.created_at.format(DATE_FORMAT).to_string();
        let plain = [
            if profile.ctf_experience { "Yes" } else { "No" },
            profile.team_preference.label(),
            date.as_str(),
        ];

        out.push('\n');
        out.push_str(&encode_record(&text, QuoteStyle::Always)?);
        out.push(',');
        out.push_str(&encode_record(&plain, QuoteStyle::Necessary)?);
    }

    Ok(out)
}

/// Encodes one record with `style`, without the record terminator.
fn encode_record(fields: &[&str], style: QuoteStyle) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(style)
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    let buffer = writer
        .into_inner()
        .map_err(|e| ExportError::Encoding(e.error().to_string()))?;
    let line = String::from_utf8(buffer).map_err(|e| ExportError::Encoding(e.to_string()))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
