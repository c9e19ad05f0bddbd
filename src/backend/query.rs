//! Query-string construction for the hosted table API.
//!
//! Search text is embedded in a PostgREST `or=(...)` filter, so every value is
//! double-quoted and backslash-escaped. Sort columns are an enum, which keeps
//! user input out of the `order` parameter entirely.

use serde::Deserialize;

/// Columns the registrations list may be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    FullName,
    Email,
    University,
    CtfExperience,
    TeamPreference,
    #[default]
    CreatedAt,
}

impl SortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::FullName => "full_name",
            SortColumn::Email => "email",
            SortColumn::University => "university",
            SortColumn::CtfExperience => "ctf_experience",
            SortColumn::TeamPreference => "team_preference",
            SortColumn::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Search and ordering for the registrations list
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProfileQuery {
    pub search: Option<String>,
    pub sort_by: SortColumn,
    pub order: SortOrder,
}

impl ProfileQuery {
    /// Query parameters for `GET /rest/v1/profiles`
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("select", "*".to_string())];
        if let Some(filter) = self.search.as_deref().and_then(search_filter) {
            params.push(("or", filter));
        }
        params.push((
            "order",
            format!("{}.{}", self.sort_by.as_str(), self.order.as_str()),
        ));
        params
    }
}

/// Quotes a value for use inside a PostgREST logical filter.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Case-insensitive substring match over name, email and university.
/// Blank input yields no filter.
pub fn search_filter(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let pattern = quote(&format!("*{}*", term));
    Some(format!(
        "(full_name.ilike.{p},email.ilike.{p},university.ilike.{p})",
        p = pattern
    ))
}

/// `column=eq.value` filter value
pub fn eq(value: &str) -> String {
    format!("eq.{}", value)
}
