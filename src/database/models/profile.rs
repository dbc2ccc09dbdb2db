use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Named visual themes a profile page can render with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Classic,
    Midnight,
    Sunset,
    Forest,
    Ocean,
    Minimal,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Classic,
        Theme::Midnight,
        Theme::Sunset,
        Theme::Forest,
        Theme::Ocean,
        Theme::Minimal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Classic => "classic",
            Theme::Midnight => "midnight",
            Theme::Sunset => "sunset",
            Theme::Forest => "forest",
            Theme::Ocean => "ocean",
            Theme::Minimal => "minimal",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Theme::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("Unknown theme '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub handle: String,
    pub headline: Option<String>,
    pub theme: Theme,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Link {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub order_index: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A profile with its links in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileWithLinks {
    #[serde(flatten)]
    pub profile: Profile,
    pub links: Vec<Link>,
}

/// Save payload. `id` absent means create.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePayload {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub links: Vec<LinkPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkPayload {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Row to insert for a new profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub handle: String,
    pub headline: Option<String>,
    pub theme: Theme,
    pub is_active: bool,
}

/// Full-replace of a profile's scalar fields. The active flag is owned by the
/// activation path and never written here.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub id: Uuid,
    pub name: String,
    pub handle: String,
    pub headline: Option<String>,
    pub theme: Theme,
}

#[derive(Debug, Clone)]
pub struct NewLink {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub order_index: i32,
    pub is_active: bool,
}

/// The slice of a profile the active-profile planner looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCandidate {
    pub id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Profile> for ActiveCandidate {
    fn from(p: &Profile) -> Self {
        Self {
            id: p.id,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// What a public page visitor sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub profile: Profile,
    pub links: Vec<Link>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parses_case_insensitively() {
        assert_eq!("Midnight".parse::<Theme>(), Ok(Theme::Midnight));
        assert_eq!(" ocean ".parse::<Theme>(), Ok(Theme::Ocean));
        assert!("neon".parse::<Theme>().is_err());
    }

    #[test]
    fn link_payload_defaults_to_active() {
        let link: LinkPayload = serde_json::from_str(r#"{"title":"A","url":"https://a"}"#).unwrap();
        assert!(link.is_active);
        assert!(link.id.is_none());
    }
}
