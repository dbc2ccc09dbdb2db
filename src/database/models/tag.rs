use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    Unclaimed,
    Claimed,
    Retired,
}

impl TagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagStatus::Unclaimed => "unclaimed",
            TagStatus::Claimed => "claimed",
            TagStatus::Retired => "retired",
        }
    }
}

impl FromStr for TagStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unclaimed" => Ok(TagStatus::Unclaimed),
            "claimed" => Ok(TagStatus::Claimed),
            "retired" => Ok(TagStatus::Retired),
            other => Err(format!("Unknown tag status '{}'", other)),
        }
    }
}

/// A physical NFC chip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareTag {
    pub id: Uuid,
    pub chip_uid: String,
    pub claim_code: String,
    pub status: TagStatus,
    pub claim_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl HardwareTag {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.claim_expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Binding of a claimed tag to an account. A `None` profile means "follow the
/// account's active profile".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagAssignment {
    pub id: Uuid,
    pub tag_id: Uuid,
    pub user_id: String,
    pub profile_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagWithAssignment {
    #[serde(flatten)]
    pub tag: HardwareTag,
    pub assignment: Option<TagAssignment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapResolution {
    pub tag_id: Uuid,
    pub username: String,
    pub profile_id: Uuid,
    pub profile_handle: String,
    pub redirect_path: String,
}
