use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct VcardProfile {
    pub id: Uuid,
    pub user_id: String,
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    /// Base64 image payload, embedded verbatim in the card.
    pub photo_data: Option<String>,
    pub photo_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VcardPayload {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub photo_data: Option<String>,
    #[serde(default)]
    pub photo_name: Option<String>,
}

impl From<VcardProfile> for VcardPayload {
    fn from(v: VcardProfile) -> Self {
        Self {
            full_name: v.full_name,
            title: v.title,
            email: v.email,
            phone: v.phone,
            company: v.company,
            website: v.website,
            address: v.address,
            note: v.note,
            photo_data: v.photo_data,
            photo_name: v.photo_name,
        }
    }
}
