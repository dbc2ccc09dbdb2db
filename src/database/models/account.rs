use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Public identity for an auth user. `username` is the account's public handle
/// and stays `None` until the resolver assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub user_id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_path: Option<String>,
    pub avatar_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Avatar reference with a version query so CDNs drop stale copies.
    pub fn avatar_url(&self) -> Option<String> {
        let path = self.avatar_path.as_deref()?;
        match self.avatar_updated_at {
            Some(ts) => Some(format!("{}?v={}", path, ts.timestamp())),
            None => Some(path.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    pub display_name: Option<String>,
    pub avatar_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn avatar_url_carries_version() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let account = Account {
            user_id: "u1".into(),
            username: Some("jess".into()),
            display_name: None,
            avatar_path: Some("avatars/u1.png".into()),
            avatar_updated_at: Some(ts),
            created_at: ts,
            updated_at: ts,
        };
        assert_eq!(
            account.avatar_url().as_deref(),
            Some(format!("avatars/u1.png?v={}", ts.timestamp()).as_str())
        );
    }
}
