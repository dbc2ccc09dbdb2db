use tracing::{debug, info};

use crate::config::HandleConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{Account, AccountUpdate};
use crate::database::Store;
use crate::services::{ServiceError, ServiceResult};

const MAX_SUFFIX_ATTEMPTS: u32 = 1000;

/// Lowercase, URL-safe form of a handle: keeps `[a-z0-9_-]`, turns spaces
/// and dots into `-`, collapses dash runs and strips them from the ends.
pub fn normalize_handle(raw: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        let mapped = match c {
            'a'..='z' | '0'..='9' | '_' => c,
            '-' | ' ' | '.' => '-',
            _ => continue,
        };
        if mapped == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(mapped);
    }
    out.truncate(max_len);
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// `base` with a numeric suffix, shortening the base so the result fits.
fn with_suffix(base: &str, n: u32, max_len: usize) -> String {
    if n == 0 {
        return base.to_string();
    }
    let suffix = format!("-{}", n);
    let keep = max_len.saturating_sub(suffix.len()).min(base.len());
    let trimmed = base[..keep].trim_end_matches('-');
    format!("{}{}", trimmed, suffix)
}

#[derive(Clone)]
pub struct AccountService {
    store: Store,
    handles: HandleConfig,
}

impl AccountService {
    pub fn new(store: Store, handles: HandleConfig) -> Self {
        Self { store, handles }
    }

    pub fn normalize(&self, raw: &str) -> String {
        normalize_handle(raw, self.handles.max_length)
    }

    /// Return the account's public handle, synthesizing and storing one if it
    /// has none yet. Creates the account row on first use.
    pub async fn resolve_handle(&self, account_id: &str, preferred: Option<&str>) -> ServiceResult<Account> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(ServiceError::field("userId", "Account id is required"));
        }

        if let Some(account) = self.store.accounts.get(account_id).await? {
            if account.username.is_some() {
                return Ok(account);
            }
        }

        let base = self.candidate_handle(account_id, preferred).await?;
        for n in 0..MAX_SUFFIX_ATTEMPTS {
            let candidate = with_suffix(&base, n, self.handles.max_length);
            if let Some(owner) = self.store.accounts.find_by_username(&candidate).await? {
                if owner.user_id != account_id {
                    continue;
                }
            }
            match self.store.accounts.assign_username(account_id, &candidate).await {
                Ok(account) => {
                    info!("Assigned handle '{}' to account {}", candidate, account_id);
                    return Ok(account);
                }
                // lost a race for this name, try the next suffix
                Err(DatabaseError::UniqueViolation(_)) => {
                    debug!("Handle '{}' taken concurrently", candidate);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Conflict(format!(
            "Could not find a free handle based on '{}'",
            base
        )))
    }

    async fn candidate_handle(&self, account_id: &str, preferred: Option<&str>) -> ServiceResult<String> {
        if let Some(preferred) = preferred {
            let handle = self.normalize(preferred);
            if !handle.is_empty() {
                return Ok(handle);
            }
        }

        if let Some(active) = self.store.profiles.active(account_id).await? {
            let handle = self.normalize(&active.profile.handle);
            if !handle.is_empty() {
                return Ok(handle);
            }
        }

        let id_part: String = account_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .flat_map(|c| c.to_lowercase())
            .take(8)
            .collect();
        let fallback = if id_part.is_empty() {
            self.handles.fallback_prefix.clone()
        } else {
            format!("{}-{}", self.handles.fallback_prefix, id_part)
        };
        Ok(self.normalize(&fallback))
    }

    /// Case-insensitive lookup by public handle.
    pub async fn find_by_handle(&self, handle: &str) -> ServiceResult<Account> {
        let normalized = self.normalize(handle);
        if normalized.is_empty() {
            return Err(ServiceError::NotFound(format!("No account with handle '{}'", handle.trim())));
        }
        self.store
            .accounts
            .find_by_username(&normalized)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No account with handle '{}'", normalized)))
    }

    pub async fn update_account(&self, account_id: &str, update: AccountUpdate) -> ServiceResult<Account> {
        let display_name = update.display_name.map(|s| s.trim().to_string());
        if let Some(name) = &display_name {
            if name.chars().count() > 80 {
                return Err(ServiceError::field("display_name", "Display name must be at most 80 characters"));
            }
        }
        let avatar_path = update
            .avatar_path
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let update = AccountUpdate { display_name, avatar_path };
        Ok(self.store.accounts.update(account_id, &update).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AccountService {
        AccountService::new(Store::memory(), HandleConfig::default())
    }

    #[test]
    fn normalizes_case_whitespace_and_symbols() {
        assert_eq!(normalize_handle(" My-Handle ", 32), "my-handle");
        assert_eq!(normalize_handle("Jess.Doe  Smith", 32), "jess-doe-smith");
        assert_eq!(normalize_handle("--a!!b__c--", 32), "ab__c");
        assert_eq!(normalize_handle("abcdefgh-ijk", 9), "abcdefgh");
        assert_eq!(normalize_handle("!!!", 32), "");
    }

    #[test]
    fn suffix_keeps_within_max_length() {
        assert_eq!(with_suffix("jess", 0, 32), "jess");
        assert_eq!(with_suffix("jess", 2, 32), "jess-2");
        assert_eq!(with_suffix("abcdefgh", 12, 8), "abcde-12");
    }

    #[tokio::test]
    async fn synthesizes_from_account_id() {
        let svc = service();
        let account = svc.resolve_handle("A1B2C3D4E5F6", None).await.unwrap();
        assert_eq!(account.username.as_deref(), Some("user-a1b2c3d4"));

        // stable once assigned
        let again = svc.resolve_handle("A1B2C3D4E5F6", Some("other")).await.unwrap();
        assert_eq!(again.username.as_deref(), Some("user-a1b2c3d4"));
    }

    #[tokio::test]
    async fn disambiguates_collisions() {
        let svc = service();
        let first = svc.resolve_handle("acc_1", Some("Jess")).await.unwrap();
        let second = svc.resolve_handle("acc_2", Some("jess")).await.unwrap();
        let third = svc.resolve_handle("acc_3", Some("JESS")).await.unwrap();
        assert_eq!(first.username.as_deref(), Some("jess"));
        assert_eq!(second.username.as_deref(), Some("jess-1"));
        assert_eq!(third.username.as_deref(), Some("jess-2"));
    }

    #[tokio::test]
    async fn find_by_handle_is_case_insensitive() {
        let svc = service();
        svc.resolve_handle("acc_1", Some("jess")).await.unwrap();
        let found = svc.find_by_handle("  JESS ").await.unwrap();
        assert_eq!(found.user_id, "acc_1");
        assert!(matches!(svc.find_by_handle("nobody").await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_trims_and_bounds_display_name() {
        let svc = service();
        let update = AccountUpdate {
            display_name: Some("  Jess Doe ".into()),
            avatar_path: Some("   ".into()),
        };
        let account = svc.update_account("acc_1", update).await.unwrap();
        assert_eq!(account.display_name.as_deref(), Some("Jess Doe"));
        assert_eq!(account.avatar_path, None);

        let too_long = AccountUpdate {
            display_name: Some("x".repeat(81)),
            avatar_path: None,
        };
        assert!(matches!(
            svc.update_account("acc_1", too_long).await,
            Err(ServiceError::Validation { .. })
        ));
    }
}
