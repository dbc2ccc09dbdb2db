use std::collections::{HashMap, HashSet};

use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{
    LinkPayload, NewLink, NewProfile, ProfilePayload, ProfileUpdate, ProfileWithLinks, PublicProfile, Theme,
};
use crate::database::Store;
use crate::services::accounts::AccountService;
use crate::services::active_profile::ensure_has_active_profile;
use crate::services::{ServiceError, ServiceResult};

const MAX_NAME_LENGTH: usize = 80;
const MAX_HEADLINE_LENGTH: usize = 160;

/// Validated, normalized form of a save request.
struct CleanProfile {
    name: String,
    handle: String,
    headline: Option<String>,
    theme: Theme,
    links: Vec<CleanLink>,
}

struct CleanLink {
    id: Option<Uuid>,
    title: String,
    url: String,
    is_active: bool,
}

fn clean_url(raw: &str) -> Result<String, &'static str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("URL is required");
    }
    // bare domains are saved as https
    let candidate = if trimmed.contains("://") || trimmed.starts_with("mailto:") || trimmed.starts_with("tel:") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    match url::Url::parse(&candidate) {
        Ok(_) => Ok(candidate),
        Err(_) => Err("URL is not valid"),
    }
}

fn clean_links(links: &[LinkPayload], errors: &mut HashMap<String, String>) -> Vec<CleanLink> {
    links
        .iter()
        .enumerate()
        .filter_map(|(i, link)| {
            let url = match clean_url(&link.url) {
                Ok(url) => url,
                Err(msg) => {
                    errors.insert(format!("links[{}].url", i), msg.to_string());
                    return None;
                }
            };
            let title = match link.title.trim() {
                "" => url.clone(),
                t => t.to_string(),
            };
            Some(CleanLink {
                id: link.id,
                title,
                url,
                is_active: link.is_active,
            })
        })
        .collect()
}

#[derive(Clone)]
pub struct ProfileService {
    store: Store,
    accounts: AccountService,
}

impl ProfileService {
    pub fn new(store: Store, accounts: AccountService) -> Self {
        Self { store, accounts }
    }

    pub async fn list_profiles(&self, account_id: &str) -> ServiceResult<Vec<ProfileWithLinks>> {
        Ok(self.store.profiles.list(account_id).await?)
    }

    fn validate(&self, payload: &ProfilePayload) -> ServiceResult<CleanProfile> {
        let mut errors = HashMap::new();

        let name = payload.name.trim().to_string();
        if name.is_empty() {
            errors.insert("name".to_string(), "Name is required".to_string());
        } else if name.chars().count() > MAX_NAME_LENGTH {
            errors.insert("name".to_string(), format!("Name must be at most {} characters", MAX_NAME_LENGTH));
        }

        let handle = self.accounts.normalize(&payload.handle);
        if handle.is_empty() {
            errors.insert("handle".to_string(), "Handle is required".to_string());
        }

        let headline = payload
            .headline
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string);
        if headline.as_ref().map(|h| h.chars().count() > MAX_HEADLINE_LENGTH).unwrap_or(false) {
            errors.insert(
                "headline".to_string(),
                format!("Headline must be at most {} characters", MAX_HEADLINE_LENGTH),
            );
        }

        let theme = match payload.theme.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            None => Theme::default(),
            Some(raw) => raw.parse().unwrap_or_else(|msg: String| {
                errors.insert("theme".to_string(), msg);
                Theme::default()
            }),
        };

        let links = clean_links(&payload.links, &mut errors);

        ServiceError::from_fields("Profile is invalid", errors)?;
        Ok(CleanProfile {
            name,
            handle,
            headline,
            theme,
            links,
        })
    }

    /// Create or fully overwrite a profile and its links, then enforce the
    /// single-active rule and return the reloaded row.
    pub async fn save_profile(&self, account_id: &str, payload: ProfilePayload) -> ServiceResult<ProfileWithLinks> {
        let clean = self.validate(&payload)?;

        let existing = match payload.id {
            Some(id) => Some(
                self.store
                    .profiles
                    .get(account_id, id)
                    .await?
                    .ok_or_else(|| {
                        warn!("Account {} tried to save profile {} it does not own", account_id, id);
                        ServiceError::Forbidden("Profile does not belong to this account".to_string())
                    })?,
            ),
            None => None,
        };
        let exclude = existing.as_ref().map(|p| p.profile.id);

        if self.store.profiles.handle_in_use(account_id, &clean.handle, exclude).await? {
            return Err(ServiceError::Conflict(format!(
                "Handle '{}' is already used by another profile",
                clean.handle
            )));
        }

        let profile_id = match &existing {
            Some(current) => {
                self.store
                    .profiles
                    .update(
                        account_id,
                        ProfileUpdate {
                            id: current.profile.id,
                            name: clean.name,
                            handle: clean.handle,
                            headline: clean.headline,
                            theme: clean.theme,
                        },
                    )
                    .await?
                    .id
            }
            None => {
                let first = self.store.profiles.count(account_id).await? == 0;
                let created = self
                    .store
                    .profiles
                    .insert(
                        account_id,
                        NewProfile {
                            id: Uuid::new_v4(),
                            user_id: account_id.to_string(),
                            name: clean.name,
                            handle: clean.handle,
                            headline: clean.headline,
                            theme: clean.theme,
                            is_active: first,
                        },
                    )
                    .await?;
                info!("Created profile {} for account {}", created.id, account_id);
                created.id
            }
        };

        // Ids survive the replace only if they were already this profile's.
        let owned: HashSet<Uuid> = existing
            .as_ref()
            .map(|p| p.links.iter().map(|l| l.id).collect())
            .unwrap_or_default();
        let mut used = HashSet::new();
        let links = clean
            .links
            .into_iter()
            .enumerate()
            .map(|(position, link)| {
                let id = link
                    .id
                    .filter(|id| owned.contains(id) && used.insert(*id))
                    .unwrap_or_else(Uuid::new_v4);
                NewLink {
                    id,
                    title: link.title,
                    url: link.url,
                    order_index: position as i32,
                    is_active: link.is_active,
                }
            })
            .collect();
        self.store.profiles.replace_links(account_id, profile_id, links).await?;

        if payload.active == Some(true) {
            self.store.profiles.activate(account_id, profile_id).await?;
        } else {
            ensure_has_active_profile(&self.store, account_id, Some(profile_id)).await?;
        }

        // lazily materialize the account and its public handle
        self.accounts.resolve_handle(account_id, None).await?;

        self.reload(account_id, profile_id).await
    }

    /// Removing a missing profile is not an error.
    pub async fn delete_profile(&self, account_id: &str, profile_id: Uuid) -> ServiceResult<()> {
        if self.store.profiles.delete(account_id, profile_id).await? {
            info!("Deleted profile {} for account {}", profile_id, account_id);
            ensure_has_active_profile(&self.store, account_id, None).await?;
        }
        Ok(())
    }

    pub async fn set_active_profile(&self, account_id: &str, profile_id: Uuid) -> ServiceResult<ProfileWithLinks> {
        if !self.store.profiles.activate(account_id, profile_id).await? {
            warn!("Account {} tried to activate profile {} it does not own", account_id, profile_id);
            return Err(ServiceError::Forbidden("Profile does not belong to this account".to_string()));
        }
        self.reload(account_id, profile_id).await
    }

    async fn reload(&self, account_id: &str, profile_id: Uuid) -> ServiceResult<ProfileWithLinks> {
        self.store
            .profiles
            .get(account_id, profile_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Profile {} not found", profile_id)))
    }

    /// Public page for a handle: the active profile, or the named one, with
    /// only enabled links.
    pub async fn public_profile(&self, handle: &str, profile_handle: Option<&str>) -> ServiceResult<PublicProfile> {
        let account = self.accounts.find_by_handle(handle).await?;
        let account_id = account.user_id.as_str();

        let selected = match profile_handle.map(|h| self.accounts.normalize(h)).filter(|h| !h.is_empty()) {
            Some(wanted) => self.store.profiles.find_by_handle(account_id, &wanted).await?,
            None => match self.store.profiles.active(account_id).await? {
                Some(active) => Some(active),
                None => {
                    ensure_has_active_profile(&self.store, account_id, None).await?;
                    self.store.profiles.active(account_id).await?
                }
            },
        };
        let selected = selected.ok_or_else(|| ServiceError::NotFound(format!("No published profile for '{}'", handle.trim())))?;

        Ok(PublicProfile {
            username: account.username.clone().unwrap_or_default(),
            display_name: account.display_name.clone(),
            avatar_url: account.avatar_url(),
            links: selected.links.into_iter().filter(|l| l.is_active).collect(),
            profile: selected.profile,
        })
    }
}
