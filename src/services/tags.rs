use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewTapEvent, TagStatus, TagWithAssignment, TapResolution};
use crate::database::Store;
use crate::services::accounts::AccountService;
use crate::services::active_profile::ensure_has_active_profile;
use crate::services::{ServiceError, ServiceResult};

const CLAIM_CODE_LENGTH: usize = 8;
// no 0/O or 1/I, codes are typed from print
const CLAIM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn generate_claim_code() -> String {
    let mut rng = rand::rng();
    (0..CLAIM_CODE_LENGTH)
        .map(|_| CLAIM_CODE_ALPHABET[rng.random_range(0..CLAIM_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Identifiers are matched case-insensitively and stored uppercase.
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

#[derive(Clone)]
pub struct TagService {
    store: Store,
    accounts: AccountService,
}

impl TagService {
    pub fn new(store: Store, accounts: AccountService) -> Self {
        Self { store, accounts }
    }

    /// Provision a new unclaimed tag with a fresh claim code.
    pub async fn register_tag(
        &self,
        chip_uid: &str,
        claim_expires_at: Option<DateTime<Utc>>,
    ) -> ServiceResult<TagWithAssignment> {
        let chip_uid = normalize_identifier(chip_uid);
        if chip_uid.is_empty() {
            return Err(ServiceError::field("chip_uid", "Chip UID is required"));
        }
        if !chip_uid.chars().all(|c| c.is_ascii_alphanumeric() || c == ':' || c == '-') {
            return Err(ServiceError::field("chip_uid", "Chip UID may only contain letters, digits, ':' and '-'"));
        }
        if self.store.tags.find_by_identifier(&chip_uid).await?.is_some() {
            return Err(ServiceError::Conflict(format!("Tag {} is already registered", chip_uid)));
        }

        for _ in 0..5 {
            let code = generate_claim_code();
            match self.store.tags.insert(&chip_uid, &code, claim_expires_at).await {
                Ok(tag) => {
                    info!("Registered tag {} ({})", tag.id, chip_uid);
                    return Ok(TagWithAssignment { tag, assignment: None });
                }
                // claim code collision, draw again
                Err(DatabaseError::UniqueViolation(msg)) if !msg.contains("chip_uid") => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ServiceError::Conflict("Could not allocate a unique claim code".to_string()))
    }

    /// Bind a tag to the account by chip UID or printed claim code.
    pub async fn claim_tag(&self, account_id: &str, code: &str) -> ServiceResult<TagWithAssignment> {
        let identifier = normalize_identifier(code);
        if identifier.is_empty() {
            return Err(ServiceError::field("code", "Claim code is required"));
        }

        let found = self
            .store
            .tags
            .find_by_identifier(&identifier)
            .await?
            .ok_or_else(|| ServiceError::field("code", "Unknown claim code"))?;

        if let Some(assignment) = &found.assignment {
            if assignment.user_id == account_id {
                return Ok(found);
            }
            warn!("Account {} tried to claim tag {} owned by another account", account_id, found.tag.id);
            return Err(ServiceError::Conflict("Tag is already claimed by another account".to_string()));
        }

        match found.tag.status {
            TagStatus::Retired => return Err(ServiceError::field("code", "This tag has been retired")),
            TagStatus::Claimed => {
                return Err(ServiceError::Conflict("Tag is already claimed by another account".to_string()))
            }
            TagStatus::Unclaimed => {}
        }
        if found.tag.is_expired(Utc::now()) {
            return Err(ServiceError::field("code", "Claim code has expired"));
        }

        if self.store.tags.claim(found.tag.id, account_id).await?.is_none() {
            return Err(ServiceError::Conflict("Tag is already claimed by another account".to_string()));
        }
        info!("Account {} claimed tag {}", account_id, found.tag.id);
        self.reload(found.tag.id).await
    }

    /// Point a claimed tag at one profile, or clear it with `None` so taps
    /// follow the active profile.
    pub async fn assign_tag(
        &self,
        account_id: &str,
        tag_id: Uuid,
        profile_id: Option<Uuid>,
    ) -> ServiceResult<TagWithAssignment> {
        if let Some(profile_id) = profile_id {
            if self.store.profiles.get(account_id, profile_id).await?.is_none() {
                return Err(ServiceError::Forbidden("Profile does not belong to this account".to_string()));
            }
        }
        if self.store.tags.set_profile(tag_id, account_id, profile_id).await?.is_none() {
            return Err(ServiceError::Forbidden("Tag does not belong to this account".to_string()));
        }
        self.reload(tag_id).await
    }

    pub async fn release_tag(&self, account_id: &str, tag_id: Uuid) -> ServiceResult<()> {
        if !self.store.tags.release(tag_id, account_id).await? {
            return Err(ServiceError::Forbidden("Tag does not belong to this account".to_string()));
        }
        info!("Account {} released tag {}", account_id, tag_id);
        Ok(())
    }

    pub async fn list_tags(&self, account_id: &str) -> ServiceResult<Vec<TagWithAssignment>> {
        Ok(self.store.tags.list_for_account(account_id).await?)
    }

    async fn reload(&self, tag_id: Uuid) -> ServiceResult<TagWithAssignment> {
        self.store
            .tags
            .find_by_id(tag_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Tag {} not found", tag_id)))
    }

    /// Where a tap on this chip should land. Records the tap.
    pub async fn resolve_tap(&self, chip_uid: &str) -> ServiceResult<TapResolution> {
        let chip_uid = normalize_identifier(chip_uid);
        let found = self
            .store
            .tags
            .find_by_chip_uid(&chip_uid)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Unknown tag".to_string()))?;
        let assignment = found
            .assignment
            .ok_or_else(|| ServiceError::NotFound("Tag has not been claimed".to_string()))?;
        let account_id = assignment.user_id.as_str();

        let explicit = match assignment.profile_id {
            Some(profile_id) => self.store.profiles.get(account_id, profile_id).await?,
            None => None,
        };
        let profile = match &explicit {
            Some(p) => Some(p.profile.clone()),
            None => match self.store.profiles.active(account_id).await? {
                Some(active) => Some(active.profile),
                None => {
                    ensure_has_active_profile(&self.store, account_id, None).await?;
                    self.store.profiles.active(account_id).await?.map(|p| p.profile)
                }
            },
        };
        let profile = profile.ok_or_else(|| ServiceError::NotFound("No published profile for this tag".to_string()))?;

        let account = self.accounts.resolve_handle(account_id, None).await?;
        let username = account.username.unwrap_or_default();

        self.store
            .analytics
            .record_tap(NewTapEvent {
                tag_id: Some(found.tag.id),
                user_id: account_id.to_string(),
                profile_id: Some(profile.id),
            })
            .await?;

        let redirect_path = if explicit.is_some() {
            format!("/{}?profile={}", username, profile.handle)
        } else {
            format!("/{}", username)
        };
        Ok(TapResolution {
            tag_id: found.tag.id,
            username,
            profile_id: profile.id,
            profile_handle: profile.handle,
            redirect_path,
        })
    }
}
