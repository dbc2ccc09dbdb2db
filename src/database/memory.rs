//! In-process store with the same observable semantics as the Postgres
//! repositories. Used by `STORAGE_BACKEND=memory` and the test suite.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::*;
use crate::database::repository::{
    AccountRepository, AnalyticsRepository, DbResult, LeadRepository, ProfileRepository,
    TagRepository, VcardRepository,
};

#[derive(Default)]
struct MemoryState {
    last_tick: Option<DateTime<Utc>>,
    accounts: Vec<Account>,
    profiles: Vec<Profile>,
    links: Vec<Link>,
    fields: Vec<LeadFormField>,
    settings: HashMap<(String, String), LeadFormSettings>,
    leads: Vec<Lead>,
    vcards: Vec<VcardProfile>,
    tags: Vec<HardwareTag>,
    assignments: Vec<TagAssignment>,
    taps: Vec<TapEvent>,
}

impl MemoryState {
    /// Strictly increasing timestamps so ordering ties cannot occur.
    fn now(&mut self) -> DateTime<Utc> {
        let wall = Utc::now();
        let next = match self.last_tick {
            Some(prev) if wall <= prev => prev + Duration::microseconds(1),
            _ => wall,
        };
        self.last_tick = Some(next);
        next
    }

    fn links_of(&self, profile_id: Uuid) -> Vec<Link> {
        let mut links: Vec<Link> = self
            .links
            .iter()
            .filter(|l| l.profile_id == profile_id)
            .cloned()
            .collect();
        links.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        links
    }

    fn with_links(&self, profile: &Profile) -> ProfileWithLinks {
        ProfileWithLinks {
            profile: profile.clone(),
            links: self.links_of(profile.id),
        }
    }

    fn tag_view(&self, tag: &HardwareTag) -> TagWithAssignment {
        TagWithAssignment {
            tag: tag.clone(),
            assignment: self.assignments.iter().find(|a| a.tag_id == tag.id).cloned(),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

fn duplicate(what: &str) -> DatabaseError {
    DatabaseError::UniqueViolation(format!("duplicate key value violates unique constraint on {}", what))
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn get(&self, user_id: &str) -> DbResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.iter().find(|a| a.user_id == user_id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> DbResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .find(|a| {
                a.username
                    .as_deref()
                    .map(|u| u.eq_ignore_ascii_case(username))
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn assign_username(&self, user_id: &str, username: &str) -> DbResult<Account> {
        let mut state = self.state.write().await;
        let now = state.now();

        let taken = state.accounts.iter().any(|a| {
            a.user_id != user_id
                && a.username.as_deref().map(|u| u.eq_ignore_ascii_case(username)).unwrap_or(false)
        });

        match state.accounts.iter().position(|a| a.user_id == user_id) {
            Some(idx) => {
                if state.accounts[idx].username.is_none() {
                    if taken {
                        return Err(duplicate("accounts.username"));
                    }
                    state.accounts[idx].username = Some(username.to_string());
                }
                state.accounts[idx].updated_at = now;
                Ok(state.accounts[idx].clone())
            }
            None => {
                if taken {
                    return Err(duplicate("accounts.username"));
                }
                let account = Account {
                    user_id: user_id.to_string(),
                    username: Some(username.to_string()),
                    display_name: None,
                    avatar_path: None,
                    avatar_updated_at: None,
                    created_at: now,
                    updated_at: now,
                };
                state.accounts.push(account.clone());
                Ok(account)
            }
        }
    }

    async fn update(&self, user_id: &str, update: &AccountUpdate) -> DbResult<Account> {
        let mut state = self.state.write().await;
        let now = state.now();

        let idx = match state.accounts.iter().position(|a| a.user_id == user_id) {
            Some(idx) => idx,
            None => {
                state.accounts.push(Account {
                    user_id: user_id.to_string(),
                    username: None,
                    display_name: None,
                    avatar_path: None,
                    avatar_updated_at: None,
                    created_at: now,
                    updated_at: now,
                });
                state.accounts.len() - 1
            }
        };

        let account = &mut state.accounts[idx];
        if let Some(name) = &update.display_name {
            account.display_name = Some(name.clone());
        }
        if let Some(path) = &update.avatar_path {
            account.avatar_path = Some(path.clone());
            account.avatar_updated_at = Some(now);
        }
        account.updated_at = now;
        Ok(account.clone())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn list(&self, user_id: &str) -> DbResult<Vec<ProfileWithLinks>> {
        let state = self.state.read().await;
        let mut profiles: Vec<&Profile> =
            state.profiles.iter().filter(|p| p.user_id == user_id).collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(profiles.into_iter().map(|p| state.with_links(p)).collect())
    }

    async fn get(&self, user_id: &str, profile_id: Uuid) -> DbResult<Option<ProfileWithLinks>> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .iter()
            .find(|p| p.id == profile_id && p.user_id == user_id)
            .map(|p| state.with_links(p)))
    }

    async fn find_by_handle(&self, user_id: &str, handle: &str) -> DbResult<Option<ProfileWithLinks>> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .iter()
            .find(|p| p.user_id == user_id && p.handle == handle)
            .map(|p| state.with_links(p)))
    }

    async fn active(&self, user_id: &str) -> DbResult<Option<ProfileWithLinks>> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .iter()
            .filter(|p| p.user_id == user_id && p.is_active)
            .max_by_key(|p| p.updated_at)
            .map(|p| state.with_links(p)))
    }

    async fn handle_in_use(&self, user_id: &str, handle: &str, exclude: Option<Uuid>) -> DbResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .iter()
            .any(|p| p.user_id == user_id && p.handle == handle && Some(p.id) != exclude))
    }

    async fn count(&self, user_id: &str) -> DbResult<usize> {
        let state = self.state.read().await;
        Ok(state.profiles.iter().filter(|p| p.user_id == user_id).count())
    }

    async fn insert(&self, user_id: &str, profile: NewProfile) -> DbResult<Profile> {
        let mut state = self.state.write().await;
        if state.profiles.iter().any(|p| p.id == profile.id) {
            return Err(duplicate("user_profiles.id"));
        }
        if state
            .profiles
            .iter()
            .any(|p| p.user_id == user_id && p.handle == profile.handle)
        {
            return Err(duplicate("user_profiles (user_id, handle)"));
        }
        if profile.is_active && state.profiles.iter().any(|p| p.user_id == user_id && p.is_active) {
            return Err(duplicate("user_profiles_one_active"));
        }

        let now = state.now();
        let row = Profile {
            id: profile.id,
            user_id: user_id.to_string(),
            name: profile.name,
            handle: profile.handle,
            headline: profile.headline,
            theme: profile.theme,
            is_active: profile.is_active,
            created_at: now,
            updated_at: now,
        };
        state.profiles.push(row.clone());
        Ok(row)
    }

    async fn update(&self, user_id: &str, update: ProfileUpdate) -> DbResult<Profile> {
        let mut state = self.state.write().await;
        if state
            .profiles
            .iter()
            .any(|p| p.user_id == user_id && p.handle == update.handle && p.id != update.id)
        {
            return Err(duplicate("user_profiles (user_id, handle)"));
        }

        let now = state.now();
        let profile = state
            .profiles
            .iter_mut()
            .find(|p| p.id == update.id && p.user_id == user_id)
            .ok_or_else(|| DatabaseError::NotFound(format!("profile {}", update.id)))?;

        profile.name = update.name;
        profile.handle = update.handle;
        profile.headline = update.headline;
        profile.theme = update.theme;
        profile.updated_at = now;
        Ok(profile.clone())
    }

    async fn replace_links(&self, user_id: &str, profile_id: Uuid, links: Vec<NewLink>) -> DbResult<Vec<Link>> {
        let mut state = self.state.write().await;
        state
            .links
            .retain(|l| !(l.profile_id == profile_id && l.user_id == user_id));

        if links.iter().any(|l| state.links.iter().any(|existing| existing.id == l.id)) {
            return Err(duplicate("profile_links.id"));
        }

        let mut inserted = Vec::with_capacity(links.len());
        for link in links {
            let now = state.now();
            let row = Link {
                id: link.id,
                profile_id,
                user_id: user_id.to_string(),
                title: link.title,
                url: link.url,
                order_index: link.order_index,
                is_active: link.is_active,
                created_at: now,
                updated_at: now,
            };
            state.links.push(row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn delete(&self, user_id: &str, profile_id: Uuid) -> DbResult<bool> {
        let mut state = self.state.write().await;
        let before = state.profiles.len();
        state
            .profiles
            .retain(|p| !(p.id == profile_id && p.user_id == user_id));
        if state.profiles.len() == before {
            return Ok(false);
        }

        // ON DELETE CASCADE / SET NULL
        state.links.retain(|l| l.profile_id != profile_id);
        let now = state.now();
        for assignment in state.assignments.iter_mut() {
            if assignment.profile_id == Some(profile_id) {
                assignment.profile_id = None;
                assignment.updated_at = now;
            }
        }
        Ok(true)
    }

    async fn activate(&self, user_id: &str, profile_id: Uuid) -> DbResult<bool> {
        let mut state = self.state.write().await;
        if !state
            .profiles
            .iter()
            .any(|p| p.id == profile_id && p.user_id == user_id)
        {
            return Ok(false);
        }
        for profile in state.profiles.iter_mut().filter(|p| p.user_id == user_id) {
            profile.is_active = profile.id == profile_id;
        }
        Ok(true)
    }

    async fn active_candidates(&self, user_id: &str) -> DbResult<Vec<ActiveCandidate>> {
        let state = self.state.read().await;
        Ok(state
            .profiles
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(ActiveCandidate::from)
            .collect())
    }
}

#[async_trait]
impl LeadRepository for MemoryStore {
    async fn list_fields(&self, user_id: &str, handle: &str) -> DbResult<Vec<LeadFormField>> {
        let state = self.state.read().await;
        let mut fields: Vec<LeadFormField> = state
            .fields
            .iter()
            .filter(|f| f.user_id == user_id && f.handle == handle)
            .cloned()
            .collect();
        fields.sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.created_at.cmp(&b.created_at)));
        Ok(fields)
    }

    async fn replace_fields(&self, user_id: &str, handle: &str, fields: Vec<NewField>) -> DbResult<Vec<LeadFormField>> {
        let mut state = self.state.write().await;

        let mut seen = std::collections::HashSet::new();
        if !fields.iter().all(|f| seen.insert(f.key.clone())) {
            return Err(duplicate("lead_form_fields (user_id, handle, key)"));
        }

        state
            .fields
            .retain(|f| !(f.user_id == user_id && f.handle == handle));

        let mut inserted = Vec::with_capacity(fields.len());
        for field in fields {
            let now = state.now();
            let row = LeadFormField {
                id: field.id,
                user_id: user_id.to_string(),
                handle: handle.to_string(),
                key: field.key,
                label: field.label,
                field_type: field.field_type,
                required: field.required,
                placeholder: field.placeholder,
                options: field.options,
                is_hidden: field.is_hidden,
                validation: field.validation,
                order_index: field.order_index,
                is_active: field.is_active,
                created_at: now,
            };
            state.fields.push(row.clone());
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn delete_field(&self, user_id: &str, handle: &str, key: &str) -> DbResult<bool> {
        let mut state = self.state.write().await;
        let before = state.fields.len();
        state
            .fields
            .retain(|f| !(f.user_id == user_id && f.handle == handle && f.key == key));
        Ok(state.fields.len() != before)
    }

    async fn get_settings(&self, user_id: &str, handle: &str) -> DbResult<Option<LeadFormSettings>> {
        let state = self.state.read().await;
        Ok(state
            .settings
            .get(&(user_id.to_string(), handle.to_string()))
            .cloned())
    }

    async fn save_settings(&self, user_id: &str, handle: &str, settings: &LeadFormSettings) -> DbResult<LeadFormSettings> {
        let mut state = self.state.write().await;
        state
            .settings
            .insert((user_id.to_string(), handle.to_string()), settings.clone());
        Ok(settings.clone())
    }

    async fn insert_lead(&self, lead: NewLead) -> DbResult<Lead> {
        let mut state = self.state.write().await;
        let now = state.now();
        let row = Lead {
            id: Uuid::new_v4(),
            user_id: lead.user_id,
            handle: lead.handle,
            name: lead.name,
            email: lead.email,
            phone: lead.phone,
            company: lead.company,
            message: lead.message,
            custom_fields: if lead.custom_fields.is_null() {
                Value::Object(Default::default())
            } else {
                lead.custom_fields
            },
            source_url: lead.source_url,
            created_at: now,
        };
        state.leads.push(row.clone());
        Ok(row)
    }

    async fn list_leads(&self, user_id: &str) -> DbResult<Vec<Lead>> {
        let state = self.state.read().await;
        let mut leads: Vec<Lead> = state
            .leads
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }
}

#[async_trait]
impl TagRepository for MemoryStore {
    async fn insert(&self, chip_uid: &str, claim_code: &str, claim_expires_at: Option<DateTime<Utc>>) -> DbResult<HardwareTag> {
        let mut state = self.state.write().await;
        if state.tags.iter().any(|t| t.chip_uid == chip_uid) {
            return Err(duplicate("hardware_tags.chip_uid"));
        }
        if state.tags.iter().any(|t| t.claim_code == claim_code) {
            return Err(duplicate("hardware_tags.claim_code"));
        }
        let now = state.now();
        let tag = HardwareTag {
            id: Uuid::new_v4(),
            chip_uid: chip_uid.to_string(),
            claim_code: claim_code.to_string(),
            status: TagStatus::Unclaimed,
            claim_expires_at,
            created_at: now,
        };
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn find_by_identifier(&self, identifier: &str) -> DbResult<Option<TagWithAssignment>> {
        let state = self.state.read().await;
        Ok(state
            .tags
            .iter()
            .find(|t| t.chip_uid == identifier || t.claim_code == identifier)
            .map(|t| state.tag_view(t)))
    }

    async fn find_by_chip_uid(&self, chip_uid: &str) -> DbResult<Option<TagWithAssignment>> {
        let state = self.state.read().await;
        Ok(state.tags.iter().find(|t| t.chip_uid == chip_uid).map(|t| state.tag_view(t)))
    }

    async fn find_by_id(&self, tag_id: Uuid) -> DbResult<Option<TagWithAssignment>> {
        let state = self.state.read().await;
        Ok(state.tags.iter().find(|t| t.id == tag_id).map(|t| state.tag_view(t)))
    }

    async fn claim(&self, tag_id: Uuid, user_id: &str) -> DbResult<Option<TagAssignment>> {
        let mut state = self.state.write().await;
        let now = state.now();
        let Some(tag) = state
            .tags
            .iter_mut()
            .find(|t| t.id == tag_id && t.status == TagStatus::Unclaimed)
        else {
            return Ok(None);
        };
        tag.status = TagStatus::Claimed;

        let assignment = TagAssignment {
            id: Uuid::new_v4(),
            tag_id,
            user_id: user_id.to_string(),
            profile_id: None,
            created_at: now,
            updated_at: now,
        };
        state.assignments.push(assignment.clone());
        Ok(Some(assignment))
    }

    async fn set_profile(&self, tag_id: Uuid, user_id: &str, profile_id: Option<Uuid>) -> DbResult<Option<TagAssignment>> {
        let mut state = self.state.write().await;
        let now = state.now();
        Ok(state
            .assignments
            .iter_mut()
            .find(|a| a.tag_id == tag_id && a.user_id == user_id)
            .map(|a| {
                a.profile_id = profile_id;
                a.updated_at = now;
                a.clone()
            }))
    }

    async fn release(&self, tag_id: Uuid, user_id: &str) -> DbResult<bool> {
        let mut state = self.state.write().await;
        let before = state.assignments.len();
        state
            .assignments
            .retain(|a| !(a.tag_id == tag_id && a.user_id == user_id));
        if state.assignments.len() == before {
            return Ok(false);
        }
        if let Some(tag) = state
            .tags
            .iter_mut()
            .find(|t| t.id == tag_id && t.status == TagStatus::Claimed)
        {
            tag.status = TagStatus::Unclaimed;
        }
        Ok(true)
    }

    async fn list_for_account(&self, user_id: &str) -> DbResult<Vec<TagWithAssignment>> {
        let state = self.state.read().await;
        let mut tags: Vec<TagWithAssignment> = state
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter_map(|a| state.tags.iter().find(|t| t.id == a.tag_id))
            .map(|t| state.tag_view(t))
            .collect();
        tags.sort_by(|a, b| a.tag.created_at.cmp(&b.tag.created_at));
        Ok(tags)
    }
}

#[async_trait]
impl VcardRepository for MemoryStore {
    async fn get(&self, user_id: &str) -> DbResult<Option<VcardProfile>> {
        let state = self.state.read().await;
        Ok(state.vcards.iter().find(|v| v.user_id == user_id).cloned())
    }

    async fn upsert(&self, user_id: &str, payload: &VcardPayload) -> DbResult<VcardProfile> {
        let mut state = self.state.write().await;
        let now = state.now();
        let (id, created_at) = state
            .vcards
            .iter()
            .find(|v| v.user_id == user_id)
            .map(|v| (v.id, v.created_at))
            .unwrap_or((Uuid::new_v4(), now));

        let row = VcardProfile {
            id,
            user_id: user_id.to_string(),
            full_name: payload.full_name.clone(),
            title: payload.title.clone(),
            email: payload.email.clone(),
            phone: payload.phone.clone(),
            company: payload.company.clone(),
            website: payload.website.clone(),
            address: payload.address.clone(),
            note: payload.note.clone(),
            photo_data: payload.photo_data.clone(),
            photo_name: payload.photo_name.clone(),
            created_at,
            updated_at: now,
        };
        state.vcards.retain(|v| v.user_id != user_id);
        state.vcards.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl AnalyticsRepository for MemoryStore {
    async fn record_tap(&self, event: NewTapEvent) -> DbResult<TapEvent> {
        let mut state = self.state.write().await;
        let now = state.now();
        let tap = TapEvent {
            id: Uuid::new_v4(),
            tag_id: event.tag_id,
            user_id: event.user_id,
            profile_id: event.profile_id,
            created_at: now,
        };
        state.taps.push(tap.clone());
        Ok(tap)
    }

    async fn tap_times(&self, user_id: &str, since: DateTime<Utc>) -> DbResult<Vec<DateTime<Utc>>> {
        let state = self.state.read().await;
        Ok(state
            .taps
            .iter()
            .filter(|t| t.user_id == user_id && t.created_at >= since)
            .map(|t| t.created_at)
            .collect())
    }

    async fn lead_times(&self, user_id: &str, since: DateTime<Utc>) -> DbResult<Vec<DateTime<Utc>>> {
        let state = self.state.read().await;
        Ok(state
            .leads
            .iter()
            .filter(|l| l.user_id == user_id && l.created_at >= since)
            .map(|l| l.created_at)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_profile(handle: &str, active: bool) -> NewProfile {
        NewProfile {
            id: Uuid::new_v4(),
            user_id: "acc".into(),
            name: handle.into(),
            handle: handle.into(),
            headline: None,
            theme: Theme::Classic,
            is_active: active,
        }
    }

    #[tokio::test]
    async fn rejects_second_active_insert() {
        let store = MemoryStore::default();
        ProfileRepository::insert(&store, "acc", new_profile("a", true)).await.unwrap();
        let err = ProfileRepository::insert(&store, "acc", new_profile("b", true)).await.unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn activate_swaps_flags_atomically() {
        let store = MemoryStore::default();
        let a = ProfileRepository::insert(&store, "acc", new_profile("a", true)).await.unwrap();
        let b = ProfileRepository::insert(&store, "acc", new_profile("b", false)).await.unwrap();

        assert!(store.activate("acc", b.id).await.unwrap());
        let candidates = store.active_candidates("acc").await.unwrap();
        let active: Vec<Uuid> = candidates.iter().filter(|c| c.is_active).map(|c| c.id).collect();
        assert_eq!(active, vec![b.id]);
        assert!(!store.activate("other", a.id).await.unwrap());
    }

    #[tokio::test]
    async fn timestamps_strictly_increase() {
        let store = MemoryStore::default();
        let a = ProfileRepository::insert(&store, "acc", new_profile("a", false)).await.unwrap();
        let b = ProfileRepository::insert(&store, "acc", new_profile("b", false)).await.unwrap();
        assert!(b.created_at > a.created_at);
    }
}
