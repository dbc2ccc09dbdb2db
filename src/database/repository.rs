use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::memory::MemoryStore;
use crate::database::models::*;
use crate::database::postgres::{
    PgAccountRepository, PgAnalyticsRepository, PgLeadRepository, PgProfileRepository,
    PgTagRepository, PgVcardRepository,
};

pub type DbResult<T> = Result<T, DatabaseError>;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get(&self, user_id: &str) -> DbResult<Option<Account>>;

    /// Lookup by an already-normalized username.
    async fn find_by_username(&self, username: &str) -> DbResult<Option<Account>>;

    /// Create the account if missing and set its username unless one is already
    /// assigned. Returns the stored row, which may carry an earlier username.
    async fn assign_username(&self, user_id: &str, username: &str) -> DbResult<Account>;

    async fn update(&self, user_id: &str, update: &AccountUpdate) -> DbResult<Account>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// All profiles of an account with links, oldest first.
    async fn list(&self, user_id: &str) -> DbResult<Vec<ProfileWithLinks>>;

    async fn get(&self, user_id: &str, profile_id: Uuid) -> DbResult<Option<ProfileWithLinks>>;

    async fn find_by_handle(&self, user_id: &str, handle: &str) -> DbResult<Option<ProfileWithLinks>>;

    async fn active(&self, user_id: &str) -> DbResult<Option<ProfileWithLinks>>;

    async fn handle_in_use(&self, user_id: &str, handle: &str, exclude: Option<Uuid>) -> DbResult<bool>;

    async fn count(&self, user_id: &str) -> DbResult<usize>;

    async fn insert(&self, user_id: &str, profile: NewProfile) -> DbResult<Profile>;

    /// Overwrite all scalar fields and bump `updated_at`.
    async fn update(&self, user_id: &str, update: ProfileUpdate) -> DbResult<Profile>;

    /// Delete every link of the profile and insert `links` in one step.
    async fn replace_links(&self, user_id: &str, profile_id: Uuid, links: Vec<NewLink>) -> DbResult<Vec<Link>>;

    /// Returns false when nothing was deleted.
    async fn delete(&self, user_id: &str, profile_id: Uuid) -> DbResult<bool>;

    /// Demote every other profile of the account and promote `profile_id`,
    /// atomically. Returns false if the profile is not the account's.
    async fn activate(&self, user_id: &str, profile_id: Uuid) -> DbResult<bool>;

    async fn active_candidates(&self, user_id: &str) -> DbResult<Vec<ActiveCandidate>>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn list_fields(&self, user_id: &str, handle: &str) -> DbResult<Vec<LeadFormField>>;

    /// Replace the whole field set of a scope.
    async fn replace_fields(&self, user_id: &str, handle: &str, fields: Vec<NewField>) -> DbResult<Vec<LeadFormField>>;

    async fn delete_field(&self, user_id: &str, handle: &str, key: &str) -> DbResult<bool>;

    async fn get_settings(&self, user_id: &str, handle: &str) -> DbResult<Option<LeadFormSettings>>;

    async fn save_settings(&self, user_id: &str, handle: &str, settings: &LeadFormSettings) -> DbResult<LeadFormSettings>;

    async fn insert_lead(&self, lead: NewLead) -> DbResult<Lead>;

    /// Newest first.
    async fn list_leads(&self, user_id: &str) -> DbResult<Vec<Lead>>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn insert(&self, chip_uid: &str, claim_code: &str, claim_expires_at: Option<DateTime<Utc>>) -> DbResult<HardwareTag>;

    /// Match by chip uid or claim code. Identifiers are stored uppercase.
    async fn find_by_identifier(&self, identifier: &str) -> DbResult<Option<TagWithAssignment>>;

    async fn find_by_chip_uid(&self, chip_uid: &str) -> DbResult<Option<TagWithAssignment>>;

    async fn find_by_id(&self, tag_id: Uuid) -> DbResult<Option<TagWithAssignment>>;

    /// Mark an unclaimed tag claimed and bind it to the account. Returns `None`
    /// if the tag was no longer unclaimed.
    async fn claim(&self, tag_id: Uuid, user_id: &str) -> DbResult<Option<TagAssignment>>;

    async fn set_profile(&self, tag_id: Uuid, user_id: &str, profile_id: Option<Uuid>) -> DbResult<Option<TagAssignment>>;

    /// Drop the assignment and return the tag to `unclaimed`.
    async fn release(&self, tag_id: Uuid, user_id: &str) -> DbResult<bool>;

    async fn list_for_account(&self, user_id: &str) -> DbResult<Vec<TagWithAssignment>>;
}

#[async_trait]
pub trait VcardRepository: Send + Sync {
    async fn get(&self, user_id: &str) -> DbResult<Option<VcardProfile>>;

    async fn upsert(&self, user_id: &str, payload: &VcardPayload) -> DbResult<VcardProfile>;
}

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn record_tap(&self, event: NewTapEvent) -> DbResult<TapEvent>;

    async fn tap_times(&self, user_id: &str, since: DateTime<Utc>) -> DbResult<Vec<DateTime<Utc>>>;

    async fn lead_times(&self, user_id: &str, since: DateTime<Utc>) -> DbResult<Vec<DateTime<Utc>>>;
}

#[derive(Clone)]
enum Backend {
    Postgres(PgPool),
    Memory,
}

/// Bundle of repositories the services run against.
#[derive(Clone)]
pub struct Store {
    pub accounts: Arc<dyn AccountRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub leads: Arc<dyn LeadRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub vcards: Arc<dyn VcardRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
    backend: Backend,
}

impl Store {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            profiles: Arc::new(PgProfileRepository::new(pool.clone())),
            leads: Arc::new(PgLeadRepository::new(pool.clone())),
            tags: Arc::new(PgTagRepository::new(pool.clone())),
            vcards: Arc::new(PgVcardRepository::new(pool.clone())),
            analytics: Arc::new(PgAnalyticsRepository::new(pool.clone())),
            backend: Backend::Postgres(pool),
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            accounts: store.clone(),
            profiles: store.clone(),
            leads: store.clone(),
            tags: store.clone(),
            vcards: store.clone(),
            analytics: store,
            backend: Backend::Memory,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Postgres(_) => "postgres",
            Backend::Memory => "memory",
        }
    }

    pub async fn health_check(&self) -> DbResult<()> {
        match &self.backend {
            Backend::Postgres(pool) => DatabaseManager::health_check(pool).await,
            Backend::Memory => Ok(()),
        }
    }
}
