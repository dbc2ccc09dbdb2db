use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::services::{
    AccountService, AnalyticsService, LeadNotifier, LeadService, LogNotifier, ProfileService, TagService,
    VcardService,
};

/// Shared handler state: storage, domain services and settings.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub accounts: AccountService,
    pub profiles: ProfileService,
    pub leads: LeadService,
    pub tags: TagService,
    pub vcards: VcardService,
    pub analytics: AnalyticsService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> Self {
        Self::with_notifier(config, store, Arc::new(LogNotifier))
    }

    pub fn with_notifier(config: AppConfig, store: Store, notifier: Arc<dyn LeadNotifier>) -> Self {
        let accounts = AccountService::new(store.clone(), config.handles.clone());
        Self {
            profiles: ProfileService::new(store.clone(), accounts.clone()),
            leads: LeadService::new(store.clone(), accounts.clone(), notifier),
            tags: TagService::new(store.clone(), accounts.clone()),
            vcards: VcardService::new(store.clone(), accounts.clone()),
            analytics: AnalyticsService::new(store.clone()),
            accounts,
            store,
            config: Arc::new(config),
        }
    }
}
