use std::sync::Arc;

use crate::{
    config::{Config, EngagementConfig},
    ent_framework::create_blog_privacy_registry,
    error::AppResult,
    infrastructure::{
        clock::{Clock, SystemClock},
        id_generator::IdGenerator,
        record_store::RecordStore,
        sqlite_store::SqliteStore,
    },
    services::{EngagementService, ListingService, PostService, StatisticsService},
};

/// Everything a handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub ids: Arc<IdGenerator>,
    pub clock: Arc<dyn Clock>,
    pub engagement: EngagementService,
    pub listing: ListingService,
    pub statistics: StatisticsService,
    pub posts: PostService,
}

impl AppState {
    /// Connects the SQLite store named by the configuration.
    pub async fn new(config: &Config) -> AppResult<Self> {
        let store = SqliteStore::connect(&config.database.url, config.database.max_connections).await?;
        Self::with_store(Arc::new(store), Arc::new(SystemClock), &config.engagement)
    }

    /// Wires the services over any store and clock.
    pub fn with_store(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        config: &EngagementConfig,
    ) -> AppResult<Self> {
        let privacy = Arc::new(create_blog_privacy_registry());
        let ids = Arc::new(IdGenerator::new(config.node_id)?);

        Ok(Self {
            engagement: EngagementService::new(
                store.clone(),
                privacy.clone(),
                ids.clone(),
                clock.clone(),
            ),
            listing: ListingService::with_page_sizes(
                store.clone(),
                privacy.clone(),
                config.page_size,
                config.max_page_size,
            ),
            statistics: StatisticsService::new(store.clone(), privacy.clone(), clock.clone()),
            posts: PostService::new(store.clone(), privacy),
            store,
            ids,
            clock,
        })
    }
}
