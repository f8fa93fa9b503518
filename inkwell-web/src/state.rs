//! Shared application state

use crate::WebResult;
use inkwell_app::{PostManager, SqlitePostStorage};
use inkwell_core::InkwellConfig;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<InkwellConfig>,
    pub posts: Arc<PostManager>,
}

impl AppState {
    pub fn new(config: InkwellConfig, posts: PostManager) -> Self {
        Self {
            config: Arc::new(config),
            posts: Arc::new(posts),
        }
    }

    /// State backed by the in-memory store, mostly for tests
    pub fn in_memory(config: InkwellConfig) -> Self {
        Self::new(config, PostManager::in_memory())
    }

    /// Connect to the configured database, migrating it when asked to
    pub async fn from_config(config: InkwellConfig) -> WebResult<Self> {
        let storage = SqlitePostStorage::connect(
            &config.database.url,
            config.database.max_connections,
        )
        .await?;

        if config.database.run_migrations {
            storage.migrate().await?;
        }
        info!(url = %config.database.url, "Database ready");

        let storage = Arc::new(storage);
        Ok(Self::new(config, PostManager::new(storage.clone(), storage)))
    }
}
