pub mod config;
pub mod models;
pub mod services;
pub mod algorithms;
pub mod utils;

pub use config::Config;
pub use models::*;

use anyhow::Result;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<services::rating_store::RatingStore>,
    pub sessions: Arc<services::session::SessionStore>,
    pub recommendation_service: Arc<services::recommendation::RecommendationService>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let store = services::rating_store::RatingStore::load(&config.data).await?;
        let state = Self::with_store(config, store);

        state.sessions.spawn_eviction(
            state.config.session.idle_timeout(),
            state.config.session.eviction_interval(),
        );
        Ok(state)
    }

    pub fn with_store(config: Config, store: services::rating_store::RatingStore) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(store);
        let sessions = Arc::new(services::session::SessionStore::new());

        let recommendation_service = Arc::new(
            services::recommendation::RecommendationService::new(
                store.clone(),
                sessions.clone(),
                config.clone(),
            )
        );

        Self {
            config,
            store,
            sessions,
            recommendation_service,
        }
    }
}

pub async fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
