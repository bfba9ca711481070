pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::{RecError, Result};
pub use models::*;
pub use services::recommendation::RecommendationService;
pub use store::InteractionStore;

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    // handlers clone the inner Arc out, so a reload never blocks serving
    service: Arc<RwLock<Arc<RecommendationService>>>,
    pub serving_stats: Arc<DashMap<String, u64>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let service = build_service(&config)?;

        Ok(Self {
            config,
            service: Arc::new(RwLock::new(Arc::new(service))),
            serving_stats: Arc::new(DashMap::new()),
        })
    }

    pub fn service(&self) -> Arc<RecommendationService> {
        self.service.read().clone()
    }

    /// Re-reads the data files, retrains every strategy and swaps the
    /// trained service in as one unit. On error the old service stays.
    pub fn reload(&self) -> Result<()> {
        let fresh = build_service(&self.config)?;
        *self.service.write() = Arc::new(fresh);
        Ok(())
    }

    pub fn record_request(&self, strategy: &str) {
        *self.serving_stats.entry(strategy.to_string()).or_insert(0) += 1;
    }
}

fn build_service(config: &Config) -> Result<RecommendationService> {
    let store = Arc::new(InteractionStore::from_csv(
        &config.data.interactions_path,
        &config.data.products_path,
    )?);
    RecommendationService::train(store, config)
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}
