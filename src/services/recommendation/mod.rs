use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::models::{Recommendation, Strategy};
use crate::services::embedding::EmbeddingEngine;
use crate::services::popularity::PopularityEngine;
use crate::services::similarity::ItemSimilarity;
use crate::store::InteractionStore;

/// Owns one trained instance of every strategy and dispatches requests.
///
/// Training is all-or-nothing. A service handle never mixes models from
/// different datasets, reloading data means building a whole new service.
#[derive(Debug)]
pub struct RecommendationService {
    store: Arc<InteractionStore>,
    popularity: PopularityEngine,
    similarity: ItemSimilarity,
    embedding: EmbeddingEngine,
    min_interactions: u64,
}

impl RecommendationService {
    pub fn train(store: Arc<InteractionStore>, config: &Config) -> Result<Self> {
        let started = Instant::now();

        let popularity = PopularityEngine::new(store.clone());
        let similarity = ItemSimilarity::train(store.clone());
        let embedding = EmbeddingEngine::train(store.clone(), &config.training)?;

        info!(
            "Trained all strategies on {} interactions in {}ms",
            store.num_interactions(),
            started.elapsed().as_millis()
        );

        Ok(Self {
            store,
            popularity,
            similarity,
            embedding,
            min_interactions: config.recommendation.min_interactions,
        })
    }

    /// Runs one strategy and normalizes its rows to the common shape.
    pub fn recommend(&self, strategy: Strategy, user_id: &str, n: usize) -> Vec<Recommendation> {
        let recommendations: Vec<Recommendation> = match strategy {
            Strategy::Popularity => self
                .popularity
                .top_popular(n)
                .into_iter()
                .map(Recommendation::from)
                .collect(),
            Strategy::TopRated => self
                .popularity
                .top_rated(n, self.min_interactions)
                .into_iter()
                .map(Recommendation::from)
                .collect(),
            Strategy::Collaborative => self
                .similarity
                .recommend(user_id, n)
                .into_iter()
                .map(Recommendation::from)
                .collect(),
            Strategy::Embedding => self
                .embedding
                .recommend(user_id, n)
                .into_iter()
                .map(Recommendation::from)
                .collect(),
        };

        debug!(
            "Strategy {} produced {} recommendations for user {}",
            strategy,
            recommendations.len(),
            user_id
        );

        recommendations
    }

    pub fn popularity(&self) -> &PopularityEngine {
        &self.popularity
    }

    pub fn similarity(&self) -> &ItemSimilarity {
        &self.similarity
    }

    pub fn embedding(&self) -> &EmbeddingEngine {
        &self.embedding
    }

    pub fn store(&self) -> &InteractionStore {
        &self.store
    }
}
