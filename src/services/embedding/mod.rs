use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::algorithms::network::RatingNet;
use crate::config::TrainingConfig;
use crate::error::{RecError, Result};
use crate::models::ScoredProduct;
use crate::store::InteractionStore;
use crate::utils::rank_top_n;
use crate::utils::validation::validate_training;

/// Rating predictor built on learned embeddings and a feed-forward head.
///
/// Trains on the raw interaction log, one example per row, against the row's
/// rating. At recommendation time it scores every product the model knows and
/// drops the ones the user already has interaction rows for.
#[derive(Debug)]
pub struct EmbeddingEngine {
    store: Arc<InteractionStore>,
    user_index: HashMap<String, usize>,
    product_index: HashMap<String, usize>,
    products: Vec<String>,
    net: RatingNet,
}

impl EmbeddingEngine {
    pub fn train(store: Arc<InteractionStore>, config: &TrainingConfig) -> Result<Self> {
        validate_training(config)?;

        let interactions = store.interactions();
        if interactions.is_empty() {
            return Err(RecError::EmptyDataset);
        }

        // dense indices in first appearance order
        let mut user_index: HashMap<String, usize> = HashMap::new();
        let mut product_index: HashMap<String, usize> = HashMap::new();
        let mut products = Vec::new();
        let mut examples = Vec::with_capacity(interactions.len());
        for row in interactions {
            if !user_index.contains_key(&row.user_id) {
                let next = user_index.len();
                user_index.insert(row.user_id.clone(), next);
            }
            if !product_index.contains_key(&row.product_id) {
                product_index.insert(row.product_id.clone(), products.len());
                products.push(row.product_id.clone());
            }
            examples.push((
                user_index[&row.user_id],
                product_index[&row.product_id],
                row.rating,
            ));
        }

        // the validation slice comes off the tail of the log as loaded
        let holdout = (examples.len() as f32 * config.validation_split) as usize;
        let (train_examples, validation) = examples.split_at(examples.len() - holdout);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut net = RatingNet::new(
            &mut rng,
            user_index.len(),
            products.len(),
            config.embedding_dim,
        );
        let mut optimizer = config.optimizer.build(config.learning_rate);

        info!(
            "Training embedding model on {} examples ({} held out) for {} epochs",
            train_examples.len(),
            validation.len(),
            config.epochs
        );

        let val_users: Vec<usize> = validation.iter().map(|e| e.0).collect();
        let val_products: Vec<usize> = validation.iter().map(|e| e.1).collect();
        let val_targets: Vec<f32> = validation.iter().map(|e| e.2).collect();

        let mut order: Vec<usize> = (0..train_examples.len()).collect();
        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);

            let mut epoch_loss = 0.0f64;
            for chunk in order.chunks(config.batch_size) {
                let users: Vec<usize> = chunk.iter().map(|&i| train_examples[i].0).collect();
                let batch_products: Vec<usize> =
                    chunk.iter().map(|&i| train_examples[i].1).collect();
                let targets: Vec<f32> = chunk.iter().map(|&i| train_examples[i].2).collect();

                let batch_loss =
                    net.train_batch(&users, &batch_products, &targets, optimizer.as_mut());
                epoch_loss += batch_loss as f64 * chunk.len() as f64;
            }
            let train_loss = epoch_loss / train_examples.len() as f64;

            if validation.is_empty() {
                info!(
                    "Epoch {}/{}: train_loss={:.4}",
                    epoch + 1,
                    config.epochs,
                    train_loss
                );
            } else {
                let val_loss = net.mse_loss(&val_users, &val_products, &val_targets);
                info!(
                    "Epoch {}/{}: train_loss={:.4} val_loss={:.4}",
                    epoch + 1,
                    config.epochs,
                    train_loss,
                    val_loss
                );
            }
        }

        Ok(Self {
            store,
            user_index,
            product_index,
            products,
            net,
        })
    }

    pub fn recommend(&self, user_id: &str, n: usize) -> Vec<ScoredProduct> {
        let user = match self.user_index.get(user_id) {
            Some(&u) => u,
            None => return Vec::new(),
        };

        let candidates: Vec<usize> = (0..self.products.len()).collect();
        let users = vec![user; candidates.len()];
        let predictions = self.net.predict_batch(&users, &candidates);

        let seen = self.store.user_products(user_id);
        let scored: Vec<(String, f32)> = candidates
            .iter()
            .zip(predictions)
            .filter(|(&p, _)| !seen.contains(self.products[p].as_str()))
            .map(|(&p, score)| (self.products[p].clone(), score))
            .collect();

        rank_top_n(scored, n)
            .into_iter()
            .filter_map(|(product_id, score)| {
                self.store.product(&product_id).map(|p| ScoredProduct {
                    product_id: p.product_id.clone(),
                    product_name: p.product_name.clone(),
                    category: p.category.clone(),
                    score,
                })
            })
            .collect()
    }

    /// Predicted rating for a single known (user, product) pair.
    pub fn predict(&self, user_id: &str, product_id: &str) -> Option<f32> {
        let user = *self.user_index.get(user_id)?;
        let product = *self.product_index.get(product_id)?;
        self.net.predict_batch(&[user], &[product]).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Interaction, Product};

    fn sample_store() -> Arc<InteractionStore> {
        let interactions = vec![
            Interaction::new("u1", "p1", 5.0),
            Interaction::new("u1", "p2", 3.0),
            Interaction::new("u2", "p1", 4.0),
            Interaction::new("u2", "p3", 5.0),
            Interaction::new("u3", "p2", 2.0),
            Interaction::new("u3", "p3", 4.0),
        ];
        let products = vec![
            Product::new("p1", "Wireless Mouse", "Electronics"),
            Product::new("p2", "Mechanical Keyboard", "Electronics"),
            Product::new("p3", "Yoga Mat", "Sports"),
        ];
        Arc::new(InteractionStore::from_records(interactions, products))
    }

    fn test_config(epochs: usize) -> TrainingConfig {
        let mut config = TrainingConfig::default();
        config.embedding_dim = 8;
        config.epochs = epochs;
        config.batch_size = 2;
        config.learning_rate = 0.01;
        config.validation_split = 0.0;
        config
    }

    #[test]
    fn test_train_empty_dataset_errors() {
        let store = Arc::new(InteractionStore::from_records(Vec::new(), Vec::new()));
        let err = EmbeddingEngine::train(store, &test_config(1))
            .expect_err("empty dataset should not train");
        assert!(matches!(err, RecError::EmptyDataset));
    }

    #[test]
    fn test_recommend_unknown_user_is_empty() {
        let engine = EmbeddingEngine::train(sample_store(), &test_config(2)).unwrap();
        assert!(engine.recommend("nobody", 5).is_empty());
    }

    #[test]
    fn test_recommend_excludes_interacted_products() {
        // the zero rated row counts as an interaction and is excluded too
        let interactions = vec![
            Interaction::new("u1", "p1", 5.0),
            Interaction::new("u1", "p2", 0.0),
            Interaction::new("u2", "p2", 4.0),
            Interaction::new("u2", "p3", 3.0),
        ];
        let products = vec![
            Product::new("p1", "Wireless Mouse", "Electronics"),
            Product::new("p2", "Mechanical Keyboard", "Electronics"),
            Product::new("p3", "Yoga Mat", "Sports"),
        ];
        let store = Arc::new(InteractionStore::from_records(interactions, products));
        let engine = EmbeddingEngine::train(store, &test_config(2)).unwrap();

        let recs = engine.recommend("u1", 10);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].product_id, "p3");
    }

    #[test]
    fn test_recommend_returns_at_most_n() {
        let engine = EmbeddingEngine::train(sample_store(), &test_config(2)).unwrap();
        assert!(engine.recommend("u1", 1).len() <= 1);
    }

    #[test]
    fn test_more_epochs_fit_the_ratings_better() {
        let store = sample_store();
        let short = EmbeddingEngine::train(store.clone(), &test_config(1)).unwrap();
        let long = EmbeddingEngine::train(store.clone(), &test_config(60)).unwrap();

        let fit_error = |engine: &EmbeddingEngine| -> f32 {
            store
                .interactions()
                .iter()
                .map(|row| {
                    let predicted = engine.predict(&row.user_id, &row.product_id).unwrap();
                    (predicted - row.rating).powi(2)
                })
                .sum::<f32>()
                / store.num_interactions() as f32
        };

        assert!(fit_error(&long) < fit_error(&short));
    }

    #[test]
    fn test_validation_split_is_loss_reporting_only() {
        // held out rows still get embeddings, so predictions exist for them
        let mut config = test_config(2);
        config.validation_split = 0.3;
        let engine = EmbeddingEngine::train(sample_store(), &config).unwrap();
        assert!(engine.predict("u3", "p3").is_some());
    }
}
