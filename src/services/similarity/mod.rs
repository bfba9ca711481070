use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};
use tracing::info;

use crate::models::ScoredProduct;
use crate::store::{InteractionMatrix, InteractionStore};
use crate::utils::{cosine_similarity, rank_top_n};

/// Item-based collaborative filtering over the pivoted rating matrix.
///
/// Similarity between two products is the cosine of their rating columns with
/// unrated cells as zeros. Scores for a user are the similarity-weighted sum
/// of their positive ratings, kept unnormalized, so products similar to many
/// rated items score higher than any single rating.
#[derive(Debug)]
pub struct ItemSimilarity {
    store: Arc<InteractionStore>,
    matrix: InteractionMatrix,
    similarity: Array2<f32>,
}

impl ItemSimilarity {
    pub fn train(store: Arc<InteractionStore>) -> Self {
        let started = Instant::now();
        let matrix = store.build_matrix();
        let similarity = pairwise_cosine(&matrix);

        info!(
            "Computed {}x{} item similarity matrix in {}ms",
            matrix.num_products(),
            matrix.num_products(),
            started.elapsed().as_millis()
        );

        Self {
            store,
            matrix,
            similarity,
        }
    }

    pub fn recommend(&self, user_id: &str, n: usize) -> Vec<ScoredProduct> {
        let user = match self.matrix.user_position(user_id) {
            Some(u) => u,
            None => return Vec::new(),
        };

        let ratings = self.matrix.user_ratings(user);
        let rated: Vec<(usize, f32)> = ratings
            .iter()
            .enumerate()
            .filter(|(_, &r)| r > 0.0)
            .map(|(p, &r)| (p, r))
            .collect();
        if rated.is_empty() {
            return Vec::new();
        }

        // weighted sum over the user's rated products, not divided by
        // similarity mass
        let num_products = self.matrix.num_products();
        let mut scores = vec![0.0f32; num_products];
        for &(p, r) in &rated {
            let row = self.similarity.row(p);
            for q in 0..num_products {
                scores[q] += row[q] * r;
            }
        }

        let rated_set: HashSet<usize> = rated.iter().map(|&(p, _)| p).collect();
        let scored: Vec<(String, f32)> = scores
            .into_iter()
            .enumerate()
            .filter(|(q, _)| !rated_set.contains(q))
            .map(|(q, score)| (self.matrix.product_at(q).to_string(), score))
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

    pub fn similarity_matrix(&self) -> &Array2<f32> {
        &self.similarity
    }

    pub fn product_ids(&self) -> &[String] {
        self.matrix.products()
    }
}

fn pairwise_cosine(matrix: &InteractionMatrix) -> Array2<f32> {
    let num_products = matrix.num_products();
    let columns: Vec<Vec<f32>> = (0..num_products)
        .map(|p| matrix.ratings().column(p).to_vec())
        .collect();

    let mut similarity = Array2::zeros((num_products, num_products));
    similarity
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            for j in 0..num_products {
                row[j] = cosine_similarity(&columns[i], &columns[j]);
            }
        });

    similarity
}
