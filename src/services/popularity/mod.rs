use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{PopularProduct, TopRatedProduct};
use crate::store::InteractionStore;

/// Non-personalized baselines computed from the raw interaction log.
///
/// Both rankings count every log row on its own, so repeated interactions by
/// the same user all contribute. Only products present in the catalog make it
/// into the output.
#[derive(Debug)]
pub struct PopularityEngine {
    store: Arc<InteractionStore>,
}

impl PopularityEngine {
    pub fn new(store: Arc<InteractionStore>) -> Self {
        Self { store }
    }

    /// Products ranked by interaction count.
    pub fn top_popular(&self, n: usize) -> Vec<PopularProduct> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for row in self.store.interactions() {
            *counts.entry(row.product_id.as_str()).or_insert(0) += 1;
        }

        let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);

        ranked
            .into_iter()
            .filter_map(|(product_id, count)| {
                self.store.product(product_id).map(|p| PopularProduct {
                    product_id: p.product_id.clone(),
                    product_name: p.product_name.clone(),
                    category: p.category.clone(),
                    interaction_count: count,
                })
            })
            .collect()
    }

    /// Products ranked by mean rating among those with enough interactions.
    pub fn top_rated(&self, n: usize, min_interactions: u64) -> Vec<TopRatedProduct> {
        let mut sums: HashMap<&str, (f64, u64)> = HashMap::new();
        for row in self.store.interactions() {
            let entry = sums.entry(row.product_id.as_str()).or_insert((0.0, 0));
            entry.0 += row.rating as f64;
            entry.1 += 1;
        }

        let mut ranked: Vec<(&str, f32, u64)> = sums
            .into_iter()
            .filter(|(_, (_, count))| *count >= min_interactions)
            .map(|(product_id, (sum, count))| (product_id, (sum / count as f64) as f32, count))
            .collect();

        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.2.cmp(&a.2))
                .then_with(|| a.0.cmp(b.0))
        });
        ranked.truncate(n);

        ranked
            .into_iter()
            .filter_map(|(product_id, avg_rating, count)| {
                self.store.product(product_id).map(|p| TopRatedProduct {
                    product_id: p.product_id.clone(),
                    product_name: p.product_name.clone(),
                    category: p.category.clone(),
                    avg_rating,
                    count,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Interaction, Product};

    fn engine() -> PopularityEngine {
        let interactions = vec![
            Interaction::new("u1", "p1", 5.0),
            Interaction::new("u1", "p2", 3.0),
            Interaction::new("u2", "p1", 4.0),
            Interaction::new("u2", "p3", 5.0),
            // duplicate pair on purpose, raw rows each count
            Interaction::new("u1", "p1", 2.0),
        ];
        let products = vec![
            Product::new("p1", "Wireless Mouse", "Electronics"),
            Product::new("p2", "Mechanical Keyboard", "Electronics"),
            Product::new("p3", "Yoga Mat", "Sports"),
        ];
        PopularityEngine::new(Arc::new(InteractionStore::from_records(
            interactions,
            products,
        )))
    }

    #[test]
    fn test_top_popular_counts_raw_rows() {
        let top = engine().top_popular(10);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].product_id, "p1");
        assert_eq!(top[0].interaction_count, 3);
        // p2 and p3 both have one row, ascending id breaks the tie
        assert_eq!(top[1].product_id, "p2");
        assert_eq!(top[2].product_id, "p3");
    }

    #[test]
    fn test_top_popular_truncates() {
        let top = engine().top_popular(1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, "p1");
    }

    #[test]
    fn test_top_popular_drops_uncataloged() {
        let interactions = vec![
            Interaction::new("u1", "p1", 5.0),
            Interaction::new("u1", "ghost", 5.0),
            Interaction::new("u2", "ghost", 5.0),
        ];
        let products = vec![Product::new("p1", "Wireless Mouse", "Electronics")];
        let engine =
            PopularityEngine::new(Arc::new(InteractionStore::from_records(interactions, products)));

        let top = engine.top_popular(10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, "p1");
    }

    #[test]
    fn test_top_rated_threshold() {
        // p1 has rows 5.0, 4.0, 2.0 -> mean 11/3; the rest have one row
        let top = engine().top_rated(10, 2);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, "p1");
        assert!((top[0].avg_rating - 11.0 / 3.0).abs() < 1e-6);
        assert_eq!(top[0].count, 3);
    }

    #[test]
    fn test_top_rated_empty_when_threshold_unmet() {
        let top = engine().top_rated(10, 100);
        assert!(top.is_empty());
    }

    #[test]
    fn test_top_rated_ordering() {
        let top = engine().top_rated(10, 1);
        assert_eq!(top.len(), 3);
        // p3 mean 5.0, then p1 mean 3.67, then p2 mean 3.0
        assert_eq!(top[0].product_id, "p3");
        assert_eq!(top[1].product_id, "p1");
        assert_eq!(top[2].product_id, "p2");
    }
}
