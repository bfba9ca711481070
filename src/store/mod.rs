use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use ndarray::{Array2, ArrayView1};
use tracing::info;

use crate::error::{RecError, Result};
use crate::models::{Interaction, Product};
use crate::utils::validation::require_columns;

pub const INTERACTION_COLUMNS: [&str; 3] = ["user_id", "product_id", "rating"];
pub const PRODUCT_COLUMNS: [&str; 3] = ["product_id", "product_name", "category"];

/// In-memory copy of the raw interaction log and the product catalog.
///
/// Interactions are kept exactly as loaded, duplicates included. Strategies
/// that count events read the raw rows; strategies that need one rating per
/// (user, product) pair go through [`InteractionStore::build_matrix`].
#[derive(Debug)]
pub struct InteractionStore {
    interactions: Vec<Interaction>,
    products: Vec<Product>,
    catalog: HashMap<String, usize>,
}

impl InteractionStore {
    pub fn from_records(interactions: Vec<Interaction>, products: Vec<Product>) -> Self {
        let catalog = products
            .iter()
            .enumerate()
            .map(|(i, p)| (p.product_id.clone(), i))
            .collect();

        info!(
            "Loaded {} interactions and {} catalog products",
            interactions.len(),
            products.len()
        );

        Self {
            interactions,
            products,
            catalog,
        }
    }

    pub fn from_csv<P: AsRef<Path>>(interactions_path: P, products_path: P) -> Result<Self> {
        let interactions = Self::read_interactions(File::open(interactions_path)?)?;
        let products = Self::read_products(File::open(products_path)?)?;
        Ok(Self::from_records(interactions, products))
    }

    pub fn read_interactions<R: Read>(reader: R) -> Result<Vec<Interaction>> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|source| RecError::Csv {
                table: "interaction",
                source,
            })?
            .clone();
        require_columns(&headers, &INTERACTION_COLUMNS, "interaction")?;

        let mut records = Vec::new();
        for result in csv_reader.deserialize() {
            let record: Interaction = result.map_err(|source| RecError::Csv {
                table: "interaction",
                source,
            })?;
            records.push(record);
        }

        Ok(records)
    }

    pub fn read_products<R: Read>(reader: R) -> Result<Vec<Product>> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|source| RecError::Csv {
                table: "product",
                source,
            })?
            .clone();
        require_columns(&headers, &PRODUCT_COLUMNS, "product")?;

        let mut records = Vec::new();
        for result in csv_reader.deserialize() {
            let record: Product = result.map_err(|source| RecError::Csv {
                table: "product",
                source,
            })?;
            records.push(record);
        }

        Ok(records)
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, product_id: &str) -> Option<&Product> {
        self.catalog.get(product_id).map(|&i| &self.products[i])
    }

    pub fn num_interactions(&self) -> usize {
        self.interactions.len()
    }

    pub fn num_products(&self) -> usize {
        self.products.len()
    }

    /// Every product the user has an interaction row for, whatever the rating.
    pub fn user_products(&self, user_id: &str) -> HashSet<&str> {
        self.interactions
            .iter()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.product_id.as_str())
            .collect()
    }

    pub fn build_matrix(&self) -> InteractionMatrix {
        InteractionMatrix::from_interactions(&self.interactions)
    }
}

/// Dense user x product rating matrix pivoted from the interaction log.
///
/// Row and column indices follow first appearance order in the log, and a
/// duplicate (user, product) pair keeps only the last rating seen. Cells with
/// no interaction hold 0.0, the same value as an explicit zero rating.
#[derive(Debug)]
pub struct InteractionMatrix {
    users: Vec<String>,
    products: Vec<String>,
    user_index: HashMap<String, usize>,
    product_index: HashMap<String, usize>,
    ratings: Array2<f32>,
}

impl InteractionMatrix {
    pub fn from_interactions(interactions: &[Interaction]) -> Self {
        let mut users = Vec::new();
        let mut products = Vec::new();
        let mut user_index = HashMap::new();
        let mut product_index = HashMap::new();

        for row in interactions {
            if !user_index.contains_key(&row.user_id) {
                user_index.insert(row.user_id.clone(), users.len());
                users.push(row.user_id.clone());
            }
            if !product_index.contains_key(&row.product_id) {
                product_index.insert(row.product_id.clone(), products.len());
                products.push(row.product_id.clone());
            }
        }

        let mut ratings = Array2::zeros((users.len(), products.len()));
        for row in interactions {
            let u = user_index[&row.user_id];
            let p = product_index[&row.product_id];
            ratings[[u, p]] = row.rating;
        }

        Self {
            users,
            products,
            user_index,
            product_index,
            ratings,
        }
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_products(&self) -> usize {
        self.products.len()
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }

    pub fn user_position(&self, user_id: &str) -> Option<usize> {
        self.user_index.get(user_id).copied()
    }

    pub fn product_position(&self, product_id: &str) -> Option<usize> {
        self.product_index.get(product_id).copied()
    }

    pub fn product_at(&self, index: usize) -> &str {
        &self.products[index]
    }

    /// Rating for a (user, product) pair, 0.0 for pairs never interacted with.
    pub fn rating(&self, user_id: &str, product_id: &str) -> f32 {
        match (self.user_position(user_id), self.product_position(product_id)) {
            (Some(u), Some(p)) => self.ratings[[u, p]],
            _ => 0.0,
        }
    }

    pub fn user_ratings(&self, user_position: usize) -> ArrayView1<'_, f32> {
        self.ratings.row(user_position)
    }

    pub fn ratings(&self) -> &Array2<f32> {
        &self.ratings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_interactions() -> Vec<Interaction> {
        vec![
            Interaction::new("u1", "p1", 5.0),
            Interaction::new("u1", "p2", 3.0),
            Interaction::new("u2", "p1", 4.0),
            Interaction::new("u2", "p3", 5.0),
        ]
    }

    #[test]
    fn test_matrix_first_seen_order() {
        let matrix = InteractionMatrix::from_interactions(&sample_interactions());
        assert_eq!(matrix.users(), &["u1".to_string(), "u2".to_string()]);
        assert_eq!(
            matrix.products(),
            &["p1".to_string(), "p2".to_string(), "p3".to_string()]
        );
        assert_eq!(matrix.user_position("u2"), Some(1));
        assert_eq!(matrix.product_position("p3"), Some(2));
    }

    #[test]
    fn test_matrix_zero_fill_and_values() {
        let matrix = InteractionMatrix::from_interactions(&sample_interactions());
        assert_eq!(matrix.rating("u1", "p1"), 5.0);
        assert_eq!(matrix.rating("u1", "p3"), 0.0);
        assert_eq!(matrix.rating("u2", "p2"), 0.0);
        // unknown ids read as unrated rather than panicking
        assert_eq!(matrix.rating("nobody", "p1"), 0.0);
    }

    #[test]
    fn test_matrix_duplicate_keeps_last_rating() {
        let mut interactions = sample_interactions();
        interactions.push(Interaction::new("u1", "p1", 1.0));
        let matrix = InteractionMatrix::from_interactions(&interactions);
        assert_eq!(matrix.rating("u1", "p1"), 1.0);
        // the duplicate must not add a new row or column
        assert_eq!(matrix.num_users(), 2);
        assert_eq!(matrix.num_products(), 3);
    }

    #[test]
    fn test_store_user_products_includes_zero_ratings() {
        let mut interactions = sample_interactions();
        interactions.push(Interaction::new("u1", "p3", 0.0));
        let store = InteractionStore::from_records(interactions, Vec::new());
        let seen = store.user_products("u1");
        assert!(seen.contains("p1"));
        assert!(seen.contains("p3"));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_read_interactions_missing_column() {
        let data = "user_id,product_id\nu1,p1\n";
        let err = InteractionStore::read_interactions(data.as_bytes())
            .expect_err("missing rating column should fail");
        match err {
            RecError::Schema { table, column } => {
                assert_eq!(table, "interaction");
                assert_eq!(column, "rating");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_interactions_optional_timestamp() {
        let data = "user_id,product_id,rating\nu1,p1,4.5\n";
        let records = InteractionStore::read_interactions(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rating, 4.5);
        assert_eq!(records[0].timestamp, None);

        let data = "user_id,product_id,rating,timestamp\nu1,p1,4.5,1700000000\n";
        let records = InteractionStore::read_interactions(data.as_bytes()).unwrap();
        assert_eq!(records[0].timestamp, Some(1700000000));
    }
}
