use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RecError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub product_id: String,
    pub rating: f32,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Popularity,
    TopRated,
    Collaborative,
    Embedding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularProduct {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub interaction_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopRatedProduct {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub avg_rating: f32,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredProduct {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub score: f32,
}

/// Unified row shape produced by the orchestrator. `score` is `None` for the
/// popularity strategy, which ranks by count and has no comparable score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub strategy: Strategy,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
}

impl Interaction {
    pub fn new(user_id: &str, product_id: &str, rating: f32) -> Self {
        Self {
            user_id: user_id.to_string(),
            product_id: product_id.to_string(),
            rating,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

impl Product {
    pub fn new(product_id: &str, product_name: &str, category: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            product_name: product_name.to_string(),
            category: category.to_string(),
        }
    }
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Popularity => "popularity",
            Strategy::TopRated => "top_rated",
            Strategy::Collaborative => "collaborative",
            Strategy::Embedding => "embedding",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popularity" => Ok(Strategy::Popularity),
            "top_rated" => Ok(Strategy::TopRated),
            "collaborative" => Ok(Strategy::Collaborative),
            "embedding" => Ok(Strategy::Embedding),
            other => Err(RecError::UnknownStrategy(other.to_string())),
        }
    }
}

impl From<PopularProduct> for Recommendation {
    fn from(row: PopularProduct) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            category: row.category,
            score: None,
        }
    }
}

impl From<TopRatedProduct> for Recommendation {
    fn from(row: TopRatedProduct) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            category: row.category,
            score: Some(row.avg_rating),
        }
    }
}

impl From<ScoredProduct> for Recommendation {
    fn from(row: ScoredProduct) -> Self {
        Self {
            product_id: row.product_id,
            product_name: row.product_name,
            category: row.category,
            score: Some(row.score),
        }
    }
}
