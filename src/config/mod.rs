use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::algorithms::optimizer::OptimizerKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub recommendation: RecommendationConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().unwrap()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub interactions_path: String,
    pub products_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Result length used when a request does not ask for one.
    pub default_n: usize,
    /// Interaction count a product needs to enter the top rated ranking.
    pub min_interactions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub embedding_dim: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of interactions held out for validation loss reporting.
    pub validation_split: f32,
    pub optimizer: OptimizerKind,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            data: DataConfig {
                interactions_path: "data/interactions.csv".to_string(),
                products_path: "data/products.csv".to_string(),
            },
            recommendation: RecommendationConfig {
                default_n: 10,
                min_interactions: 50,
            },
            training: TrainingConfig::default(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 50,
            learning_rate: 0.001,
            epochs: 5,
            batch_size: 64,
            validation_split: 0.1,
            optimizer: OptimizerKind::Adam,
            seed: 42,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SHOPREC"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.recommendation.default_n, 10);
        assert_eq!(config.training.embedding_dim, 50);
        assert_eq!(config.training.optimizer, OptimizerKind::Adam);
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.server.socket_addr().port(), 8080);
    }
}
