use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use shoprec::services::embedding::EmbeddingEngine;
use shoprec::{init_tracing, Config, InteractionStore};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Override the configured epoch count.
    #[arg(short, long)]
    epochs: Option<usize>,

    /// Print sample recommendations for this user after training.
    #[arg(short, long)]
    user: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing with specified log level
    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    info!("Starting shoprec trainer");

    // Load configuration
    let mut config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };
    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }

    info!("Trainer configuration loaded: {:?}", config.training);

    let store = Arc::new(InteractionStore::from_csv(
        &config.data.interactions_path,
        &config.data.products_path,
    )?);
    info!(
        "Dataset: {} interactions, {} products",
        store.num_interactions(),
        store.num_products()
    );

    let engine = EmbeddingEngine::train(store, &config.training)?;

    if let Some(user_id) = args.user {
        let recommendations = engine.recommend(&user_id, config.recommendation.default_n);
        if recommendations.is_empty() {
            info!("No recommendations for user {}", user_id);
        }
        for rec in recommendations {
            info!(
                "{}: {} [{}] score={:.3}",
                rec.product_id, rec.product_name, rec.category, rec.score
            );
        }
    }

    info!("Training complete");

    Ok(())
}
