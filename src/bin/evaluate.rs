use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rayon::prelude::*;
use shoprec::services::embedding::EmbeddingEngine;
use shoprec::services::popularity::PopularityEngine;
use shoprec::services::similarity::ItemSimilarity;
use shoprec::utils::metrics::{mae, rmse, MetricsCalculator};
use shoprec::{init_tracing, Config, InteractionStore};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Fraction of the interaction log held out as the test set.
    #[arg(long, default_value_t = 0.2)]
    holdout: f32,

    /// Ranking cutoff for precision and recall.
    #[arg(short, long, default_value_t = 10)]
    k: usize,

    /// Held-out ratings at or above this value count as relevant.
    #[arg(long, default_value_t = 4.0)]
    relevance_threshold: f32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing();

    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    let store = InteractionStore::from_csv(&config.data.interactions_path, &config.data.products_path)?;

    // the test set comes off the tail of the log as loaded
    let interactions = store.interactions().to_vec();
    let holdout = (interactions.len() as f32 * args.holdout) as usize;
    let split = interactions.len() - holdout;
    anyhow::ensure!(split > 0, "holdout fraction leaves no training data");
    let (train_rows, test_rows) = interactions.split_at(split);

    info!(
        "Evaluating with {} training and {} test interactions",
        train_rows.len(),
        test_rows.len()
    );

    let train_store = Arc::new(InteractionStore::from_records(
        train_rows.to_vec(),
        store.products().to_vec(),
    ));
    let popularity = PopularityEngine::new(train_store.clone());
    let similarity = ItemSimilarity::train(train_store.clone());
    let embedding = EmbeddingEngine::train(train_store, &config.training)?;

    // rating accuracy over held-out pairs the model has embeddings for
    let mut predictions = Vec::new();
    let mut targets = Vec::new();
    for row in test_rows {
        if let Some(predicted) = embedding.predict(&row.user_id, &row.product_id) {
            predictions.push(predicted);
            targets.push(row.rating);
        }
    }
    info!(
        "Embedding rating accuracy on {}/{} held-out pairs: rmse={:.4} mae={:.4}",
        predictions.len(),
        test_rows.len(),
        rmse(&predictions, &targets),
        mae(&predictions, &targets)
    );

    let mut relevant_by_user: HashMap<String, Vec<String>> = HashMap::new();
    for row in test_rows {
        if row.rating >= args.relevance_threshold {
            relevant_by_user
                .entry(row.user_id.clone())
                .or_default()
                .push(row.product_id.clone());
        }
    }
    let users: Vec<(String, Vec<String>)> = relevant_by_user.into_iter().collect();
    info!("Ranking evaluation over {} users at k={}", users.len(), args.k);

    let popular_ids: Vec<String> = popularity
        .top_popular(args.k)
        .into_iter()
        .map(|p| p.product_id)
        .collect();
    let (precision, recall) = evaluate_ranking(&users, args.k, |_, _| popular_ids.clone());
    info!(
        "popularity: precision@{}={:.4} recall@{}={:.4}",
        args.k, precision, args.k, recall
    );

    let (precision, recall) = evaluate_ranking(&users, args.k, |user_id, k| {
        similarity
            .recommend(user_id, k)
            .into_iter()
            .map(|r| r.product_id)
            .collect()
    });
    info!(
        "collaborative: precision@{}={:.4} recall@{}={:.4}",
        args.k, precision, args.k, recall
    );

    let (precision, recall) = evaluate_ranking(&users, args.k, |user_id, k| {
        embedding
            .recommend(user_id, k)
            .into_iter()
            .map(|r| r.product_id)
            .collect()
    });
    info!(
        "embedding: precision@{}={:.4} recall@{}={:.4}",
        args.k, precision, args.k, recall
    );

    Ok(())
}

/// Mean precision and recall at k over users with relevant held-out items.
fn evaluate_ranking<F>(users: &[(String, Vec<String>)], k: usize, recommend: F) -> (f64, f64)
where
    F: Fn(&str, usize) -> Vec<String> + Sync,
{
    if users.is_empty() {
        return (0.0, 0.0);
    }

    let calc = MetricsCalculator::new(k);
    let (precision_sum, recall_sum) = users
        .par_iter()
        .map(|(user_id, relevant)| {
            let recommended = recommend(user_id, k);
            (
                calc.calculate_precision_at_k(&recommended, relevant),
                calc.calculate_recall_at_k(&recommended, relevant),
            )
        })
        .reduce(|| (0.0, 0.0), |a, b| (a.0 + b.0, a.1 + b.1));

    let n = users.len() as f64;
    (precision_sum / n, recall_sum / n)
}
