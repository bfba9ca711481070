use shoprec::*;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    init_tracing();

    println!("Shoprec basic usage walkthrough");

    // 1. Configuration tuned down for a tiny in-memory dataset
    let mut config = Config::default();
    config.training.embedding_dim = 16;
    config.training.epochs = 30;
    config.training.batch_size = 8;
    config.training.validation_split = 0.0;
    config.recommendation.min_interactions = 1;
    println!("Configuration ready");

    // 2. A small interaction log and product catalog
    let interactions = vec![
        Interaction::new("alice", "p1", 5.0),
        Interaction::new("alice", "p2", 4.0),
        Interaction::new("alice", "p5", 1.0),
        Interaction::new("bob", "p1", 4.0),
        Interaction::new("bob", "p3", 5.0),
        Interaction::new("bob", "p4", 2.0),
        Interaction::new("carol", "p2", 5.0),
        Interaction::new("carol", "p3", 4.0),
        Interaction::new("dave", "p4", 3.0),
        Interaction::new("dave", "p5", 4.0),
        Interaction::new("dave", "p1", 2.0),
    ];
    let products = vec![
        Product::new("p1", "Wireless Mouse", "Electronics"),
        Product::new("p2", "Mechanical Keyboard", "Electronics"),
        Product::new("p3", "Yoga Mat", "Sports"),
        Product::new("p4", "Running Shoes", "Sports"),
        Product::new("p5", "Desk Lamp", "Home"),
    ];
    let store = Arc::new(InteractionStore::from_records(interactions, products));
    println!(
        "Dataset: {} interactions over {} products",
        store.num_interactions(),
        store.num_products()
    );

    // 3. Train every strategy in one shot
    println!("\nTraining...");
    let service = RecommendationService::train(store, &config)?;
    println!("Training complete");

    // 4. Ask each strategy for recommendations
    for strategy in [
        Strategy::Popularity,
        Strategy::TopRated,
        Strategy::Collaborative,
        Strategy::Embedding,
    ] {
        println!("\nTop picks for alice via {strategy}:");
        for (i, rec) in service.recommend(strategy, "alice", 3).iter().enumerate() {
            match rec.score {
                Some(score) => println!(
                    "  {}. {} [{}] score={:.3}",
                    i + 1,
                    rec.product_name,
                    rec.category,
                    score
                ),
                None => println!("  {}. {} [{}]", i + 1, rec.product_name, rec.category),
            }
        }
    }

    // 5. Users the models have never seen get empty personalized results
    let cold = service.recommend(Strategy::Collaborative, "mallory", 3);
    println!(
        "\nPersonalized recommendations for an unknown user: {} rows",
        cold.len()
    );
    let fallback = service.recommend(Strategy::Popularity, "mallory", 3);
    println!("Popularity fallback still works: {} rows", fallback.len());

    Ok(())
}
