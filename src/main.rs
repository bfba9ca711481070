use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shoprec::{
    init_tracing, AppState, Config, PopularProduct, RecommendationResponse, Strategy,
    TopRatedProduct,
};
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
struct RecommendationQuery {
    strategy: Option<String>,
    n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct PopularQuery {
    n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TopRatedQuery {
    n: Option<usize>,
    min_interactions: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    message: String,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: "Success".to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message,
        }
    }
}

async fn health_check() -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "shoprec-recommendation".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());

    Json(ApiResponse::success(status))
}

async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<RecommendationQuery>,
) -> (StatusCode, Json<ApiResponse<RecommendationResponse>>) {
    let n = params.n.unwrap_or(state.config.recommendation.default_n);
    if let Err(e) = shoprec::utils::validation::validate_top_n(n) {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())));
    }

    let strategy = match params.strategy.as_deref().unwrap_or("popularity").parse::<Strategy>() {
        Ok(strategy) => strategy,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())));
        }
    };

    state.record_request(strategy.as_str());
    let recommendations = state.service().recommend(strategy, &user_id, n);

    let response = RecommendationResponse {
        user_id,
        strategy,
        recommendations,
        generated_at: Utc::now(),
    };

    (StatusCode::OK, Json(ApiResponse::success(response)))
}

async fn get_popular(
    State(state): State<AppState>,
    Query(params): Query<PopularQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<PopularProduct>>>) {
    let n = params.n.unwrap_or(state.config.recommendation.default_n);
    if let Err(e) = shoprec::utils::validation::validate_top_n(n) {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())));
    }

    state.record_request(Strategy::Popularity.as_str());
    let products = state.service().popularity().top_popular(n);

    (StatusCode::OK, Json(ApiResponse::success(products)))
}

async fn get_top_rated(
    State(state): State<AppState>,
    Query(params): Query<TopRatedQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<TopRatedProduct>>>) {
    let n = params.n.unwrap_or(state.config.recommendation.default_n);
    if let Err(e) = shoprec::utils::validation::validate_top_n(n) {
        return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(e.to_string())));
    }

    let min_interactions = params
        .min_interactions
        .unwrap_or(state.config.recommendation.min_interactions);

    state.record_request(Strategy::TopRated.as_str());
    let products = state.service().popularity().top_rated(n, min_interactions);

    (StatusCode::OK, Json(ApiResponse::success(products)))
}

async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<HashMap<String, u64>>> {
    let stats: HashMap<String, u64> = state
        .serving_stats
        .iter()
        .map(|entry| (entry.key().clone(), *entry.value()))
        .collect();

    Json(ApiResponse::success(stats))
}

async fn reload_models(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<String>>) {
    // retraining is CPU heavy, keep it off the async workers
    let result = tokio::task::spawn_blocking(move || state.reload()).await;

    match result {
        Ok(Ok(())) => (
            StatusCode::OK,
            Json(ApiResponse::success("Models reloaded".to_string())),
        ),
        Ok(Err(e)) => {
            tracing::error!("Failed to reload models: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        }
        Err(e) => {
            tracing::error!("Reload task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Reload task failed".to_string())),
            )
        }
    }
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recommendations/:user_id", get(get_recommendations))
        .route("/products/popular", get(get_popular))
        .route("/products/top_rated", get(get_top_rated))
        .route("/stats", get(get_stats))
        .route("/reload", post(reload_models))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = "config/default.toml";
    let config = if std::path::Path::new(config_path).exists() {
        Config::from_file(config_path)?
    } else {
        info!("Config file {} not found, using defaults", config_path);
        Config::default()
    };
    info!("Starting shoprec server with config: {:?}", config.server);

    let state = AppState::new(config.clone())?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;
    info!("Server listening on {}", config.server.socket_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
