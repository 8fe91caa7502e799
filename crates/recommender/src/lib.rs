//! # Marquee Recommender
//!
//! Hybrid recommendation engine for the Marquee catalog. Two models are trained
//! once at startup from a snapshot of the catalog and interaction stores:
//!
//! - `content`: TF-IDF similarity over a capped catalog subset, computed per query
//! - `collaborative`: low-rank projection of the user x item rating matrix
//!
//! The `engine` picks one strategy per request (cold-start sample, content
//! neighbours or popularity) and the `server` module exposes it over HTTP.

pub mod collaborative;
pub mod config;
pub mod content;
pub mod engine;
pub mod server;
pub mod sparse;
pub mod store;
pub mod svd;
pub mod tfidf;
pub mod training;

pub use collaborative::{CollaborativeModel, ScoredItem, UserAffinity};
pub use config::RecommenderConfig;
pub use content::{ContentModel, Neighbor};
pub use engine::{RecommendationEngine, RecommendedItem, Recommendations, Strategy};
pub use server::AppState;
pub use store::{
    CatalogStore, InMemoryCatalog, InMemoryInteractionLog, InteractionLog, PostgresCatalogStore,
    PostgresInteractionLog,
};
pub use training::{ModelHandle, ModelSummary, TrainedModels};

use std::sync::Arc;

/// Wire stores, models and configuration into the shared handler state
pub fn build_state(
    config: RecommenderConfig,
    catalog: Arc<dyn CatalogStore>,
    interactions: Arc<dyn InteractionLog>,
    models: TrainedModels,
) -> AppState {
    let engine = RecommendationEngine::new(
        catalog.clone(),
        ModelHandle::new(models),
        config.collaborative.neighbourhood,
    );

    AppState {
        config: Arc::new(config),
        catalog,
        interactions,
        engine: Arc::new(engine),
    }
}
