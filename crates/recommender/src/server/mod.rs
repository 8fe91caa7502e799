//! HTTP boundary

pub mod handlers;

use crate::config::RecommenderConfig;
use crate::engine::RecommendationEngine;
use crate::store::{CatalogStore, InteractionLog};
use actix_web::{web, HttpResponse, Responder};
use marquee_core::MarqueeError;
use serde::Serialize;
use std::sync::Arc;

/// Application state shared across all handlers
///
/// Built after the first training run completes, so a handler never sees a
/// partially trained model.
pub struct AppState {
    pub config: Arc<RecommenderConfig>,
    pub catalog: Arc<dyn CatalogStore>,
    pub interactions: Arc<dyn InteractionLog>,
    pub engine: Arc<RecommendationEngine>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// Liveness
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "marquee-recommender".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Configure application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        MarqueeError::validation(format!("Invalid JSON body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        MarqueeError::validation(format!("Invalid query string: {}", err)).into()
    }))
    .route("/health", web::get().to(health))
    .route("/ready", web::get().to(handlers::readiness))
    .service(
        web::scope("/api")
            .route("/movies", web::get().to(handlers::list_movies))
            .route("/recommend/{user_id}", web::get().to(handlers::recommend))
            .route(
                "/recommend/{user_id}/collaborative",
                web::get().to(handlers::recommend_collaborative),
            )
            .route("/interact", web::post().to(handlers::interact))
            .route("/admin/retrain", web::post().to(handlers::retrain)),
    );
}
