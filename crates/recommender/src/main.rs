//! Marquee Recommender Service
//!
//! Trains both models before binding, so the listener only opens once the
//! service can answer requests.

use actix_web::{middleware::Logger, web, App, HttpServer};
use marquee_core::{
    init_logging, load_dotenv, ConfigLoader, DatabaseConfig, DatabasePool, LogConfig, LogFormat,
    ServiceConfig,
};
use marquee_recommender::{
    build_state, server, CatalogStore, InteractionLog, PostgresCatalogStore,
    PostgresInteractionLog, RecommenderConfig, TrainedModels,
};
use std::sync::Arc;
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let service_config = ServiceConfig::from_env()?;
    service_config.validate()?;

    init_logging(&LogConfig {
        format: LogFormat::from_name(
            &std::env::var("MARQUEE_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        ),
        level: service_config.log_level.clone(),
        service_name: "marquee-recommender".to_string(),
    })?;

    let db_config = DatabaseConfig::from_env()?;
    db_config.validate()?;
    let recommender_config = RecommenderConfig::load()?;
    if recommender_config.api.admin_token.is_none() {
        warn!("RECOMMENDER__API__ADMIN_TOKEN is unset; admin routes are disabled");
    }

    let pool = DatabasePool::new(&db_config).await?;

    let catalog = PostgresCatalogStore::new(pool.pool().clone());
    let interactions = PostgresInteractionLog::new(pool.pool().clone());
    catalog.ensure_schema().await?;
    interactions.ensure_schema().await?;

    let catalog: Arc<dyn CatalogStore> = Arc::new(catalog);
    let interactions: Arc<dyn InteractionLog> = Arc::new(interactions);

    // A store failure here aborts startup; training failures only degrade.
    let models =
        TrainedModels::build(catalog.as_ref(), interactions.as_ref(), &recommender_config).await?;
    info!(summary = ?models.summary(), "Models ready");

    let state = web::Data::new(build_state(
        recommender_config,
        catalog,
        interactions,
        models,
    ));

    let bind_addr = service_config.bind_address();
    info!("Marquee recommender listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(server::configure_routes)
            .wrap(Logger::default())
    })
    .workers(service_config.workers)
    .bind(&bind_addr)?
    .run()
    .await?;

    Ok(())
}
