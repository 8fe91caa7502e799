//! PostgreSQL store tests
//!
//! Require a database: `DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::Utc;
use marquee_core::{ConfigLoader, DatabaseConfig, DatabasePool, Interaction, Item};
use marquee_recommender::{
    CatalogStore, InteractionLog, PostgresCatalogStore, PostgresInteractionLog,
    RecommenderConfig, TrainedModels,
};

async fn pool() -> DatabasePool {
    let config = DatabaseConfig::from_env().expect("DATABASE_URL must be set");
    DatabasePool::new(&config).await.expect("database reachable")
}

async fn stores() -> (PostgresCatalogStore, PostgresInteractionLog) {
    let pool = pool().await;

    let catalog = PostgresCatalogStore::new(pool.pool().clone());
    let log = PostgresInteractionLog::new(pool.pool().clone());
    catalog.ensure_schema().await.unwrap();
    log.ensure_schema().await.unwrap();
    (catalog, log)
}

#[tokio::test]
#[ignore]
async fn test_items_round_trip_with_passthrough_fields() {
    let (catalog, _) = stores().await;

    let item = Item::new("", "Pg Title", "Action", "fast car", 99)
        .with_attribute("director", "Bigelow");
    let id = catalog.insert_item(&item).await.unwrap();

    let found = catalog.get_many(&[id.clone(), "not-a-uuid".to_string()]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
    assert_eq!(found[0].attributes.get("director"), Some(&serde_json::json!("Bigelow")));
}

#[tokio::test]
#[ignore]
async fn test_popular_and_sample_queries() {
    let (catalog, _) = stores().await;
    for i in 0..5 {
        catalog
            .insert_item(&Item::new("", format!("Pg {}", i), "Drama", "plot", i))
            .await
            .unwrap();
    }

    let popular = catalog.most_popular(5).await.unwrap();
    assert!(popular.windows(2).all(|p| p[0].popularity >= p[1].popularity));
    assert_eq!(catalog.random_sample(3).await.unwrap().len(), 3);
    assert!(catalog.fetch_documents(3).await.unwrap().len() <= 3);
}

#[tokio::test]
#[ignore]
async fn test_interactions_feed_training() {
    let (catalog, log) = stores().await;
    let user = format!("pg-user-{}", uuid::Uuid::new_v4());

    log.append(&Interaction::new(user.clone(), "orphan-item", 4.0, Utc::now()))
        .await
        .unwrap();

    let models = TrainedModels::build(&catalog, &log, &RecommenderConfig::default())
        .await
        .unwrap();
    assert!(models.collaborative.is_known_user(&user));
}

#[tokio::test]
#[ignore]
async fn test_random_sample_on_analyzed_table_returns_distinct_rows() {
    let (catalog, _) = stores().await;
    for i in 0..300 {
        catalog
            .insert_item(&Item::new("", format!("Sampled {}", i), "Comedy", "plot", i))
            .await
            .unwrap();
    }
    sqlx::query("ANALYZE catalog.items")
        .execute(pool().await.pool())
        .await
        .unwrap();

    let sample = catalog.random_sample(12).await.unwrap();
    assert_eq!(sample.len(), 12);
    let mut ids: Vec<_> = sample.iter().map(|item| item.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 12);
}
