//! Training bootstrap and the shared model snapshot
//!
//! `TrainedModels` is built once from a snapshot of both stores and never
//! mutated. Requests hold an `Arc` to one snapshot for their whole lifetime;
//! `ModelHandle::retrain` builds a replacement off to the side and swaps it in.

use crate::collaborative::CollaborativeModel;
use crate::config::RecommenderConfig;
use crate::content::ContentModel;
use crate::store::{CatalogStore, InteractionLog};
use chrono::{DateTime, Utc};
use marquee_core::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

/// Sizes of the currently served models
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub content_items: usize,
    pub vocabulary_size: usize,
    pub users: usize,
    pub items_with_interactions: usize,
    pub rank: usize,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub content: ContentModel,
    pub collaborative: CollaborativeModel,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModels {
    /// Models that know nothing; every request takes a fallback branch
    pub fn empty() -> Self {
        Self {
            content: ContentModel::empty(),
            collaborative: CollaborativeModel::empty(),
            trained_at: Utc::now(),
        }
    }

    /// Snapshot both stores and train
    ///
    /// Store failures propagate. A model that fails to train is logged and
    /// replaced by its empty form.
    pub async fn build(
        catalog: &dyn CatalogStore,
        log: &dyn InteractionLog,
        config: &RecommenderConfig,
    ) -> Result<Self> {
        let started = Instant::now();

        let documents = catalog.fetch_documents(config.content.subset_limit).await?;
        let interactions = log.load_all().await?;

        info!(
            subset = documents.len(),
            interactions = interactions.len(),
            "Training recommendation models"
        );

        let content = ContentModel::train(documents, config.content.max_features);

        let collaborative = match CollaborativeModel::train(&interactions, &config.collaborative) {
            Ok(model) => model,
            Err(e) => {
                error!(error = %e, "Collaborative training failed; serving without it");
                CollaborativeModel::empty()
            }
        };

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model training complete"
        );

        Ok(Self {
            content,
            collaborative,
            trained_at: Utc::now(),
        })
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            content_items: self.content.len(),
            vocabulary_size: self.content.vocabulary_size(),
            users: self.collaborative.num_users(),
            items_with_interactions: self.collaborative.num_items(),
            rank: self.collaborative.rank(),
            trained_at: self.trained_at,
        }
    }
}

/// Shared pointer to the current model snapshot
#[derive(Clone)]
pub struct ModelHandle {
    current: Arc<RwLock<Arc<TrainedModels>>>,
    retrain_lock: Arc<Mutex<()>>,
}

impl ModelHandle {
    pub fn new(models: TrainedModels) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(models))),
            retrain_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The snapshot a request should run against
    pub async fn snapshot(&self) -> Arc<TrainedModels> {
        self.current.read().await.clone()
    }

    /// Rebuild from the stores and swap the new snapshot in
    ///
    /// Concurrent calls run one at a time. On a store failure the current
    /// snapshot stays in place.
    pub async fn retrain(
        &self,
        catalog: &dyn CatalogStore,
        log: &dyn InteractionLog,
        config: &RecommenderConfig,
    ) -> Result<ModelSummary> {
        let _guard = self.retrain_lock.lock().await;

        let models = TrainedModels::build(catalog, log, config).await?;
        let summary = models.summary();
        *self.current.write().await = Arc::new(models);

        info!(
            users = summary.users,
            content_items = summary.content_items,
            "Swapped in retrained models"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryCatalog, InMemoryInteractionLog};
    use marquee_core::{Interaction, Item, MarqueeError};

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new(vec![
            Item::new("A", "A", "Action", "fast car", 3),
            Item::new("B", "B", "Action", "fast bike", 2),
            Item::new("C", "C", "Drama", "slow romance", 1),
        ])
    }

    #[tokio::test]
    async fn test_subset_is_capped() {
        let mut config = RecommenderConfig::default();
        config.content.subset_limit = 2;

        let models = TrainedModels::build(&catalog(), &InMemoryInteractionLog::default(), &config)
            .await
            .unwrap();

        assert_eq!(models.content.len(), 2);
        assert!(!models.content.contains("C"));
        assert_eq!(models.collaborative.num_users(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let log = InMemoryInteractionLog::default();
        log.set_offline(true);

        let result = TrainedModels::build(&catalog(), &log, &RecommenderConfig::default()).await;
        assert!(matches!(result, Err(MarqueeError::StoreUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_unusable_rating_does_not_drop_other_users() {
        let now = Utc::now();
        let log = InMemoryInteractionLog::new(vec![
            Interaction::new("alice", "A", 5.0, now),
            Interaction::new("alice", "B", 3.0, now),
            Interaction::new("bob", "B", 4.0, now),
            Interaction::new("bob", "C", 2.0, now),
            Interaction::new("mallory", "A", 1e39, now),
        ]);

        let models = TrainedModels::build(&catalog(), &log, &RecommenderConfig::default())
            .await
            .unwrap();

        assert_eq!(models.content.len(), 3);
        assert!(models.collaborative.is_known_user("alice"));
        assert!(models.collaborative.is_known_user("bob"));
        assert!(!models.collaborative.is_known_user("mallory"));
    }

    #[tokio::test]
    async fn test_retrain_picks_up_new_interactions() {
        let catalog = catalog();
        let log = InMemoryInteractionLog::default();
        let config = RecommenderConfig::default();

        let handle = ModelHandle::new(TrainedModels::build(&catalog, &log, &config).await.unwrap());
        let before = handle.snapshot().await;
        assert!(!before.collaborative.is_known_user("u1"));

        log.append(&Interaction::new("u1", "A", 4.0, Utc::now()))
            .await
            .unwrap();
        assert!(!handle.snapshot().await.collaborative.is_known_user("u1"));

        let summary = handle.retrain(&catalog, &log, &config).await.unwrap();
        assert_eq!(summary.users, 1);
        assert!(handle.snapshot().await.collaborative.is_known_user("u1"));
        // Old snapshot is untouched
        assert!(!before.collaborative.is_known_user("u1"));
    }

    #[tokio::test]
    async fn test_failed_retrain_keeps_current_snapshot() {
        let catalog = catalog();
        let log = InMemoryInteractionLog::new(vec![Interaction::new("u1", "A", 4.0, Utc::now())]);
        let config = RecommenderConfig::default();
        let handle = ModelHandle::new(TrainedModels::build(&catalog, &log, &config).await.unwrap());

        catalog.set_offline(true);
        assert!(handle.retrain(&catalog, &log, &config).await.is_err());
        assert!(handle.snapshot().await.collaborative.is_known_user("u1"));
    }
}
