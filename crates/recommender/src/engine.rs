//! Recommendation strategy selection
//!
//! Each request takes exactly one path, chosen in order:
//!
//! 1. user unknown to the collaborative model: fresh random sample of the catalog
//! 2. a currently viewed item is given: content neighbours of that item
//! 3. otherwise: most popular items
//!
//! Scores from the two models are never combined.

use crate::content::ContentModel;
use crate::store::CatalogStore;
use crate::training::{ModelHandle, TrainedModels};
use marquee_core::{Item, ItemSummary, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ColdStart,
    ContentSimilarity,
    Popularity,
}

/// One entry of a recommendation list
///
/// Content neighbours carry only the displayable summary; the catalog-backed
/// branches return whole items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecommendedItem {
    Item(Item),
    Summary(ItemSummary),
}

impl RecommendedItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Item(item) => &item.id,
            Self::Summary(summary) => &summary.id,
        }
    }

    /// Only catalog-backed entries carry popularity
    pub fn popularity(&self) -> Option<i64> {
        match self {
            Self::Item(item) => Some(item.popularity),
            Self::Summary(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendations {
    pub strategy: Strategy,
    pub items: Vec<RecommendedItem>,
}

pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    models: ModelHandle,
    neighbourhood: usize,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, models: ModelHandle, neighbourhood: usize) -> Self {
        Self {
            catalog,
            models,
            neighbourhood,
        }
    }

    pub fn models(&self) -> &ModelHandle {
        &self.models
    }

    /// Pick one strategy for this request and run it
    pub async fn hybrid_recommend(
        &self,
        user_id: &str,
        currently_viewing: Option<&str>,
        top_n: usize,
    ) -> Result<Recommendations> {
        let models = self.models.snapshot().await;
        let strategy = select_strategy(&models, user_id, currently_viewing);

        debug!(user_id = %user_id, strategy = ?strategy, top_n, "Selected recommendation strategy");

        let items = match strategy {
            Strategy::ColdStart => catalog_items(self.catalog.random_sample(top_n).await?),
            Strategy::ContentSimilarity => {
                let item_id = currently_viewing.unwrap_or_default();
                content_items(&models.content, item_id, top_n)
            }
            Strategy::Popularity => catalog_items(self.catalog.most_popular(top_n).await?),
        };

        Ok(Recommendations { strategy, items })
    }

    /// User-based collaborative recommendations
    ///
    /// Unknown users get an empty list. Scored ids missing from the catalog
    /// are dropped.
    pub async fn collaborative_recommend(&self, user_id: &str, top_n: usize) -> Result<Vec<Item>> {
        let models = self.models.snapshot().await;
        let scored = models
            .collaborative
            .recommend_items(user_id, self.neighbourhood, top_n);
        if scored.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = scored.into_iter().map(|s| s.item_id).collect();
        let items = self.catalog.get_many(&ids).await?;

        debug!(
            user_id = %user_id,
            scored = ids.len(),
            resolved = items.len(),
            "Collaborative recommendations resolved"
        );
        Ok(items.into_iter().map(Item::canonicalized).collect())
    }
}

fn select_strategy(models: &TrainedModels, user_id: &str, currently_viewing: Option<&str>) -> Strategy {
    if !models.collaborative.is_known_user(user_id) {
        Strategy::ColdStart
    } else if currently_viewing.is_some() {
        Strategy::ContentSimilarity
    } else {
        Strategy::Popularity
    }
}

fn catalog_items(items: Vec<Item>) -> Vec<RecommendedItem> {
    items
        .into_iter()
        .map(|item| RecommendedItem::Item(item.canonicalized()))
        .collect()
}

fn content_items(model: &ContentModel, item_id: &str, top_n: usize) -> Vec<RecommendedItem> {
    model
        .nearest_neighbors(item_id, top_n)
        .into_iter()
        .map(|neighbor| RecommendedItem::Summary(neighbor.item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborative::CollaborativeModel;
    use crate::config::CollaborativeConfig;
    use chrono::Utc;
    use marquee_core::Interaction;

    fn models_with_user(user: &str) -> TrainedModels {
        let log = vec![
            Interaction::new(user, "m1", 4.0, Utc::now()),
            Interaction::new(user, "m2", 2.0, Utc::now()),
        ];
        TrainedModels {
            collaborative: CollaborativeModel::train(&log, &CollaborativeConfig::default()).unwrap(),
            ..TrainedModels::empty()
        }
    }

    #[test]
    fn test_unknown_user_is_cold_start_even_when_viewing() {
        let models = models_with_user("known");
        assert_eq!(select_strategy(&models, "stranger", Some("m1")), Strategy::ColdStart);
        assert_eq!(select_strategy(&models, "stranger", None), Strategy::ColdStart);
    }

    #[test]
    fn test_known_user_viewing_uses_content() {
        let models = models_with_user("known");
        assert_eq!(
            select_strategy(&models, "known", Some("m1")),
            Strategy::ContentSimilarity
        );
    }

    #[test]
    fn test_known_user_browsing_uses_popularity() {
        let models = models_with_user("known");
        assert_eq!(select_strategy(&models, "known", None), Strategy::Popularity);
    }

    #[test]
    fn test_untrained_models_treat_everyone_as_cold_start() {
        assert_eq!(
            select_strategy(&TrainedModels::empty(), "user1", None),
            Strategy::ColdStart
        );
    }

    #[test]
    fn test_summary_entries_serialize_flat() {
        let entry = RecommendedItem::Summary(ItemSummary {
            id: "m1".to_string(),
            title: "Movie".to_string(),
            genre: "Drama".to_string(),
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"_id": "m1", "title": "Movie", "genre": "Drama"})
        );
        assert_eq!(entry.popularity(), None);
    }
}
