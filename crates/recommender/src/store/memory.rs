//! In-process stores for tests and local runs

use super::{CatalogStore, InteractionLog};
use async_trait::async_trait;
use marquee_core::{ContentDocument, Interaction, Item, MarqueeError, Result};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Catalog held in insertion order
#[derive(Default)]
pub struct InMemoryCatalog {
    items: RwLock<Vec<Item>>,
    offline: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every call fail with `StoreUnavailable` until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(MarqueeError::store_unavailable(
                "catalog is offline",
                operation,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn fetch_documents(&self, limit: usize) -> Result<Vec<ContentDocument>> {
        self.check("fetch_documents")?;
        let items = self.items.read().await;
        Ok(items.iter().take(limit).map(Item::to_document).collect())
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Item>> {
        self.check("fetch_page")?;
        let items = self.items.read().await;
        Ok(items.iter().skip(offset).take(limit).cloned().collect())
    }

    async fn most_popular(&self, limit: usize) -> Result<Vec<Item>> {
        self.check("most_popular")?;
        let mut items = self.items.read().await.clone();
        items.sort_by(|a, b| b.popularity.cmp(&a.popularity));
        items.truncate(limit);
        Ok(items)
    }

    async fn random_sample(&self, size: usize) -> Result<Vec<Item>> {
        self.check("random_sample")?;
        let items = self.items.read().await;
        let mut rng = rand::thread_rng();
        Ok(items.choose_multiple(&mut rng, size).cloned().collect())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Item>> {
        self.check("get_many")?;
        let items = self.items.read().await;
        let by_id: HashMap<&str, &Item> = items.iter().map(|i| (i.id.as_str(), i)).collect();
        Ok(ids
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|item| (*item).clone()))
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.check("ping")
    }
}

/// Append-only interaction log
#[derive(Default)]
pub struct InMemoryInteractionLog {
    events: RwLock<Vec<Interaction>>,
    offline: AtomicBool,
}

impl InMemoryInteractionLog {
    pub fn new(events: Vec<Interaction>) -> Self {
        Self {
            events: RwLock::new(events),
            offline: AtomicBool::new(false),
        }
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(MarqueeError::store_unavailable(
                "interaction log is offline",
                operation,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl InteractionLog for InMemoryInteractionLog {
    async fn append(&self, interaction: &Interaction) -> Result<()> {
        self.check("append")?;
        self.events.write().await.push(interaction.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Interaction>> {
        self.check("load_all")?;
        let mut events = self.events.read().await.clone();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    async fn ping(&self) -> Result<()> {
        self.check("ping")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn catalog() -> InMemoryCatalog {
        InMemoryCatalog::new(
            (1..=20)
                .map(|i| {
                    Item::new(
                        format!("m{}", i),
                        format!("Movie Title {}", i),
                        "Drama",
                        "plot",
                        (i * 7 % 20) as i64,
                    )
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_most_popular_sorted_descending() {
        let popular = catalog().most_popular(5).await.unwrap();
        assert_eq!(popular.len(), 5);
        assert!(popular.windows(2).all(|p| p[0].popularity >= p[1].popularity));
    }

    #[tokio::test]
    async fn test_random_sample_has_distinct_items() {
        let sample = catalog().random_sample(12).await.unwrap();
        assert_eq!(sample.len(), 12);
        let mut ids: Vec<_> = sample.iter().map(|i| i.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 12);
    }

    #[tokio::test]
    async fn test_random_sample_capped_by_catalog() {
        assert_eq!(catalog().random_sample(50).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_get_many_preserves_order_and_skips_missing() {
        let ids = vec!["m3".to_string(), "ghost".to_string(), "m1".to_string()];
        let items = catalog().get_many(&ids).await.unwrap();
        let found: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(found, vec!["m3", "m1"]);
    }

    #[tokio::test]
    async fn test_offline_catalog_reports_store_unavailable() {
        let store = catalog();
        store.set_offline(true);
        assert!(matches!(
            store.fetch_page(0, 12).await,
            Err(MarqueeError::StoreUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_all_is_oldest_first() {
        let now = Utc::now();
        let log = InMemoryInteractionLog::default();
        log.append(&Interaction::new("u", "b", 1.0, now)).await.unwrap();
        log.append(&Interaction::new("u", "a", 1.0, now - Duration::seconds(10)))
            .await
            .unwrap();

        let events = log.load_all().await.unwrap();
        assert_eq!(events[0].item_id, "a");
        assert_eq!(events[1].item_id, "b");
    }
}
