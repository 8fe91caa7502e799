//! Catalog and interaction store boundaries
//!
//! The engine only talks to these traits. Every failure they return is a
//! `StoreUnavailable`; an empty result always means empty data.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryCatalog, InMemoryInteractionLog};
pub use postgres::{PostgresCatalogStore, PostgresInteractionLog};

use async_trait::async_trait;
use marquee_core::{ContentDocument, Interaction, Item, Result};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Up to `limit` items in store order, projected to the text fields
    async fn fetch_documents(&self, limit: usize) -> Result<Vec<ContentDocument>>;

    /// Items in store order starting at `offset`
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Item>>;

    /// Items by descending popularity
    async fn most_popular(&self, limit: usize) -> Result<Vec<Item>>;

    /// A fresh uniform sample of up to `size` items from the whole catalog
    async fn random_sample(&self, size: usize) -> Result<Vec<Item>>;

    /// Items for the given ids, in the order given; unknown ids are skipped
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Item>>;

    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait InteractionLog: Send + Sync {
    async fn append(&self, interaction: &Interaction) -> Result<()>;

    /// Every interaction, oldest first
    async fn load_all(&self) -> Result<Vec<Interaction>>;

    async fn ping(&self) -> Result<()>;
}
