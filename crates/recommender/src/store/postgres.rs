//! PostgreSQL-backed catalog and interaction log
//!
//! Items live in `catalog.items` with a UUID key and a JSONB `attributes`
//! column for passthrough fields. Interactions live in `catalog.interactions`
//! with plain TEXT ids and no foreign key to the items table.

use super::{CatalogStore, InteractionLog};
use async_trait::async_trait;
use marquee_core::{ContentDocument, Interaction, Item, MarqueeError, Result};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tracing::{debug, error};
use uuid::Uuid;

const ITEM_COLUMNS: &str = "id, title, genre, description, popularity, attributes";

/// Expected sampled rows per requested row, so a Bernoulli pass rarely comes up short
const SAMPLE_HEADROOM: f64 = 4.0;

/// Bernoulli sampling percentage for `size` rows out of roughly `estimate`
///
/// `None` when the planner has no usable row estimate or the sample would
/// cover the whole table anyway.
fn sample_percent(size: usize, estimate: f64) -> Option<f64> {
    if size == 0 || !estimate.is_finite() || estimate <= 0.0 {
        return None;
    }
    let percent = size as f64 * SAMPLE_HEADROOM / estimate * 100.0;
    (percent < 100.0).then_some(percent)
}

fn store_error(operation: &'static str) -> impl Fn(sqlx::Error) -> MarqueeError {
    move |e| {
        error!(operation, error = %e, "Store query failed");
        MarqueeError::store_unavailable(e.to_string(), operation)
    }
}

fn limit_param(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn item_from_row(row: &PgRow) -> Result<Item> {
    let id: Uuid = row.try_get("id")?;
    let attributes: Option<Value> = row.try_get("attributes")?;
    let attributes = match attributes {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    Ok(Item {
        id: id.to_string(),
        title: row.try_get("title")?,
        genre: row.try_get("genre")?,
        description: row.try_get("description")?,
        popularity: row.try_get("popularity")?,
        attributes,
    })
}

#[derive(Clone)]
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the schema and items table if missing
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query("CREATE SCHEMA IF NOT EXISTS catalog")
            .execute(&self.pool)
            .await
            .map_err(store_error("ensure_schema"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog.items (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                genre TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                popularity BIGINT NOT NULL DEFAULT 0,
                attributes JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_error("ensure_schema"))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_items_popularity ON catalog.items (popularity DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(store_error("ensure_schema"))?;

        Ok(())
    }

    /// Insert an item, returning its store-assigned id
    pub async fn insert_item(&self, item: &Item) -> Result<String> {
        let row = sqlx::query(
            r#"
            INSERT INTO catalog.items (title, genre, description, popularity, attributes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&item.title)
        .bind(&item.genre)
        .bind(&item.description)
        .bind(item.popularity)
        .bind(Value::Object(item.attributes.clone()))
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("insert_item"))?;

        let id: Uuid = row.try_get("id")?;
        Ok(id.to_string())
    }

    async fn fetch_items(&self, sql: &str, limit: usize, operation: &'static str) -> Result<Vec<Item>> {
        let rows = sqlx::query(sql)
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error(operation))?;

        rows.iter().map(item_from_row).collect()
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn fetch_documents(&self, limit: usize) -> Result<Vec<ContentDocument>> {
        let rows = sqlx::query("SELECT id, title, genre, description FROM catalog.items LIMIT $1")
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("fetch_documents"))?;

        rows.iter()
            .map(|row| -> Result<ContentDocument> {
                let id: Uuid = row.try_get("id")?;
                Ok(ContentDocument {
                    id: id.to_string(),
                    title: row.try_get("title")?,
                    genre: row.try_get("genre")?,
                    description: row.try_get("description")?,
                })
            })
            .collect()
    }

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<Item>> {
        let sql = format!(
            "SELECT {} FROM catalog.items ORDER BY created_at, id OFFSET $2 LIMIT $1",
            ITEM_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit_param(limit))
            .bind(limit_param(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("fetch_page"))?;

        rows.iter().map(item_from_row).collect()
    }

    async fn most_popular(&self, limit: usize) -> Result<Vec<Item>> {
        let sql = format!(
            "SELECT {} FROM catalog.items ORDER BY popularity DESC LIMIT $1",
            ITEM_COLUMNS
        );
        self.fetch_items(&sql, limit, "most_popular").await
    }

    async fn random_sample(&self, size: usize) -> Result<Vec<Item>> {
        let estimate = sqlx::query_scalar::<_, f64>(
            "SELECT reltuples::float8 FROM pg_class WHERE oid = 'catalog.items'::regclass",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("random_sample"))?
        .unwrap_or(-1.0);

        // Shuffle only a Bernoulli sample a few times the requested size.
        // Small or never-analyzed tables shuffle in full.
        if let Some(percent) = sample_percent(size, estimate) {
            let sql = format!(
                "SELECT {} FROM catalog.items TABLESAMPLE BERNOULLI ($2::real) \
                 ORDER BY random() LIMIT $1",
                ITEM_COLUMNS
            );
            let rows = sqlx::query(&sql)
                .bind(limit_param(size))
                .bind(percent as f32)
                .fetch_all(&self.pool)
                .await
                .map_err(store_error("random_sample"))?;

            if rows.len() == size {
                return rows.iter().map(item_from_row).collect();
            }
            debug!(
                requested = size,
                sampled = rows.len(),
                "Bernoulli sample came up short; shuffling the full table"
            );
        }

        let sql = format!(
            "SELECT {} FROM catalog.items ORDER BY random() LIMIT $1",
            ITEM_COLUMNS
        );
        self.fetch_items(&sql, size, "random_sample").await
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Item>> {
        let uuids: Vec<Uuid> = ids.iter().filter_map(|id| Uuid::parse_str(id).ok()).collect();
        if uuids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {} FROM catalog.items WHERE id = ANY($1)", ITEM_COLUMNS);
        let rows = sqlx::query(&sql)
            .bind(&uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error("get_many"))?;

        let mut by_id: HashMap<String, Item> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let item = item_from_row(row)?;
            by_id.insert(item.id.clone(), item);
        }

        debug!(requested = ids.len(), found = by_id.len(), "Resolved catalog ids");
        Ok(uuids
            .iter()
            .filter_map(|id| by_id.remove(&id.to_string()))
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error("ping"))?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PostgresInteractionLog {
    pool: PgPool,
}

impl PostgresInteractionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query("CREATE SCHEMA IF NOT EXISTS catalog")
            .execute(&self.pool)
            .await
            .map_err(store_error("ensure_schema"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog.interactions (
                id BIGSERIAL PRIMARY KEY,
                user_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                rating DOUBLE PRECISION NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_error("ensure_schema"))?;

        Ok(())
    }
}

#[async_trait]
impl InteractionLog for PostgresInteractionLog {
    async fn append(&self, interaction: &Interaction) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO catalog.interactions (user_id, item_id, rating, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&interaction.user_id)
        .bind(&interaction.item_id)
        .bind(interaction.rating)
        .bind(interaction.timestamp)
        .execute(&self.pool)
        .await
        .map_err(store_error("append"))?;

        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Interaction>> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, item_id, rating, created_at
            FROM catalog.interactions
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("load_all"))?;

        rows.iter()
            .map(|row| -> Result<Interaction> {
                Ok(Interaction::new(
                    row.try_get::<String, _>("user_id")?,
                    row.try_get::<String, _>("item_id")?,
                    row.try_get::<f64, _>("rating")?,
                    row.try_get("created_at")?,
                ))
            })
            .collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error("ping"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_percent_scales_with_table_size() {
        let percent = sample_percent(12, 100_000.0).unwrap();
        assert!((percent - 0.048).abs() < 1e-9);
    }

    #[test]
    fn test_sample_percent_falls_back_for_small_or_unknown_tables() {
        assert_eq!(sample_percent(12, 40.0), None);
        assert_eq!(sample_percent(12, -1.0), None);
        assert_eq!(sample_percent(12, 0.0), None);
        assert_eq!(sample_percent(0, 100_000.0), None);
    }
}
