//! Catalog item records
//!
//! Items are owned by the catalog store and read-only to the recommendation
//! engine. Display-only fields (director, poster, external links, ...) travel in
//! `attributes` and are never inspected by the engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical string form of an item identifier
///
/// UUID-shaped ids are rendered hyphenated and lowercase; anything else is
/// returned trimmed.
pub fn canonical_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match uuid::Uuid::parse_str(trimmed) {
        Ok(id) => id.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// A catalog item as stored and served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Canonical string form of the store-assigned key
    #[serde(rename = "_id", alias = "id")]
    pub id: String,

    pub title: String,

    pub genre: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub popularity: i64,

    /// Opaque passthrough fields
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        genre: impl Into<String>,
        description: impl Into<String>,
        popularity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            genre: genre.into(),
            description: description.into(),
            popularity,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Same item with its id in canonical form
    pub fn canonicalized(mut self) -> Self {
        self.id = canonical_id(&self.id);
        self
    }

    /// Projection used for content training
    pub fn to_document(&self) -> ContentDocument {
        ContentDocument {
            id: self.id.clone(),
            title: self.title.clone(),
            genre: self.genre.clone(),
            description: self.description.clone(),
        }
    }
}

/// Projection of an item carrying only what text-feature training reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDocument {
    pub id: String,
    pub title: String,
    pub genre: String,
    pub description: String,
}

impl ContentDocument {
    /// Genre and description joined into one training text
    pub fn feature_text(&self) -> String {
        format!("{} {}", self.genre, self.description)
    }

    pub fn summary(&self) -> ItemSummary {
        ItemSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            genre: self.genre.clone(),
        }
    }
}

/// Displayable fields returned by content-similarity recommendations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub genre: String,
}

impl ItemSummary {
    pub fn canonicalized(mut self) -> Self {
        self.id = canonical_id(&self.id);
        self
    }
}
