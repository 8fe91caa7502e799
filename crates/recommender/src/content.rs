//! Content-based similarity over a capped catalog subset
//!
//! The model keeps the subset in fetch order next to a TF-IDF matrix whose row
//! `i` describes subset item `i`. Similarities are computed per query, one row
//! against all rows; the subset-by-subset matrix is never built.

use crate::sparse::SparseMatrix;
use crate::tfidf::TfidfVectorizer;
use marquee_core::{ContentDocument, ItemSummary};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A subset item with its cosine similarity to the query item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    #[serde(flatten)]
    pub item: ItemSummary,
    pub similarity: f32,
}

#[derive(Debug, Clone)]
pub struct ContentModel {
    documents: Vec<ContentDocument>,
    /// First subset position of each id
    positions: HashMap<String, usize>,
    vectorizer: TfidfVectorizer,
    features: SparseMatrix,
}

impl Default for ContentModel {
    fn default() -> Self {
        Self::empty()
    }
}

impl ContentModel {
    /// Model with no subset; every lookup misses
    pub fn empty() -> Self {
        Self {
            documents: Vec::new(),
            positions: HashMap::new(),
            vectorizer: TfidfVectorizer::default(),
            features: SparseMatrix::empty(0, 0),
        }
    }

    /// Learn the vocabulary over genre + description of each subset item
    pub fn train(documents: Vec<ContentDocument>, max_features: usize) -> Self {
        if documents.is_empty() {
            warn!("Content subset is empty; content recommendations disabled");
            return Self::empty();
        }

        let texts: Vec<String> = documents.iter().map(ContentDocument::feature_text).collect();
        let (vectorizer, features) = TfidfVectorizer::fit_transform(&texts, max_features);

        let mut positions = HashMap::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            positions.entry(document.id.clone()).or_insert(index);
        }

        info!(
            items = documents.len(),
            vocabulary = vectorizer.vocabulary_size(),
            stored_weights = features.nnz(),
            "Content model trained"
        );

        Self {
            documents,
            positions,
            vectorizer,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    /// (subset size, vocabulary size)
    pub fn feature_shape(&self) -> (usize, usize) {
        self.features.shape()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.positions.contains_key(item_id)
    }

    /// The `top_n` subset items most similar to `item_id`
    ///
    /// Returns an empty list when the id is not in the subset. The query item
    /// itself is never returned; equal similarities keep subset order.
    pub fn nearest_neighbors(&self, item_id: &str, top_n: usize) -> Vec<Neighbor> {
        let Some(&position) = self.positions.get(item_id) else {
            debug!(item_id = %item_id, "Item outside content subset");
            return Vec::new();
        };

        let similarities = self.features.row_dot_all(position);

        let mut ranked: Vec<(usize, f32)> = similarities
            .into_iter()
            .enumerate()
            .filter(|(index, _)| *index != position)
            .collect();
        // Stable: ties stay in subset order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranked
            .into_iter()
            .take(top_n)
            .map(|(index, similarity)| Neighbor {
                item: self.documents[index].summary().canonicalized(),
                similarity,
            })
            .collect()
    }
}
