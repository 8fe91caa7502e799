//! User-based collaborative filtering over a low-rank projection
//!
//! Training maps the distinct user and item ids seen in the interaction log to
//! dense indices, builds the sparse user x item rating matrix and projects it to
//! `rank` dimensions with a seeded randomized SVD. The user affinity structure is
//! kept in factored form: each reduced row is centred and scaled to unit length,
//! so the dot product of two rows is the Pearson correlation of the original
//! reduced rows. Pairwise affinities are computed on demand.

use crate::config::CollaborativeConfig;
use crate::sparse::SparseMatrix;
use crate::svd::{self, SvdParams};
use marquee_core::{Interaction, MarqueeError};
use ndarray::{Array2, ArrayView1};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// A user and its affinity to the query user
#[derive(Debug, Clone, PartialEq)]
pub struct UserAffinity {
    pub user_id: String,
    pub affinity: f64,
}

/// An item id with its aggregated neighbourhood score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredItem {
    pub item_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CollaborativeModel {
    user_index: HashMap<String, usize>,
    item_index: HashMap<String, usize>,
    /// Reverse of `item_index`
    item_ids: Vec<String>,
    ratings: Option<SparseMatrix>,
    /// Centred, unit-length reduced rows (n x rank)
    affinity_factors: Option<Array2<f64>>,
    rank: usize,
}

impl CollaborativeModel {
    /// Model that knows no users
    pub fn empty() -> Self {
        Self::default()
    }

    /// Train from the full interaction snapshot
    ///
    /// An empty log yields the empty model. Interactions whose rating is not
    /// finite or does not fit the `f32` rating matrix are skipped. When fewer than two distinct items
    /// exist the index maps and rating matrix are still built, but the
    /// projection is skipped and user-based recommendations stay empty.
    pub fn train(
        interactions: &[Interaction],
        config: &CollaborativeConfig,
    ) -> Result<Self, MarqueeError> {
        let mut skipped = 0usize;
        let usable: Vec<&Interaction> = interactions
            .iter()
            .filter(|interaction| {
                let ok = interaction.has_usable_rating();
                if !ok {
                    skipped += 1;
                    warn!(
                        user_id = %interaction.user_id,
                        item_id = %interaction.item_id,
                        rating = interaction.rating,
                        "Skipping interaction with unusable rating"
                    );
                }
                ok
            })
            .collect();

        if usable.is_empty() {
            warn!(
                skipped,
                "No usable interactions; every user is treated as cold start"
            );
            return Ok(Self::empty());
        }

        let mut user_index: HashMap<String, usize> = HashMap::new();
        let mut item_index: HashMap<String, usize> = HashMap::new();
        let mut item_ids: Vec<String> = Vec::new();
        let mut triplets = Vec::with_capacity(usable.len());

        for interaction in usable {
            let next_user = user_index.len();
            let user = *user_index
                .entry(interaction.user_id.clone())
                .or_insert(next_user);

            let next_item = item_index.len();
            let item = *item_index
                .entry(interaction.item_id.clone())
                .or_insert_with(|| {
                    item_ids.push(interaction.item_id.clone());
                    next_item
                });

            triplets.push((user, item, interaction.rating as f32));
        }

        let num_users = user_index.len();
        let num_items = item_index.len();
        // Duplicate (user, item) pairs: the latest interaction wins
        let ratings = SparseMatrix::from_triplets(num_users, num_items, triplets);

        let rank = config.max_rank.min(num_items.saturating_sub(1));
        let affinity_factors = if rank == 0 {
            warn!(
                users = num_users,
                items = num_items,
                "Too few distinct items for a low-rank projection; skipping"
            );
            None
        } else {
            let params = SvdParams {
                rank,
                oversamples: config.oversamples,
                power_iterations: config.power_iterations,
                seed: config.seed,
            };
            let reduced = svd::fit_transform(&ratings, params)?;
            Some(correlation_factors(reduced))
        };

        info!(
            users = num_users,
            items = num_items,
            rank = rank,
            skipped,
            "Collaborative model trained"
        );

        Ok(Self {
            user_index,
            item_index,
            item_ids,
            ratings: Some(ratings),
            affinity_factors,
            rank,
        })
    }

    /// True if the user had at least one interaction at training time
    pub fn is_known_user(&self, user_id: &str) -> bool {
        self.user_index.contains_key(user_id)
    }

    pub fn num_users(&self) -> usize {
        self.user_index.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_index.len()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn user_position(&self, user_id: &str) -> Option<usize> {
        self.user_index.get(user_id).copied()
    }

    pub fn item_position(&self, item_id: &str) -> Option<usize> {
        self.item_index.get(item_id).copied()
    }

    /// Reverse item index lookup
    pub fn item_id(&self, position: usize) -> Option<&str> {
        self.item_ids.get(position).map(String::as_str)
    }

    /// Pearson correlation of two users' reduced rows
    ///
    /// `None` when either user is unknown or no projection was trained.
    pub fn affinity(&self, a: &str, b: &str) -> Option<f64> {
        let factors = self.affinity_factors.as_ref()?;
        let a = self.user_position(a)?;
        let b = self.user_position(b)?;
        Some(factors.row(a).dot(&factors.row(b)))
    }

    /// The `k` other users most correlated with `user_id`
    pub fn similar_users(&self, user_id: &str, k: usize) -> Vec<UserAffinity> {
        let Some(position) = self.user_position(user_id) else {
            return Vec::new();
        };
        let Some(factors) = self.affinity_factors.as_ref() else {
            return Vec::new();
        };

        let mut user_ids = vec![""; self.user_index.len()];
        for (id, &index) in &self.user_index {
            user_ids[index] = id.as_str();
        }

        self.ranked_neighbours(factors, position, k)
            .into_iter()
            .map(|(index, affinity)| UserAffinity {
                user_id: user_ids[index].to_string(),
                affinity,
            })
            .collect()
    }

    /// Items the user has not rated, scored by positively correlated neighbours
    ///
    /// Each candidate scores `sum(affinity(user, v) * rating(v, item))` over the
    /// `neighbourhood` closest users. Only positive scores are returned,
    /// descending, ties by item index.
    pub fn recommend_items(
        &self,
        user_id: &str,
        neighbourhood: usize,
        top_n: usize,
    ) -> Vec<ScoredItem> {
        let (Some(position), Some(factors), Some(ratings)) = (
            self.user_position(user_id),
            self.affinity_factors.as_ref(),
            self.ratings.as_ref(),
        ) else {
            return Vec::new();
        };

        let rated: HashSet<usize> = ratings.row(position).map(|(item, _)| item).collect();
        let mut scores = vec![0.0f64; ratings.num_cols()];

        for (neighbour, affinity) in self.ranked_neighbours(factors, position, neighbourhood) {
            if affinity <= 0.0 {
                break;
            }
            for (item, rating) in ratings.row(neighbour) {
                if !rated.contains(&item) {
                    scores[item] += affinity * f64::from(rating);
                }
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        debug!(
            user_id = %user_id,
            candidates = ranked.len(),
            "Scored collaborative candidates"
        );

        ranked
            .into_iter()
            .take(top_n)
            .map(|(item, score)| ScoredItem {
                item_id: self.item_ids[item].clone(),
                score,
            })
            .collect()
    }

    /// Other users by descending affinity, ties by index
    fn ranked_neighbours(
        &self,
        factors: &Array2<f64>,
        position: usize,
        k: usize,
    ) -> Vec<(usize, f64)> {
        let query = factors.row(position);
        let mut ranked: Vec<(usize, f64)> = factors
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(index, _)| *index != position)
            .map(|(index, row)| (index, query.dot(&row)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

/// Centre each row and scale it to unit length; constant rows become zero
fn correlation_factors(mut reduced: Array2<f64>) -> Array2<f64> {
    for mut row in reduced.rows_mut() {
        let mean = row_mean(row.view());
        row.mapv_inplace(|v| v - mean);
        let norm = row.dot(&row).sqrt();
        if norm > f64::EPSILON {
            row.mapv_inplace(|v| v / norm);
        } else {
            row.fill(0.0);
        }
    }
    reduced
}

fn row_mean(row: ArrayView1<f64>) -> f64 {
    if row.is_empty() {
        0.0
    } else {
        row.sum() / row.len() as f64
    }
}
