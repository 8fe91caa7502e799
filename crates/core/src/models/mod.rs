//! Catalog and interaction records

pub mod interaction;
pub mod item;

pub use interaction::{Interaction, InteractionSubmission};
pub use item::{canonical_id, ContentDocument, Item, ItemSummary};
