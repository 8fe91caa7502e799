//! # Marquee Core
//!
//! Shared building blocks for the Marquee catalog and recommendation services.
//!
//! ## Modules
//!
//! - `error`: Error taxonomy and HTTP mapping
//! - `config`: Environment-driven configuration loading and validation
//! - `database`: Shared PostgreSQL connection pool
//! - `observability`: Structured logging setup
//! - `models`: Catalog item and interaction records
//! - `pagination`: Catalog page requests and responses

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod observability;
pub mod pagination;

pub use config::{load_dotenv, ConfigLoader, DatabaseConfig, ServiceConfig};
pub use database::DatabasePool;
pub use error::MarqueeError;
pub use models::{canonical_id, ContentDocument, Interaction, InteractionSubmission, Item, ItemSummary};
pub use observability::{init_logging, LogConfig, LogFormat, ObservabilityError};
pub use pagination::{CatalogPage, PageParams, PageRequest, DEFAULT_PAGE_SIZE};

/// Result type alias for Marquee operations
pub type Result<T> = std::result::Result<T, MarqueeError>;
