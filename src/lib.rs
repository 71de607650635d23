//! Data-aggregation core for a Steam companion app.
//!
//! Store listings are paged out of the featured-categories payload and
//! merged with per-item details, search hits are backfilled with detail
//! lookups, and a user's library is collected with per-game achievement
//! counts. Everything upstream goes through the [`client::RemoteClient`]
//! port, so aggregators can be driven by [`client::HttpClient`] or by any
//! other implementation.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use steamcheck_core::{ClientConfig, HttpClient, StoreAggregator};
//!
//! # async fn run() -> Result<(), steamcheck_core::AppError> {
//! let config = ClientConfig::from_env()?;
//! let client = Arc::new(HttpClient::new(config.clone())?);
//! let store = StoreAggregator::from_config(client, &config);
//! let first_page = store.fetch_page(1, config.page_size).await;
//! # let _ = first_page;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod library;
pub mod models;
pub mod normalize;
pub mod search;
pub mod steam;
pub mod store;
pub mod usecase;

pub use client::{Endpoint, HttpClient, RemoteClient};
pub use config::ClientConfig;
pub use error::AppError;
pub use library::LibraryAggregator;
pub use models::{GameSummary, LibraryStats, ProfileStatus, UserGame, UserProfile};
pub use search::SearchResolver;
pub use store::{PageCursor, StoreAggregator};
pub use usecase::{FeedState, GamesFeed, LoadGuard, LoadOutcome, UserStatsLoader, UserStatsState};
