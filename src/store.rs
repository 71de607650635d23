//! Store listing aggregation: virtual pagination over the featured-listings
//! payload, merged with per-item detail lookups.
//!
//! The featured endpoint is not paginated upstream. Every page request
//! fetches the whole payload and slices the `specials` collection; short
//! pages are topped up from `top_sellers`. Dedup state lives in
//! [`PageCursor`] values owned by the caller of a paged sequence, never on
//! the aggregator itself.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt, stream};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{Endpoint, RemoteClient};
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::models::GameSummary;
use crate::steam::{featured_collection, parse_app_details, parse_listing_item};

const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_PAGE_SIZE: usize = 100;

/// Position and seen ids of one paged fetch sequence.
#[derive(Debug, Clone)]
pub struct PageCursor {
    page_number: usize,
    page_size: usize,
    seen_ids: HashSet<String>,
}

impl PageCursor {
    /// Starts a sequence at page 1. A zero page size is bumped to 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_number: 1,
            page_size: page_size.max(1),
            seen_ids: HashSet::new(),
        }
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn seen_ids(&self) -> &HashSet<String> {
        &self.seen_ids
    }

    /// Keeps the games whose ids this sequence has not seen yet, in order.
    fn admit(&mut self, games: Vec<GameSummary>) -> Vec<GameSummary> {
        games
            .into_iter()
            .filter(|g| self.seen_ids.insert(g.id.clone()))
            .collect()
    }

    fn advance(&mut self) {
        self.page_number += 1;
    }
}

#[derive(Clone)]
pub struct StoreAggregator {
    client: Arc<dyn RemoteClient>,
    max_concurrency: usize,
    page_size: usize,
}

impl StoreAggregator {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn from_config(client: Arc<dyn RemoteClient>, config: &ClientConfig) -> Self {
        Self::new(client)
            .with_max_concurrency(config.max_concurrency)
            .with_page_size(config.page_size)
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetches one virtual page of store listings.
    ///
    /// Only `specials[(page-1)*page_size, page*page_size)` is read; items
    /// skipped inside that range are made up from `top_sellers`, never from
    /// the next page's range. A failed listing request yields an empty page;
    /// callers read that as "no more data". Items that fail to parse are
    /// skipped.
    pub async fn fetch_page(&self, page: usize, page_size: usize) -> Vec<GameSummary> {
        if page == 0 || page_size == 0 {
            warn!(page, page_size, "invalid page request");
            return Vec::new();
        }

        let root = match self
            .client
            .get_json(Endpoint::FeaturedCategories, Vec::new())
            .await
        {
            Ok(root) => root,
            Err(e) => {
                warn!(page, error = %e, "featured listing request failed");
                return Vec::new();
            }
        };

        let start = (page - 1).saturating_mul(page_size);
        let specials = featured_collection(&root, "specials");
        let mut seen = HashSet::new();

        let end = start.saturating_add(page_size).min(specials.len());
        let window = specials.get(start..end).unwrap_or(&[]);
        let mut listings = collect_listings(window, page_size, &mut seen);

        if listings.len() < page_size {
            let top_sellers = featured_collection(&root, "top_sellers");
            let offset = start.saturating_sub(specials.len());
            let needed = page_size - listings.len();
            let fill = collect_listings(top_sellers.get(offset..).unwrap_or(&[]), needed, &mut seen);
            debug!(page, filled = fill.len(), "topped up page from top sellers");
            listings.extend(fill);
        }

        stream::iter(listings)
            .map(|listing| self.merge_details(listing))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    /// Looks up the full record of one item.
    ///
    /// Absent when the upstream marks the item unsuccessful, when the payload
    /// cannot be parsed, or when the request fails.
    pub async fn fetch_details(&self, id: &str) -> Option<GameSummary> {
        match self.try_fetch_details(id).await {
            Ok(details) => details,
            Err(e) => {
                warn!(id, error = %e, "app details request failed");
                None
            }
        }
    }

    /// Looks up every id, keeping present records in input order.
    ///
    /// Absent items are skipped. A transport-class failure aborts the batch
    /// so the caller can fall back to what it already has.
    pub async fn fetch_details_batch(&self, ids: &[String]) -> Result<Vec<GameSummary>, AppError> {
        let found: Vec<Option<GameSummary>> = stream::iter(ids)
            .map(|id| self.try_fetch_details(id))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        Ok(found.into_iter().flatten().collect())
    }

    /// Walks pages from 1 until a page brings nothing new or `max_pages`
    /// pages were fetched. Each id appears once, in first-seen order.
    pub async fn fetch_all_pages(&self, max_pages: usize) -> Vec<GameSummary> {
        let (games, cursor) = self
            .fetch_pages(PageCursor::new(self.page_size), max_pages)
            .await;
        info!(
            games = games.len(),
            pages = cursor.page_number(),
            "fetched store listings"
        );
        games
    }

    /// Continues a paged sequence from `cursor`, returning the new games and
    /// the advanced cursor.
    pub async fn fetch_pages(
        &self,
        mut cursor: PageCursor,
        max_pages: usize,
    ) -> (Vec<GameSummary>, PageCursor) {
        let mut out = Vec::new();

        for _ in 0..max_pages {
            let page = self
                .fetch_page(cursor.page_number(), cursor.page_size())
                .await;
            let fresh = cursor.admit(page);
            if fresh.is_empty() {
                debug!(page = cursor.page_number(), "page brought no new games");
                break;
            }

            debug!(page = cursor.page_number(), new = fresh.len(), "page fetched");
            out.extend(fresh);
            cursor.advance();
        }

        (out, cursor)
    }

    async fn merge_details(&self, listing: GameSummary) -> GameSummary {
        match self.fetch_details(&listing.id).await {
            Some(details) => listing.merge_details(details),
            None => listing,
        }
    }

    /// `Ok(None)` for unsuccessful or unparseable items; `Err` only for
    /// transport-class failures.
    async fn try_fetch_details(&self, id: &str) -> Result<Option<GameSummary>, AppError> {
        let root = match self
            .client
            .get_json(Endpoint::AppDetails, vec![("appids", id.to_string())])
            .await
        {
            Ok(root) => root,
            Err(e) if e.is_transport() => return Err(e),
            Err(e) => {
                debug!(id, error = %e, "app details payload unreadable");
                return Ok(None);
            }
        };

        match parse_app_details(id, &root) {
            Ok(details) => Ok(Some(details)),
            Err(e) => {
                debug!(id, error = %e, "app details unavailable");
                Ok(None)
            }
        }
    }
}

/// Parses up to `limit` listings, skipping unparseable items and ids already
/// in `seen`.
fn collect_listings(items: &[Value], limit: usize, seen: &mut HashSet<String>) -> Vec<GameSummary> {
    let mut out = Vec::new();
    for item in items {
        if out.len() >= limit {
            break;
        }
        let listing = match parse_listing_item(item) {
            Ok(listing) => listing,
            Err(e) => {
                warn!(error = %e, "skipping listing item");
                continue;
            }
        };
        if !seen.insert(listing.id.clone()) {
            debug!(id = %listing.id, "skipping duplicate listing");
            continue;
        }
        out.push(listing);
    }
    out
}
