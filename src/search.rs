//! Text search over the store, backfilled with detail lookups.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::client::{Endpoint, RemoteClient};
use crate::models::GameSummary;
use crate::steam::{parse_search_item, search_items};
use crate::store::StoreAggregator;

#[derive(Clone)]
pub struct SearchResolver {
    client: Arc<dyn RemoteClient>,
    store: StoreAggregator,
}

impl SearchResolver {
    pub fn new(client: Arc<dyn RemoteClient>, store: StoreAggregator) -> Self {
        Self { client, store }
    }

    /// Searches the store for `query`.
    ///
    /// A blank query returns nothing without a request. When any hit lacks
    /// price, developers, platforms or genres, every distinct hit is
    /// re-fetched in full and repeated hits share the enriched record; hits whose lookup comes back empty keep their raw form, and a
    /// failed batch falls back to the raw hits.
    pub async fn search(&self, query: &str) -> Vec<GameSummary> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let root = match self
            .client
            .get_json(Endpoint::StoreSearch, vec![("term", query.to_string())])
            .await
        {
            Ok(root) => root,
            Err(e) => {
                warn!(query, error = %e, "store search request failed");
                return Vec::new();
            }
        };

        let candidates: Vec<GameSummary> = search_items(&root)
            .iter()
            .filter_map(parse_search_item)
            .collect();

        if !candidates.iter().any(GameSummary::needs_enrichment) {
            debug!(query, hits = candidates.len(), "search hits complete");
            return candidates;
        }

        // All hits are re-fetched even if only one is incomplete.
        let mut requested = HashSet::new();
        let ids: Vec<String> = candidates
            .iter()
            .filter(|c| requested.insert(c.id.clone()))
            .map(|c| c.id.clone())
            .collect();
        let enriched = match self.store.fetch_details_batch(&ids).await {
            Ok(enriched) => enriched,
            Err(e) => {
                warn!(query, error = %e, "search enrichment failed, using raw hits");
                return candidates;
            }
        };

        let by_id: HashMap<String, GameSummary> = enriched
            .into_iter()
            .map(|game| (game.id.clone(), game))
            .collect();

        candidates
            .into_iter()
            .map(|candidate| by_id.get(&candidate.id).cloned().unwrap_or(candidate))
            .collect()
    }
}
