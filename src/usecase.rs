//! Use-case boundary between a UI and the aggregators.
//!
//! Each use-case owns the published state for one screen, refuses to start a
//! second load of the same kind while one is in flight, and races every load
//! against a [`CancellationToken`]. A cancelled load drops its aggregate
//! future, and with it every outstanding sub-request, before any state is
//! published.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::library::LibraryAggregator;
use crate::models::{GameSummary, LibraryStats, ProfileStatus, UserProfile};
use crate::search::SearchResolver;
use crate::store::StoreAggregator;

/// Number of games shown in the featured carousel.
const FEATURED_COUNT: usize = 5;

const RELEASE_DATE_FORMATS: &[&str] = &["%b %d, %Y", "%d %b, %Y", "%B %d, %Y", "%Y-%m-%d"];

/// Result of a guarded, cancellable load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    Completed(T),
    /// A load of the same kind was already running; nothing was requested.
    AlreadyInFlight,
    /// The caller cancelled; no state was published.
    Cancelled,
}

impl<T> LoadOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// In-flight flag for one logical operation.
#[derive(Debug, Default)]
pub struct LoadGuard {
    in_flight: AtomicBool,
}

/// Held while a load runs; releases the guard on drop.
#[derive(Debug)]
pub struct LoadTicket<'a> {
    guard: &'a LoadGuard,
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when a load is already running.
    pub fn try_acquire(&self) -> Option<LoadTicket<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoadTicket { guard: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for LoadTicket<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}

/// Runs `fut` unless `cancel` fires first.
async fn run_cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn release_key(game: &GameSummary) -> Option<NaiveDate> {
    let raw = game.release_date.trim();
    if raw.is_empty() {
        return None;
    }
    RELEASE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Sorts newest first; undated or unparseable games go last in their
/// original order.
pub fn sort_by_release_date(games: &mut [GameSummary]) {
    games.sort_by(|a, b| release_key(b).cmp(&release_key(a)));
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedState {
    pub games: Vec<GameSummary>,
    pub featured: Vec<GameSummary>,
    pub current_page: usize,
    pub has_more_pages: bool,
    pub error: Option<String>,
    pub search_query: String,
    pub search_results: Vec<GameSummary>,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub is_searching: bool,
}

/// Store listing screen: first page, infinite scroll, full load and search.
pub struct GamesFeed {
    store: StoreAggregator,
    search: SearchResolver,
    state: Mutex<FeedState>,
    loading: LoadGuard,
    loading_more: LoadGuard,
    searching: LoadGuard,
}

impl GamesFeed {
    pub fn new(store: StoreAggregator, search: SearchResolver) -> Self {
        Self {
            store,
            search,
            state: Mutex::new(FeedState::default()),
            loading: LoadGuard::new(),
            loading_more: LoadGuard::new(),
            searching: LoadGuard::new(),
        }
    }

    pub fn snapshot(&self) -> FeedState {
        let mut state = lock(&self.state).clone();
        state.is_loading = self.loading.is_in_flight();
        state.is_loading_more = self.loading_more.is_in_flight();
        state.is_searching = self.searching.is_in_flight();
        state
    }

    /// Loads the first page, replacing the current listing.
    pub async fn load_games(&self, cancel: &CancellationToken) -> LoadOutcome<FeedState> {
        let Some(_ticket) = self.loading.try_acquire() else {
            debug!("load games already in flight");
            return LoadOutcome::AlreadyInFlight;
        };

        let page_size = self.store.page_size();
        let Some(games) = run_cancellable(cancel, self.store.fetch_page(1, page_size)).await else {
            return LoadOutcome::Cancelled;
        };

        let has_more = games.len() >= page_size;
        self.publish_listing(games, 1, has_more);
        LoadOutcome::Completed(self.snapshot())
    }

    /// Loads every page up to `max_pages`, replacing the current listing.
    pub async fn load_all_games(
        &self,
        max_pages: usize,
        cancel: &CancellationToken,
    ) -> LoadOutcome<FeedState> {
        let Some(_ticket) = self.loading.try_acquire() else {
            debug!("load games already in flight");
            return LoadOutcome::AlreadyInFlight;
        };

        let Some(games) = run_cancellable(cancel, self.store.fetch_all_pages(max_pages)).await
        else {
            return LoadOutcome::Cancelled;
        };

        self.publish_listing(games, 1, false);
        LoadOutcome::Completed(self.snapshot())
    }

    /// Appends the next page. Does nothing when no more pages are expected.
    pub async fn load_next_page(&self, cancel: &CancellationToken) -> LoadOutcome<FeedState> {
        let Some(_ticket) = self.loading_more.try_acquire() else {
            debug!("load next page already in flight");
            return LoadOutcome::AlreadyInFlight;
        };

        let (next, has_more_pages) = {
            let state = lock(&self.state);
            (state.current_page + 1, state.has_more_pages)
        };
        if !has_more_pages {
            return LoadOutcome::Completed(self.snapshot());
        }

        let page_size = self.store.page_size();
        let Some(page) = run_cancellable(cancel, self.store.fetch_page(next, page_size)).await
        else {
            return LoadOutcome::Cancelled;
        };
        let has_more = !page.is_empty() && page.len() >= page_size;

        {
            let mut state = lock(&self.state);
            let mut games = std::mem::take(&mut state.games);
            let before = games.len();
            for game in page {
                if !games.iter().any(|g| g.id == game.id) {
                    games.push(game);
                }
            }
            info!(page = next, new = games.len() - before, total = games.len(), "page loaded");

            sort_by_release_date(&mut games);
            state.games = games;
            state.current_page = next;
            state.has_more_pages = has_more;
        }

        LoadOutcome::Completed(self.snapshot())
    }

    /// Runs a search. A blank query clears the results without a request.
    pub async fn search(&self, query: &str, cancel: &CancellationToken) -> LoadOutcome<FeedState> {
        if query.trim().is_empty() {
            self.clear_search();
            return LoadOutcome::Completed(self.snapshot());
        }

        let Some(_ticket) = self.searching.try_acquire() else {
            debug!(query, "search already in flight");
            return LoadOutcome::AlreadyInFlight;
        };

        let Some(mut results) = run_cancellable(cancel, self.search.search(query)).await else {
            return LoadOutcome::Cancelled;
        };
        sort_by_release_date(&mut results);

        {
            let mut state = lock(&self.state);
            state.search_query = query.to_string();
            state.search_results = results;
        }
        LoadOutcome::Completed(self.snapshot())
    }

    pub fn clear_search(&self) {
        let mut state = lock(&self.state);
        state.search_query.clear();
        state.search_results.clear();
    }

    fn publish_listing(&self, mut games: Vec<GameSummary>, page: usize, has_more: bool) {
        sort_by_release_date(&mut games);
        let mut state = lock(&self.state);
        state.error = if games.is_empty() {
            Some("no games available".to_string())
        } else {
            None
        };
        state.featured = games.iter().take(FEATURED_COUNT).cloned().collect();
        state.games = games;
        state.current_page = page;
        state.has_more_pages = has_more;
        info!(games = state.games.len(), has_more, "listing published");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserStatsState {
    pub steam_id: String,
    pub profile: Option<UserProfile>,
    pub status: Option<ProfileStatus>,
    pub stats: Option<LibraryStats>,
    pub error: Option<String>,
    pub is_loading: bool,
}

/// User statistics screen.
pub struct UserStatsLoader {
    library: LibraryAggregator,
    state: Mutex<UserStatsState>,
    loading: LoadGuard,
}

impl UserStatsLoader {
    pub fn new(library: LibraryAggregator) -> Self {
        Self {
            library,
            state: Mutex::new(UserStatsState::default()),
            loading: LoadGuard::new(),
        }
    }

    pub fn snapshot(&self) -> UserStatsState {
        let mut state = lock(&self.state).clone();
        state.is_loading = self.loading.is_in_flight();
        state
    }

    pub async fn load(&self, steam_id: &str, cancel: &CancellationToken) -> LoadOutcome<UserStatsState> {
        let Some(_ticket) = self.loading.try_acquire() else {
            debug!("user load already in flight");
            return LoadOutcome::AlreadyInFlight;
        };

        let Some(result) = run_cancellable(cancel, self.library.fetch_user(steam_id)).await else {
            return LoadOutcome::Cancelled;
        };

        {
            let mut state = lock(&self.state);
            state.steam_id = steam_id.trim().to_string();
            match result {
                Ok(profile) => {
                    state.status = Some(profile.status());
                    state.stats = Some(LibraryStats::from_profile(&profile));
                    state.profile = Some(profile);
                    state.error = None;
                }
                Err(e) => {
                    state.status = None;
                    state.stats = None;
                    state.profile = None;
                    state.error = Some(e.to_string());
                }
            }
        }
        LoadOutcome::Completed(self.snapshot())
    }

    pub fn clear(&self) {
        *lock(&self.state) = UserStatsState::default();
    }
}
