//! User profile and owned-library aggregation.
//!
//! Private profiles stop after the summary request: owned games and
//! achievements are never requested for them.

use std::sync::Arc;

use futures_util::{StreamExt, stream};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::client::{Endpoint, RemoteClient};
use crate::config::{ClientConfig, DEFAULT_MEDIA_BASE_URL};
use crate::error::AppError;
use crate::models::{LibraryStats, UserGame, UserProfile};
use crate::steam::{count_achievements, parse_owned_games, parse_player_summary};

const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Clone)]
pub struct LibraryAggregator {
    client: Arc<dyn RemoteClient>,
    media_base_url: String,
    max_concurrency: usize,
}

impl LibraryAggregator {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self {
            client,
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn from_config(client: Arc<dyn RemoteClient>, config: &ClientConfig) -> Self {
        Self {
            client,
            media_base_url: config.media_base_url.clone(),
            max_concurrency: config.max_concurrency.max(1),
        }
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Fetches a profile and, for public profiles, its library with
    /// per-game achievement counts.
    ///
    /// Only a malformed steam id is an error. An unreadable profile comes
    /// back as [`UserProfile::not_found`].
    pub async fn fetch_user(&self, steam_id: &str) -> Result<UserProfile, AppError> {
        let steam_id = validate_steam_id(steam_id)?;

        let root = match self
            .client
            .get_json(Endpoint::PlayerSummaries, vec![("steamids", steam_id.clone())])
            .await
        {
            Ok(root) => root,
            Err(e) => {
                warn!(steam_id = %steam_id, error = %e, "player summary request failed");
                return Ok(UserProfile::not_found());
            }
        };

        let Some(summary) = parse_player_summary(&root) else {
            debug!(steam_id = %steam_id, "no player summary");
            return Ok(UserProfile::not_found());
        };

        let is_private = !summary.is_public();
        let owned_games = if is_private {
            debug!(steam_id = %steam_id, "profile is not public, skipping library");
            Vec::new()
        } else {
            self.fetch_owned_games(&summary.steam_id).await
        };

        info!(
            steam_id = %summary.steam_id,
            is_private,
            games = owned_games.len(),
            "fetched user profile"
        );

        Ok(UserProfile {
            id: summary.steam_id.clone(),
            username: summary.username,
            avatar_url: summary.avatar_url,
            steam_id: summary.steam_id,
            is_private,
            owned_games,
        })
    }

    /// Fetches the profile and summarizes its library.
    pub async fn fetch_stats(&self, steam_id: &str) -> Result<LibraryStats, AppError> {
        let profile = self.fetch_user(steam_id).await?;
        Ok(LibraryStats::from_profile(&profile))
    }

    async fn fetch_owned_games(&self, steam_id: &str) -> Vec<UserGame> {
        let params = vec![
            ("steamid", steam_id.to_string()),
            ("include_appinfo", "1".to_string()),
            ("include_played_free_games", "1".to_string()),
        ];
        let games = match self.client.get_json(Endpoint::OwnedGames, params).await {
            Ok(root) => parse_owned_games(&root, &self.media_base_url),
            Err(e) => Err(e),
        };

        let games = match games {
            Ok(games) => games,
            Err(e) => {
                warn!(steam_id, error = %e, "owned games unavailable");
                return Vec::new();
            }
        };

        stream::iter(games)
            .map(|game| self.with_achievements(steam_id, game))
            .buffered(self.max_concurrency)
            .collect()
            .await
    }

    /// Fills in achievement counts; a failed lookup leaves them at zero.
    async fn with_achievements(&self, steam_id: &str, mut game: UserGame) -> UserGame {
        let params = vec![
            ("steamid", steam_id.to_string()),
            ("appid", game.id.clone()),
        ];
        match self
            .client
            .get_json(Endpoint::PlayerAchievements, params)
            .await
        {
            Ok(root) => {
                let (total, unlocked) = count_achievements(&root);
                game.total_achievements = total;
                game.unlocked_achievements = unlocked.min(total);
            }
            Err(e) => {
                debug!(appid = %game.id, error = %e, "achievements unavailable");
            }
        }
        game
    }
}

/// Trims and checks a SteamID64 (17 decimal digits).
pub fn validate_steam_id(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidIdentifier(
            "steam id must not be empty".to_string(),
        ));
    }

    let re = Regex::new(r"^\d{17}$").map_err(|e| AppError::Internal(e.to_string()))?;
    if !re.is_match(trimmed) {
        return Err(AppError::InvalidIdentifier(format!(
            "'{trimmed}' is not a 17-digit steam id"
        )));
    }

    Ok(trimmed.to_string())
}
